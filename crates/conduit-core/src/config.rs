//! BroadcasterConfig - Broadcaster の設定
//!
//! JSON から読み込めるように serde を derive しています。
//! 省略したフィールドは `default_v1()` の値になります。
//!
//! ```json
//! { "name": "market-data", "duplicates": "reject" }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::errors::ConfigError;

/// 同じ `Arc` 購読者を 2 回 attach したときの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// 独立した 2 つのエントリになる（`detach_subscriber` は両方を外す）
    #[default]
    Allow,
    /// 2 回目の attach は `AttachError::AlreadyAttached` になる
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcasterConfig {
    /// ログに出す名前
    pub name: String,
    pub duplicates: DuplicatePolicy,
}

impl BroadcasterConfig {
    /// v1 のデフォルト設定（name = "broadcaster", 重複は許可）
    pub fn default_v1() -> Self {
        Self {
            name: "broadcaster".to_string(),
            duplicates: DuplicatePolicy::Allow,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        Ok(())
    }
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self::default_v1()
    }
}
