//! BroadcasterBuilder - Broadcaster の構築
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: 不正な設定は build() で `ConfigError` になる
//! - `PhantomData<fn() -> (O, B)>` で型パラメータだけを持ち運ぶ

use std::marker::PhantomData;

use super::broadcaster::Broadcaster;
use super::outputs::Outputs;
use crate::config::{BroadcasterConfig, DuplicatePolicy};
use crate::domain::errors::ConfigError;
use crate::impls::local::Local;
use crate::ports::backend::Backend;

/// BroadcasterBuilder は Broadcaster を構築
///
/// # 使用例
/// ```ignore
/// let ticks: Broadcaster<(u64,), Guarded> = Broadcaster::builder()
///     .name("ticks")
///     .duplicates(DuplicatePolicy::Reject)
///     .build()?;
/// ```
pub struct BroadcasterBuilder<O: Outputs, B: Backend = Local> {
    config: BroadcasterConfig,
    _marker: PhantomData<fn() -> (O, B)>,
}

impl<O: Outputs, B: Backend> BroadcasterBuilder<O, B> {
    pub fn new() -> Self {
        Self {
            config: BroadcasterConfig::default_v1(),
            _marker: PhantomData,
        }
    }

    /// ログに出す名前を設定
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicates = policy;
        self
    }

    /// 読み込み済みの設定をまとめて適用
    pub fn config(mut self, config: BroadcasterConfig) -> Self {
        self.config = config;
        self
    }

    /// # 検証
    /// - name が空（空白のみを含む）なら `ConfigError::EmptyName`
    pub fn build(self) -> Result<Broadcaster<O, B>, ConfigError> {
        self.config.validate()?;
        Ok(Broadcaster::with_config(self.config))
    }
}

impl<O: Outputs, B: Backend> Default for BroadcasterBuilder<O, B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::guarded::Guarded;

    #[test]
    fn build_with_defaults() {
        let broadcaster: Broadcaster<(i32,)> = BroadcasterBuilder::new().build().unwrap();
        assert_eq!(broadcaster.name(), "broadcaster");
        assert_eq!(broadcaster.config().duplicates, DuplicatePolicy::Allow);
    }

    #[test]
    fn build_applies_settings() {
        let broadcaster: Broadcaster<(i32, String), Guarded> = BroadcasterBuilder::new()
            .name("quotes")
            .duplicates(DuplicatePolicy::Reject)
            .build()
            .unwrap();
        assert_eq!(broadcaster.name(), "quotes");
        assert_eq!(broadcaster.config().duplicates, DuplicatePolicy::Reject);
    }

    #[test]
    fn build_from_loaded_config() {
        let config = BroadcasterConfig::from_json_str(r#"{"name":"loaded"}"#).unwrap();
        let broadcaster: Broadcaster<(u8,)> = BroadcasterBuilder::new().config(config).build().unwrap();
        assert_eq!(broadcaster.name(), "loaded");
    }

    #[test]
    fn build_fails_on_empty_name() {
        let result: Result<Broadcaster<(i32,)>, _> = BroadcasterBuilder::new().name("").build();
        assert!(matches!(result, Err(ConfigError::EmptyName)));
    }
}
