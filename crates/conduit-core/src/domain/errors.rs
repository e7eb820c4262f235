//! Errors - エラー型
//!
//! 合成（pipeline）側は型で検査されるので実行時エラーを持ちません。
//! 実行時に起こりうるのは次の 3 系統だけです。
//! - **AttachError**: 登録時の拒否（どの出力型も受け取れない / 重複）
//! - **BroadcastError**: 配信中に購読者が失敗した（そこで配信を打ち切る）
//! - **ConfigError**: 設定の読み込み・検証の失敗

use thiserror::Error;

use super::identity::Identity;
use super::ids::SubscriptionId;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// AttachError は購読者の登録時エラー
///
/// どちらの場合も、購読リストには一切手を付けずに返します。
#[derive(Debug, Error)]
pub enum AttachError {
    #[error("subscriber `{subscriber}` receives none of the declared outputs {outputs:?}")]
    NoMatchingOutput {
        subscriber: &'static str,
        outputs: Vec<&'static str>,
    },

    #[error("subscriber {identity} is already attached")]
    AlreadyAttached { identity: Identity },
}

/// DeliveryError は購読者自身が返す失敗
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DeliveryError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// BroadcastError は配信の失敗
///
/// 失敗した購読者より後ろの購読者には、その回の値は届きません。
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("delivery to {subscription} failed: {source}")]
    Delivery {
        subscription: SubscriptionId,
        #[source]
        source: DeliveryError,
    },
}

impl BroadcastError {
    pub fn subscription(&self) -> SubscriptionId {
        match self {
            BroadcastError::Delivery { subscription, .. } => *subscription,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid broadcaster config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("broadcaster name must not be empty")]
    EmptyName,
}
