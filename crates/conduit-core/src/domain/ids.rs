//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + Phantom type
//! 購読（subscription）を取り外すためのハンドルとして ULID を使います。
//! `attach` は値で渡されたクロージャにも必ず ID を払い出すので、
//! どの購読も同じ方法で `detach` できます。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: 払い出し順で並ぶ
//! - **調整不要**: 複数スレッドから同時に生成しても衝突しない
//! - **128-bit**: UUID と同じサイズ
//!
//! ## Phantom Type パターン
//! `Id<T>` の `T` は実行時には使わないマーカー型で、
//! 異なる種類の ID をコンパイル時に混同できないようにします。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"sub-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// # 例
/// ```ignore
/// let id = SubscriptionId::generate();
/// assert!(id.to_string().starts_with("sub-"));
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// 新しい ID を払い出す
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Subscription のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subscription {}

impl IdMarker for Subscription {
    fn prefix() -> &'static str {
        "sub-"
    }
}

/// attach が返す購読ハンドル（detach のキー）
pub type SubscriptionId = Id<Subscription>;
