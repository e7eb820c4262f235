//! Identity - 参照で登録された購読者の同一性
//!
//! `Arc<S>` で渡された購読者は、その割り当てアドレスを同一性として持ちます。
//! 同じ `Arc` を何度 attach しても同じ Identity になるので、
//! `detach_subscriber(&arc)` で一致するエントリをまとめて外せます。
//!
//! クロージャなど値で渡された購読者には Identity はありません。
//! それらは `SubscriptionId` でのみ外せます。

use std::fmt;
use std::sync::Arc;

/// 参照で登録された購読者のアドレス由来の Identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(usize);

impl Identity {
    /// `Arc` が指す割り当てのアドレスから Identity を作る
    pub fn of<S: ?Sized>(subscriber: &Arc<S>) -> Self {
        Self(Arc::as_ptr(subscriber) as *const () as usize)
    }

    pub fn addr(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
