//! Guarded - 複数スレッドから使える copy-on-write backend
//!
//! # 学習ポイント
//! - `ArcSwap` によるロックフリーなスナップショット読み出し
//! - 書き込み側だけを `Mutex` で直列化する（read path にロックはない）
//!
//! # 動作
//! - 配信: `load_full()` で現在のリストを `Arc` として取り出し、ロックなしで走査する
//! - attach/detach: writer ロックを取り、現在のリストを複製して変更し、`store()` で公開する
//!
//! 配信は常に一貫したリスト（変更前か変更後のどちらか）を見ます。
//! 同時の attach/detach は writer ロックで直列化され、後から公開した方が残ります。

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::ports::backend::{Backend, Entry, SubscriberTable};
use crate::typed::receive::Message;

/// 複数スレッド用の backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Guarded;

impl Backend for Guarded {
    type Table<T: Message> = GuardedTable<T>;
}

pub struct GuardedTable<T> {
    current: ArcSwap<Vec<Entry<T>>>,
    writer: Mutex<()>,
}

impl<T> Default for GuardedTable<T> {
    fn default() -> Self {
        Self {
            current: ArcSwap::from(Arc::new(Vec::new())),
            writer: Mutex::new(()),
        }
    }
}

impl<T> SubscriberTable<T> for GuardedTable<T> {
    type Snapshot = Arc<Vec<Entry<T>>>;

    fn snapshot(&self) -> Arc<Vec<Entry<T>>> {
        self.current.load_full()
    }

    fn modify<R>(&self, f: impl FnOnce(&mut Vec<Entry<T>>) -> R) -> R {
        // f が panic しても公開済みのリストは変わらない
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::clone(&self.current.load());
        let result = f(&mut next);
        self.current.store(Arc::new(next));
        result
    }
}
