//! Backend port - 購読者リストの保持方法
//!
//! Broadcaster は出力型ごとに 1 つの購読者リスト（table）を持ちます。
//! table の実装を差し替えるための抽象がこの trait です。
//!
//! # 実装
//! - **Local**: ロックなし。複数スレッドからの同時呼び出しは不可（`!Sync`）
//! - **Guarded**: copy-on-write のスナップショット。配信は一切ブロックされない
//!
//! # 契約
//! - `snapshot()` は呼び出し時点の一貫したリストを返す。以後の変更は反映されない
//! - `modify()` はコピーを変更して公開する。配信中のスナップショットは書き換えない

use std::ops::Deref;
use std::sync::Arc;

use crate::domain::errors::DeliveryError;
use crate::domain::identity::Identity;
use crate::domain::ids::SubscriptionId;
use crate::typed::receive::Message;

/// Backend は出力型ごとの table 型を決める
pub trait Backend: 'static {
    type Table<T: Message>: SubscriberTable<T> + 'static;
}

/// SubscriberTable は 1 つの出力型に対する購読者リスト
pub trait SubscriberTable<T>: Default {
    type Snapshot: Deref<Target = Vec<Entry<T>>>;

    /// 現在のリストのスナップショットを取る
    fn snapshot(&self) -> Self::Snapshot;

    /// リストを変更する（copy-on-write）
    fn modify<R>(&self, f: impl FnOnce(&mut Vec<Entry<T>>) -> R) -> R;

    /// 条件に一致するエントリを取り除き、取り除いた数を返す
    fn remove_where(&self, pred: &dyn Fn(&EntryMeta) -> bool) -> usize {
        if !self.snapshot().iter().any(|entry| pred(&entry.meta)) {
            return 0;
        }
        self.modify(|entries| {
            let before = entries.len();
            entries.retain(|entry| !pred(&entry.meta));
            before - entries.len()
        })
    }

    /// 登録順のメタデータ一覧
    fn metas(&self) -> Vec<EntryMeta> {
        self.snapshot().iter().map(|entry| entry.meta).collect()
    }
}

/// EntryMeta は購読エントリの識別情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub id: SubscriptionId,
    /// `Arc` で登録された購読者のみ持つ
    pub identity: Option<Identity>,
}

/// Entry は購読者リストの 1 要素
pub struct Entry<T> {
    pub meta: EntryMeta,
    pub sink: Sink<T>,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta,
            sink: self.sink.clone(),
        }
    }
}

type OwnedFn<T> = dyn Fn(T) -> Result<(), DeliveryError> + Send + Sync;
type InPlaceFn<T> = dyn Fn(&mut T) -> Result<(), DeliveryError> + Send + Sync;

/// Sink は購読者の呼び出し方
pub enum Sink<T> {
    /// 値を所有権ごと渡す
    Owned(Arc<OwnedFn<T>>),
    /// 配信中の値を参照で渡す
    InPlace(Arc<InPlaceFn<T>>),
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        match self {
            Sink::Owned(f) => Sink::Owned(Arc::clone(f)),
            Sink::InPlace(f) => Sink::InPlace(Arc::clone(f)),
        }
    }
}

impl<T: Clone> Sink<T> {
    /// 後続の購読者がいる場合の配信。Owned には複製を渡す
    pub fn deliver_ref(&self, value: &mut T) -> Result<(), DeliveryError> {
        match self {
            Sink::Owned(f) => f(value.clone()),
            Sink::InPlace(f) => f(value),
        }
    }

    /// 最後の購読者への配信。Owned には元の値を move する
    pub fn deliver_owned(&self, mut value: T) -> Result<(), DeliveryError> {
        match self {
            Sink::Owned(f) => f(value),
            Sink::InPlace(f) => f(&mut value),
        }
    }
}
