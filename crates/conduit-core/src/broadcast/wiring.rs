//! Wiring - 購読者の登録手続き
//!
//! `Subscriber::wire` から呼ばれ、購読者が受け取れる型を 1 つずつ受け付けます。
//! 宣言済みの出力型に一致したものだけを「保留中の追加」として記録し、
//! `commit` で初めて table に書き込みます。
//!
//! # なぜ保留するのか
//! 一致する型が 1 つもない購読者は、どの table にも触れる前に拒否する必要があります。
//! 追加を保留しておけば、拒否時には何も元に戻す必要がありません。

use std::any::type_name;
use std::sync::Arc;

use super::outputs::Outputs;
use crate::domain::identity::Identity;
use crate::domain::ids::SubscriptionId;
use crate::ports::backend::{Backend, Entry, EntryMeta, Sink, SubscriberTable};
use crate::typed::receive::{Message, Receive, ReceiveMut};

type PendingAttach<'a> = Box<dyn FnOnce(EntryMeta) + 'a>;

pub struct Wiring<'a, O: Outputs, B: Backend> {
    tables: &'a O::Tables<B>,
    identity: Option<Identity>,
    pending: Vec<PendingAttach<'a>>,
    routed: Vec<&'static str>,
}

impl<'a, O: Outputs, B: Backend> Wiring<'a, O, B> {
    pub(crate) fn new(tables: &'a O::Tables<B>, identity: Option<Identity>) -> Self {
        Self {
            tables,
            identity,
            pending: Vec::new(),
            routed: Vec::new(),
        }
    }

    /// `T` を所有権ごと受け取る
    ///
    /// `T` が宣言されていなければ何もせず `false` を返します。
    pub fn receive<T, S>(&mut self, subscriber: &Arc<S>) -> bool
    where
        T: Message,
        S: Receive<T> + 'static,
    {
        let subscriber = Arc::clone(subscriber);
        self.sink(Sink::Owned(Arc::new(move |value: T| {
            <S as Receive<T>>::receive(&subscriber, value)
        })))
    }

    /// `T` を配信中のインスタンスへの参照で受け取る
    pub fn receive_mut<T, S>(&mut self, subscriber: &Arc<S>) -> bool
    where
        T: Message,
        S: ReceiveMut<T> + 'static,
    {
        let subscriber = Arc::clone(subscriber);
        self.sink(Sink::InPlace(Arc::new(move |value: &mut T| {
            <S as ReceiveMut<T>>::receive_mut(&subscriber, value)
        })))
    }

    /// 任意の sink を `T` の table に登録する
    pub fn sink<T: Message>(&mut self, sink: Sink<T>) -> bool {
        let Some(table) = O::lookup::<T, B>(self.tables) else {
            return false;
        };
        self.pending.push(Box::new(move |meta: EntryMeta| {
            table.modify(|entries| entries.push(Entry { meta, sink }));
        }));
        self.routed.push(type_name::<T>());
        true
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// これまでに一致した出力型
    pub fn routed(&self) -> &[&'static str] {
        &self.routed
    }

    pub(crate) fn commit(self, id: SubscriptionId) -> Vec<&'static str> {
        let meta = EntryMeta {
            id,
            identity: self.identity,
        };
        for attach in self.pending {
            attach(meta);
        }
        self.routed
    }
}
