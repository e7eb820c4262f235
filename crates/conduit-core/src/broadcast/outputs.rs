//! Outputs - Broadcaster が宣言する出力型のリスト
//!
//! # 学習ポイント
//! - タプル `(T0, T1, ...)` を「型のリスト」として扱う
//! - GAT (`type Tables<B>`) で backend ごとの table のタプルを作る
//! - 位置 marker (`Idx0`, `Idx1`, ...) で「T はリストの何番目か」を型で表す
//! - `Any::downcast_ref` による、登録時の「この型は宣言されているか」の判定
//!
//! `Has<T, I>` は「T が I 番目に宣言されている」ことを表します。
//! 配信は `O: Has<T, I>` を要求するので、宣言していない型の配信はコンパイルエラーです。
//! 登録 (`Wiring`) は購読者が受け取れる型ごとに `lookup` し、一致した table にだけ追加します。

use std::any::{Any, type_name};
use std::sync::Arc;

use super::broadcaster::Broadcaster;
use super::wiring::Wiring;
use crate::impls::guarded::Guarded;
use crate::ports::backend::{Backend, EntryMeta, Sink, SubscriberTable};
use crate::typed::receive::Message;

/// Outputs は出力型のリスト（要素数 1〜6 のタプル）
pub trait Outputs: Sized + 'static {
    /// 出力型ごとの table を並べたタプル
    type Tables<B: Backend>: Default;

    fn type_names() -> Vec<&'static str>;

    /// `T` が宣言されていればその table を返す
    fn lookup<T: Message, B: Backend>(tables: &Self::Tables<B>) -> Option<&B::Table<T>>;

    fn remove_where<B: Backend>(
        tables: &Self::Tables<B>,
        pred: &dyn Fn(&EntryMeta) -> bool,
    ) -> usize;

    fn metas<B: Backend>(tables: &Self::Tables<B>) -> Vec<EntryMeta>;

    /// `target` の出力型それぞれについて、`target` へ転送する sink を登録する
    fn relay<Src: Outputs, SB: Backend>(
        target: &Arc<Broadcaster<Self, Guarded>>,
        wiring: &mut Wiring<'_, Src, SB>,
    ) where
        Broadcaster<Self, Guarded>: Send + Sync;
}

/// Has は `T` が位置 `I` に宣言されていることを表す
pub trait Has<T: Message, I>: Outputs {
    fn table<B: Backend>(tables: &Self::Tables<B>) -> &B::Table<T>;
}

pub enum Idx0 {}
pub enum Idx1 {}
pub enum Idx2 {}
pub enum Idx3 {}
pub enum Idx4 {}
pub enum Idx5 {}

macro_rules! impl_outputs {
    ($all:tt; $($ty:ident : $idx:tt : $marker:ident),+) => {
        impl<$($ty: Message),+> Outputs for ($($ty,)+) {
            type Tables<Bk: Backend> = ($(Bk::Table<$ty>,)+);

            fn type_names() -> Vec<&'static str> {
                vec![$(type_name::<$ty>()),+]
            }

            fn lookup<M: Message, Bk: Backend>(tables: &Self::Tables<Bk>) -> Option<&Bk::Table<M>> {
                $(
                    if let Some(table) = (&tables.$idx as &dyn Any).downcast_ref::<Bk::Table<M>>() {
                        return Some(table);
                    }
                )+
                None
            }

            fn remove_where<Bk: Backend>(
                tables: &Self::Tables<Bk>,
                pred: &dyn Fn(&EntryMeta) -> bool,
            ) -> usize {
                0 $(+ tables.$idx.remove_where(pred))+
            }

            fn metas<Bk: Backend>(tables: &Self::Tables<Bk>) -> Vec<EntryMeta> {
                let mut out = Vec::new();
                $(out.extend(tables.$idx.metas());)+
                out
            }

            fn relay<Src: Outputs, SB: Backend>(
                target: &Arc<Broadcaster<Self, Guarded>>,
                wiring: &mut Wiring<'_, Src, SB>,
            ) where
                Broadcaster<Self, Guarded>: Send + Sync,
            {
                $(
                    let relay = Arc::clone(target);
                    wiring.sink::<$ty>(Sink::Owned(Arc::new(move |value: $ty| {
                        relay.forward::<$ty, $marker>(value)
                    })));
                )+
            }
        }

        $(impl_has!($all; $ty : $idx : $marker);)+
    };
}

macro_rules! impl_has {
    ([$($all:ident),+]; $ty:ident : $idx:tt : $marker:ident) => {
        impl<$($all: Message),+> Has<$ty, $marker> for ($($all,)+) {
            fn table<Bk: Backend>(tables: &Self::Tables<Bk>) -> &Bk::Table<$ty> {
                &tables.$idx
            }
        }
    };
}

impl_outputs!([T0]; T0: 0: Idx0);
impl_outputs!([T0, T1]; T0: 0: Idx0, T1: 1: Idx1);
impl_outputs!([T0, T1, T2]; T0: 0: Idx0, T1: 1: Idx1, T2: 2: Idx2);
impl_outputs!([T0, T1, T2, T3]; T0: 0: Idx0, T1: 1: Idx1, T2: 2: Idx2, T3: 3: Idx3);
impl_outputs!(
    [T0, T1, T2, T3, T4];
    T0: 0: Idx0, T1: 1: Idx1, T2: 2: Idx2, T3: 3: Idx3, T4: 4: Idx4
);
impl_outputs!(
    [T0, T1, T2, T3, T4, T5];
    T0: 0: Idx0, T1: 1: Idx1, T2: 2: Idx2, T3: 3: Idx3, T4: 4: Idx4, T5: 5: Idx5
);
