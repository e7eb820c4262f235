//! Local - 単一スレッド用の backend
//!
//! # 学習ポイント
//! - `RefCell<Rc<_>>` による単一スレッドの copy-on-write
//! - `Rc::make_mut` は参照が 1 つならその場で、共有中なら複製してから変更する
//!
//! `Rc` と `RefCell` を使うので、この backend の table は `Send` でも `Sync` でもありません。
//! 複数スレッドから同時に使えないことはコンパイラが保証します。
//!
//! 配信中は `Rc` のスナップショットを保持するだけで `RefCell` の借用は持ちません。
//! そのため購読者が配信中に attach/detach しても borrow エラーにはなりません。

use std::cell::RefCell;
use std::rc::Rc;

use crate::ports::backend::{Backend, Entry, SubscriberTable};
use crate::typed::receive::Message;

/// 単一スレッド用の backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Local;

impl Backend for Local {
    type Table<T: Message> = LocalTable<T>;
}

pub struct LocalTable<T> {
    entries: RefCell<Rc<Vec<Entry<T>>>>,
}

impl<T> Default for LocalTable<T> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(Rc::new(Vec::new())),
        }
    }
}

impl<T> SubscriberTable<T> for LocalTable<T> {
    type Snapshot = Rc<Vec<Entry<T>>>;

    fn snapshot(&self) -> Rc<Vec<Entry<T>>> {
        Rc::clone(&self.entries.borrow())
    }

    fn modify<R>(&self, f: impl FnOnce(&mut Vec<Entry<T>>) -> R) -> R {
        let mut current = self.entries.borrow_mut();
        f(Rc::make_mut(&mut current))
    }
}
