//! Ports - 抽象化レイヤー
//!
//! Broadcaster と購読者リストの実装（backend）をつなぐ trait を定義します。
//! 実装は `impls` にあります。

pub mod backend;

pub use self::backend::{Backend, Entry, EntryMeta, Sink, SubscriberTable};
