//! Pipeline - 合成と呼び出し
//!
//! - **chain**: パイプラインの構造（`Pipeline`, `End`, 役割ラッパー, `compose`）
//! - **invoke**: 呼び出し規則（`invoke`, `Deferred`, `Pipe`）
//! - **adapters**: for_each / maybe / repeat / visit / unpack

pub mod adapters;
pub mod chain;
pub mod invoke;

pub use self::adapters::{
    ForEach, Maybe, Repeat, Unpacked, Visitable, Visiting, for_each, maybe, repeat, unpack, visit,
};
pub use self::chain::{
    Append, Chain, Element, End, FnMarker, Intercepting, IntoChain, Link, Pipeline, Plain, Wrapped,
    compose, interceptor, stage,
};
pub use self::invoke::{
    Compose, Deferred, Invoke, InvokeDeferred, Pipe, deferred, invoke, invoke_deferred,
};
