//! conduit-core
//!
//! Core building blocks for typed pipelines and multicast dispatch.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, identity, role, errors）
//! - **typed**: 型付き callable（Stage, Intercept, Receive, Subscriber）
//! - **pipeline**: 合成と呼び出し（compose, invoke, Pipe, adapters）
//! - **ports**: 抽象化レイヤー（Backend, SubscriberTable）
//! - **impls**: backend の実装（Local, Guarded）
//! - **broadcast**: 型付きマルチキャスト（Broadcaster, BroadcasterBuilder）
//! - **config**: Broadcaster の設定（serde）
//! - **sequence**: pull 型の値の供給（Generator）
//!
//! # 使用例
//! ```ignore
//! use conduit_core::prelude::*;
//!
//! let mut double_then_print = compose(|x: i32| x * 2, |x: i32| println!("{x}"));
//! 21.pipe(by_ref(&mut double_then_print));
//!
//! let ticks: Broadcaster<(i32, String), Guarded> = Broadcaster::new();
//! ticks.attach_stage::<i32, _, _>(double_then_print);
//! ticks.broadcast(4)?;
//! ```

pub mod broadcast;
pub mod config;
pub mod domain;
pub mod impls;
pub mod pipeline;
pub mod ports;
pub mod sequence;
pub mod typed;

pub use broadcast::{Broadcaster, BroadcasterBuilder, Wiring};
pub use config::{BroadcasterConfig, DuplicatePolicy};
pub use domain::{AttachError, BroadcastError, ConfigError, DeliveryError, SubscriptionId};
pub use impls::{Guarded, Local};

/// よく使う型と関数をまとめて import する
pub mod prelude {
    pub use crate::broadcast::{Broadcaster, BroadcasterBuilder, Outputs, Wiring};
    pub use crate::config::{BroadcasterConfig, DuplicatePolicy};
    pub use crate::domain::{AttachError, BroadcastError, DeliveryError, SubscriptionId};
    pub use crate::impls::{Guarded, Local};
    pub use crate::pipeline::{
        Pipe, compose, deferred, for_each, interceptor, invoke, maybe, repeat, stage, unpack, visit,
    };
    pub use crate::ports::Backend;
    pub use crate::sequence::{Generator, from_fn};
    pub use crate::typed::{
        Outcome, Receive, ReceiveMut, Stage, Subscriber, by_ref, intercept_fn, source,
    };
}
