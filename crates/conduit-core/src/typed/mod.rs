//! Typed callables: stages, interceptors, receivers.

pub mod intercept;
pub mod receive;
pub mod stage;

pub use intercept::{FnInterceptor, Intercept, intercept_fn};
pub use receive::{Message, Outcome, Receive, ReceiveMut, Subscriber};
pub use stage::{Borrowed, Source, Stage, by_ref, source};
