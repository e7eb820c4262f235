//! Impls - backend の実装
//!
//! # 含まれる実装
//! - **Local**: 単一スレッド用（`RefCell<Rc<_>>`）
//! - **Guarded**: 複数スレッド用（`ArcSwap` + writer `Mutex`）

pub mod guarded;
pub mod local;

pub use self::guarded::{Guarded, GuardedTable};
pub use self::local::{Local, LocalTable};
