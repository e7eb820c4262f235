//! Broadcast - 型付きマルチキャスト
//!
//! - **outputs**: 出力型のリスト（`Outputs`, `Has`）
//! - **wiring**: 購読者の登録手続き（`Wiring`）
//! - **broadcaster**: 配信本体（`Broadcaster`）
//! - **builder**: 構築と設定の検証（`BroadcasterBuilder`）

pub mod broadcaster;
pub mod builder;
pub mod outputs;
pub mod wiring;

pub use self::broadcaster::Broadcaster;
pub use self::builder::BroadcasterBuilder;
pub use self::outputs::{Has, Idx0, Idx1, Idx2, Idx3, Idx4, Idx5, Outputs};
pub use self::wiring::Wiring;
