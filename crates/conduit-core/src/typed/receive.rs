//! Receive / Subscriber - Broadcaster の購読者側 trait
//!
//! # 学習ポイント
//! - 型ごとの受信 trait (`Receive<T>`) を複数実装してオーバーロードを表す
//! - `Subscriber::wire` で「どの出力型を受け取るか」を登録時に宣言する
//!
//! 受信は 2 種類あります。
//! - **Receive<T>**: 値を所有権ごと受け取る（他の購読者の move の影響を受けない）
//! - **ReceiveMut<T>**: 同じインスタンスを `&mut T` で受け取る（変更は後続に見える）

use std::sync::Arc;

use crate::broadcast::Wiring;
use crate::broadcast::outputs::Outputs;
use crate::domain::errors::DeliveryError;
use crate::ports::backend::Backend;

/// Message は Broadcaster で配信できる値の型
///
/// 最後以外の購読者には複製を渡すので `Clone` が必要です。
pub trait Message: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Message for T {}

/// Outcome は Stage の戻り値を配信結果に変換する
///
/// Stage を購読者として登録したとき、その戻り値がこの trait で配信結果になります。
/// - `()`: 常に成功
/// - `Result<(), DeliveryError>`: そのまま
/// - `Option<T>`: `None`（`maybe` で continuation が呼ばれなかった）は成功
pub trait Outcome {
    fn into_delivery(self) -> Result<(), DeliveryError>;
}

impl Outcome for () {
    fn into_delivery(self) -> Result<(), DeliveryError> {
        Ok(())
    }
}

impl Outcome for Result<(), DeliveryError> {
    fn into_delivery(self) -> Result<(), DeliveryError> {
        self
    }
}

impl<T: Outcome> Outcome for Option<T> {
    fn into_delivery(self) -> Result<(), DeliveryError> {
        self.map_or(Ok(()), Outcome::into_delivery)
    }
}

/// Receive は値を所有権ごと受け取る
///
/// # 使用例
/// ```ignore
/// struct Recorder { seen: Mutex<Vec<String>> }
///
/// impl Receive<String> for Recorder {
///     fn receive(&self, value: String) -> Result<(), DeliveryError> {
///         self.seen.lock().unwrap().push(value);
///         Ok(())
///     }
/// }
/// ```
pub trait Receive<T>: Send + Sync {
    fn receive(&self, value: T) -> Result<(), DeliveryError>;
}

/// ReceiveMut は配信中の値を参照で受け取る
pub trait ReceiveMut<T>: Send + Sync {
    fn receive_mut(&self, value: &mut T) -> Result<(), DeliveryError>;
}

/// Subscriber は `Arc` で登録できる購読者
///
/// `wire` の中で受け取りたい型を `Wiring::receive` / `Wiring::receive_mut` で列挙します。
/// Broadcaster が宣言していない型は無視され、1 つも一致しなければ登録は拒否されます。
///
/// # 使用例
/// ```ignore
/// impl Subscriber for Recorder {
///     fn wire<O: Outputs, B: Backend>(self: Arc<Self>, wiring: &mut Wiring<'_, O, B>) {
///         wiring.receive::<i32, _>(&self);
///         wiring.receive::<String, _>(&self);
///     }
/// }
/// ```
pub trait Subscriber: Send + Sync + 'static {
    fn wire<O: Outputs, B: Backend>(self: Arc<Self>, wiring: &mut Wiring<'_, O, B>);
}
