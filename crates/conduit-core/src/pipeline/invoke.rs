//! Invoke / Pipe - 呼び出しと「呼び出し or 合成」の二重ディスパッチ
//!
//! # 学習ポイント
//! - 遅延値（thunk）を明示的な型 `Deferred<F>` として扱う
//! - marker 型 (`Invoke` / `InvokeDeferred` / `Compose`) で 1 つのメソッドに複数の意味を持たせる
//!
//! # Pipe の判定規則
//! `lhs.pipe(rhs)` は次のどれか 1 つに解決されます。
//! - `rhs` が `lhs` の型で呼び出せる → 呼び出す (`Invoke`)
//! - `lhs` が `Deferred` で、`rhs` がその結果の型で呼び出せる → 解決してから呼び出す (`InvokeDeferred`)
//! - どちらも合成の材料になる → 合成する (`Compose`)
//!
//! 判定は trait 解決でコンパイル時に行われます。
//! 複数に当てはまる場合はコンパイルエラーになり、黙ってどちらかが選ばれることはありません。

use std::marker::PhantomData;

use super::chain::{Append, IntoChain, compose};
use crate::typed::stage::Stage;

/// callable を value で呼び出す
pub fn invoke<S, In>(mut callable: S, value: In) -> S::Output
where
    S: Stage<In>,
{
    callable.call(value)
}

/// Deferred は引数なしで値を生成する thunk
///
/// 呼び出し側に渡されると、まず解決されてからその結果で呼び出しが行われます。
#[derive(Debug, Clone, Copy)]
pub struct Deferred<F>(F);

/// thunk を作る
pub fn deferred<F, V>(producer: F) -> Deferred<F>
where
    F: FnOnce() -> V,
{
    Deferred(producer)
}

impl<F, V> Deferred<F>
where
    F: FnOnce() -> V,
{
    /// thunk を評価して値を得る
    pub fn resolve(self) -> V {
        (self.0)()
    }
}

/// thunk を解決してから callable を呼び出す
pub fn invoke_deferred<S, F, V>(callable: S, value: Deferred<F>) -> S::Output
where
    F: FnOnce() -> V,
    S: Stage<V>,
{
    invoke(callable, value.resolve())
}

/// `Pipe` の marker: 右辺を左辺の値で呼び出す
pub enum Invoke {}

/// `Pipe` の marker: 左辺の thunk を解決して右辺を呼び出す
pub enum InvokeDeferred {}

/// `Pipe` の marker: 左辺と右辺を合成する
pub struct Compose<MA, MB>(PhantomData<fn() -> (MA, MB)>);

/// Pipe は呼び出しと合成を兼ねる連結操作
///
/// # 使用例
/// ```ignore
/// let pipeline = (|x: i32| x + 1).pipe(|x: i32| x * 2); // 合成
/// let result = 3.pipe(pipeline);                         // 呼び出し → 8
/// ```
pub trait Pipe<Rhs, Marker>: Sized {
    type Output;

    fn pipe(self, rhs: Rhs) -> Self::Output;
}

impl<L, R> Pipe<R, Invoke> for L
where
    R: Stage<L>,
{
    type Output = R::Output;

    fn pipe(self, rhs: R) -> R::Output {
        invoke(rhs, self)
    }
}

impl<F, V, R> Pipe<R, InvokeDeferred> for Deferred<F>
where
    F: FnOnce() -> V,
    R: Stage<V>,
{
    type Output = R::Output;

    fn pipe(self, rhs: R) -> R::Output {
        invoke_deferred(rhs, self)
    }
}

impl<L, R, MA, MB> Pipe<R, Compose<MA, MB>> for L
where
    L: IntoChain<MA>,
    R: IntoChain<MB>,
    L::Chain: Append<R::Chain>,
{
    type Output = <L::Chain as Append<R::Chain>>::Output;

    fn pipe(self, rhs: R) -> Self::Output {
        compose(self, rhs)
    }
}
