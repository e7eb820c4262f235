//! Intercept trait - continuation を受け取るパイプライン要素
//!
//! # 学習ポイント
//! - GAT (`type Output<R>`) で「continuation の戻り値型に応じた戻り値」を表す
//! - continuation はジェネリックな `FnMut` として渡されるので、ゼロコストで呼べる
//!
//! Interceptor はパイプライン中の位置 k に置かれると、
//! 「k より後ろ全部」を continuation として受け取ります。
//! 呼ぶか、何回呼ぶか、どの値で呼ぶかは interceptor が決めます。

use std::marker::PhantomData;

/// Intercept は continuation の呼び方を自分で決めるパイプライン要素
///
/// # 使用例
/// ```ignore
/// struct Twice;
///
/// impl Intercept<i32> for Twice {
///     type Item = i32;
///     type Output<R> = (R, R);
///
///     fn intercept<R, N>(&mut self, input: i32, mut next: N) -> (R, R)
///     where
///         N: FnMut(i32) -> R,
///     {
///         (next(input), next(input))
///     }
/// }
/// ```
pub trait Intercept<In> {
    /// continuation に渡す値の型
    type Item;

    /// continuation の戻り値が `R` のときの interceptor の戻り値
    type Output<R>;

    fn intercept<R, N>(&mut self, input: In, next: N) -> Self::Output<R>
    where
        N: FnMut(Self::Item) -> R;
}

/// FnInterceptor はクロージャを interceptor として使うためのラッパー
///
/// continuation は `&mut dyn FnMut(Item)` として渡され、後段の戻り値は捨てられます。
/// 後段の結果を使いたい場合は `Intercept` を直接実装してください。
pub struct FnInterceptor<F, Item, Out> {
    f: F,
    _marker: PhantomData<fn(Item) -> Out>,
}

/// クロージャから interceptor を作る
///
/// # 使用例
/// ```ignore
/// let twice = intercept_fn(|x: i32, next: &mut dyn FnMut(i32)| {
///     next(x);
///     next(x);
/// });
/// ```
pub fn intercept_fn<F, In, Item, Out>(f: F) -> FnInterceptor<F, Item, Out>
where
    F: FnMut(In, &mut dyn FnMut(Item)) -> Out,
{
    FnInterceptor {
        f,
        _marker: PhantomData,
    }
}

impl<F, In, Item, Out> Intercept<In> for FnInterceptor<F, Item, Out>
where
    F: FnMut(In, &mut dyn FnMut(Item)) -> Out,
{
    type Item = Item;
    type Output<R> = Out;

    fn intercept<R, N>(&mut self, input: In, mut next: N) -> Out
    where
        N: FnMut(Item) -> R,
    {
        let mut forward = |item: Item| {
            next(item);
        };
        (self.f)(input, &mut forward)
    }
}

impl<F: Clone, Item, Out> Clone for FnInterceptor<F, Item, Out> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}
