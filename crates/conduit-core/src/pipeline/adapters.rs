//! Adapters - コレクション・Option・直和型・タプルをパイプラインにつなぐ要素
//!
//! # 含まれる要素
//! - **for_each**: 反復可能な入力の各要素で continuation を呼ぶ（要素数回）
//! - **maybe**: `Option` が `Some` のときだけ continuation を呼ぶ（0 回か 1 回）
//! - **repeat(n)**: 同じ値で continuation を n 回呼び、結果を集める
//! - **visit**: 直和型の「実際に入っている値」で continuation を呼ぶ
//! - **unpack(f)**: タプルを展開して多引数関数を呼ぶ
//!
//! # 使用例
//! ```ignore
//! let mut p = compose!(for_each(), maybe(), |x: i32| println!("{x}"));
//! p.run(vec![Some(1), None, Some(3)]); // 1 と 3 だけ出力される
//! ```

use super::chain::{Element, End, Intercepting, IntoChain, Link, Pipeline, Plain, Wrapped};
use crate::domain::role::{Role, StageInfo};
use crate::typed::intercept::Intercept;
use crate::typed::stage::Stage;

#[derive(Debug, Clone, Copy, Default)]
pub struct ForEach;

pub fn for_each() -> Intercepting<ForEach> {
    Intercepting(ForEach)
}

impl<C> Intercept<C> for ForEach
where
    C: IntoIterator,
{
    type Item = C::Item;
    type Output<R> = ();

    fn intercept<R, N>(&mut self, input: C, mut next: N)
    where
        N: FnMut(C::Item) -> R,
    {
        for item in input {
            next(item);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Maybe;

pub fn maybe() -> Intercepting<Maybe> {
    Intercepting(Maybe)
}

impl<T> Intercept<Option<T>> for Maybe {
    type Item = T;
    type Output<R> = Option<R>;

    fn intercept<R, N>(&mut self, input: Option<T>, next: N) -> Option<R>
    where
        N: FnMut(T) -> R,
    {
        input.map(next)
    }
}

/// Repeat は continuation を決まった回数呼ぶ
///
/// 最後の 1 回には元の値を、それ以外には複製を渡します。
#[derive(Debug, Clone, Copy)]
pub struct Repeat(pub usize);

pub fn repeat(times: usize) -> Intercepting<Repeat> {
    Intercepting(Repeat(times))
}

impl<T: Clone> Intercept<T> for Repeat {
    type Item = T;
    type Output<R> = Vec<R>;

    fn intercept<R, N>(&mut self, input: T, mut next: N) -> Vec<R>
    where
        N: FnMut(T) -> R,
    {
        let mut out = Vec::with_capacity(self.0);
        if self.0 == 0 {
            return out;
        }
        for _ in 1..self.0 {
            out.push(next(input.clone()));
        }
        out.push(next(input));
        out
    }
}

/// Visitable は continuation `K` で訪問できる直和型
///
/// `K` はすべての選択肢の型について `Stage` を実装している必要があります。
/// `Result<T, E>` には実装済みです。独自の enum には次のように実装します。
///
/// ```ignore
/// enum Shape { Circle(f64), Square(f64, f64) }
///
/// impl<K, R> Visitable<K> for Shape
/// where
///     K: Stage<f64, Output = R> + Stage<(f64, f64), Output = R>,
/// {
///     type Output = R;
///     fn accept(self, visitor: &mut K) -> R {
///         match self {
///             Shape::Circle(r) => <K as Stage<f64>>::call(visitor, r),
///             Shape::Square(w, h) => <K as Stage<(f64, f64)>>::call(visitor, (w, h)),
///         }
///     }
/// }
/// ```
pub trait Visitable<K> {
    type Output;

    fn accept(self, visitor: &mut K) -> Self::Output;
}

impl<T, E, K, R> Visitable<K> for Result<T, E>
where
    K: Stage<T, Output = R> + Stage<E, Output = R>,
{
    type Output = R;

    fn accept(self, visitor: &mut K) -> R {
        match self {
            Ok(value) => <K as Stage<T>>::call(visitor, value),
            Err(error) => <K as Stage<E>>::call(visitor, error),
        }
    }
}

/// Visiting は直和型を受け取る要素（continuation に選択肢をそのまま渡す）
#[derive(Debug, Clone, Copy, Default)]
pub struct Visiting;

pub fn visit() -> Visiting {
    Visiting
}

impl Element for Visiting {
    fn info(&self) -> StageInfo {
        StageInfo {
            role: Role::Interceptor,
            name: "visit",
        }
    }
}

impl<In, Tail> Link<In, Tail> for Visiting
where
    In: Visitable<Tail>,
{
    type Output = In::Output;

    fn run(&mut self, input: In, tail: &mut Tail) -> In::Output {
        input.accept(tail)
    }
}

impl IntoChain<Wrapped> for Visiting {
    type Chain = Pipeline<Visiting, End>;

    fn into_chain(self) -> Self::Chain {
        Pipeline::single(self)
    }
}

/// Unpacked はタプルを展開して多引数関数を呼ぶ Stage
#[derive(Debug, Clone, Copy)]
pub struct Unpacked<F>(F);

pub fn unpack<F>(f: F) -> Unpacked<F> {
    Unpacked(f)
}

macro_rules! impl_unpacked {
    ($($arg:ident),+) => {
        impl<F, R, $($arg),+> Stage<($($arg,)+)> for Unpacked<F>
        where
            F: FnMut($($arg),+) -> R,
        {
            type Output = R;

            #[allow(non_snake_case)]
            fn call(&mut self, ($($arg,)+): ($($arg,)+)) -> R {
                (self.0)($($arg),+)
            }
        }
    };
}

impl_unpacked!(A, B);
impl_unpacked!(A, B, C);
impl_unpacked!(A, B, C, D);

impl<F> IntoChain<Wrapped> for Unpacked<F> {
    type Chain = Pipeline<Plain<Unpacked<F>>, End>;

    fn into_chain(self) -> Self::Chain {
        Pipeline::single(Plain(self))
    }
}
