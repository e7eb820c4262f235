//! Pipeline - 合成されたパイプラインの構造
//!
//! # 学習ポイント
//! - 右に入れ子になった型レベルのリスト (`Pipeline<Head, Tail>` ... `End`)
//! - 合成時に要素へ役割 (Plain / Interceptor) を付与するラッパー型
//! - marker 型パラメータ (`IntoChain<Marker>`) でクロージャと構造体の impl を両立させる
//! - 関連型 (`Append::Output`) による型レベルの連結（flatten）
//!
//! # 構造
//! `compose(a, b)` は常に平坦なリストを作ります。
//! ```text
//! compose(compose(f, g), h)  ==  Pipeline<Plain<f>, Pipeline<Plain<g>, Pipeline<Plain<h>, End>>>
//! compose(f, compose(g, h))  ==  （同じ型）
//! ```
//! パイプラインの中にパイプラインが要素として現れることはありません。
//!
//! # 呼び出し
//! 先頭要素は「入力」と「残りのリスト（tail）」を受け取ります。
//! - Plain: 自分を呼んだ結果で tail を呼ぶ
//! - Interceptor: tail を continuation として渡し、呼び方を任せる
//!
//! 最後の要素の tail は `End` で、受け取った値をそのまま返します。

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::domain::role::{Role, StageInfo};
use crate::typed::intercept::Intercept;
use crate::typed::stage::{Borrowed, Source, Stage};

/// End はパイプラインの終端（恒等 continuation）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct End;

impl<In> Stage<In> for End {
    type Output = In;

    fn call(&mut self, input: In) -> In {
        input
    }
}

/// Plain は値だけを受け取る通常の要素
#[derive(Debug, Clone, Copy)]
pub struct Plain<S>(pub S);

/// Intercepting は continuation を受け取る要素
#[derive(Debug, Clone, Copy)]
pub struct Intercepting<I>(pub I);

/// 構造体の Stage をパイプライン要素にする
pub fn stage<S>(stage: S) -> Plain<S> {
    Plain(stage)
}

/// Intercept 実装をパイプライン要素にする
pub fn interceptor<I>(interceptor: I) -> Intercepting<I> {
    Intercepting(interceptor)
}

/// Element はパイプライン要素の役割と名前を報告する
pub trait Element {
    fn info(&self) -> StageInfo;
}

impl<S> Element for Plain<S> {
    fn info(&self) -> StageInfo {
        StageInfo {
            role: Role::Plain,
            name: type_name::<S>(),
        }
    }
}

impl<I> Element for Intercepting<I> {
    fn info(&self) -> StageInfo {
        StageInfo {
            role: Role::Interceptor,
            name: type_name::<I>(),
        }
    }
}

/// Link は「入力と tail を受け取って実行する」要素
///
/// 役割ごとの呼び出し規則はこの trait の impl にだけ書かれています。
pub trait Link<In, Tail> {
    type Output;

    fn run(&mut self, input: In, tail: &mut Tail) -> Self::Output;
}

impl<In, S, Tail> Link<In, Tail> for Plain<S>
where
    S: Stage<In>,
    Tail: Stage<<S as Stage<In>>::Output>,
{
    type Output = <Tail as Stage<<S as Stage<In>>::Output>>::Output;

    fn run(&mut self, input: In, tail: &mut Tail) -> Self::Output {
        let value = <S as Stage<In>>::call(&mut self.0, input);
        tail.call(value)
    }
}

impl<In, I, Tail> Link<In, Tail> for Intercepting<I>
where
    I: Intercept<In>,
    Tail: Stage<I::Item>,
{
    type Output = I::Output<<Tail as Stage<I::Item>>::Output>;

    fn run(&mut self, input: In, tail: &mut Tail) -> Self::Output {
        self.0
            .intercept(input, |item| <Tail as Stage<I::Item>>::call(&mut *tail, item))
    }
}

/// Pipeline は合成済みの要素列（先頭が最初に実行される）
///
/// # 使用例
/// ```ignore
/// let mut pipeline = compose!(|x: i32| x + 1, |x: i32| x * 2, |x: i32| x.to_string());
/// assert_eq!(pipeline.run(1), "4");
/// assert_eq!(pipeline.len(), 3);
/// ```
#[derive(Clone)]
pub struct Pipeline<H, T> {
    head: H,
    tail: T,
}

impl<H> Pipeline<H, End> {
    pub(crate) fn single(head: H) -> Self {
        Self { head, tail: End }
    }
}

impl<In, H, T> Stage<In> for Pipeline<H, T>
where
    H: Link<In, T>,
{
    type Output = H::Output;

    fn call(&mut self, input: In) -> H::Output {
        self.head.run(input, &mut self.tail)
    }
}

impl<H, T> Pipeline<H, T> {
    /// パイプラインを呼び出す
    pub fn run<In>(&mut self, input: In) -> <Self as Stage<In>>::Output
    where
        Self: Stage<In>,
    {
        <Self as Stage<In>>::call(self, input)
    }

    /// 単項関数に変換する（呼ぶたびに `run` と同じ処理をする）
    pub fn into_fn<In>(mut self) -> impl FnMut(In) -> <Self as Stage<In>>::Output
    where
        Self: Stage<In>,
    {
        move |input: In| <Self as Stage<In>>::call(&mut self, input)
    }

    /// 末尾に要素（またはパイプライン）を連結する
    pub fn then<N, M>(self, next: N) -> <Self as Append<N::Chain>>::Output
    where
        N: IntoChain<M>,
        Self: Append<N::Chain>,
    {
        self.append(next.into_chain())
    }
}

#[allow(clippy::len_without_is_empty)]
impl<H: Element, T: Chain> Pipeline<H, T> {
    /// 平坦化後の要素数
    pub fn len(&self) -> usize {
        <Self as Chain>::LEN
    }

    /// 要素ごとの役割（先頭から順に）
    pub fn roles(&self) -> Vec<Role> {
        self.describe().into_iter().map(|info| info.role).collect()
    }

    pub fn describe(&self) -> Vec<StageInfo> {
        let mut out = Vec::with_capacity(self.len());
        self.describe_into(&mut out);
        out
    }
}

impl<H: Element, T: Chain> fmt::Debug for Pipeline<H, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.describe())
            .finish()
    }
}

/// Chain は `End` で終わる要素列
pub trait Chain {
    const LEN: usize;

    fn describe_into(&self, out: &mut Vec<StageInfo>);
}

impl Chain for End {
    const LEN: usize = 0;

    fn describe_into(&self, _: &mut Vec<StageInfo>) {}
}

impl<H: Element, T: Chain> Chain for Pipeline<H, T> {
    const LEN: usize = T::LEN + 1;

    fn describe_into(&self, out: &mut Vec<StageInfo>) {
        out.push(self.head.info());
        self.tail.describe_into(out);
    }
}

/// Append は要素列を末尾に連結する
pub trait Append<Rhs> {
    type Output;

    fn append(self, rhs: Rhs) -> Self::Output;
}

impl<Rhs> Append<Rhs> for End {
    type Output = Rhs;

    fn append(self, rhs: Rhs) -> Rhs {
        rhs
    }
}

impl<H, T, Rhs> Append<Rhs> for Pipeline<H, T>
where
    T: Append<Rhs>,
{
    type Output = Pipeline<H, T::Output>;

    fn append(self, rhs: Rhs) -> Self::Output {
        Pipeline {
            head: self.head,
            tail: self.tail.append(rhs),
        }
    }
}

/// IntoChain は合成の材料になるもの（クロージャ・要素・パイプライン）
///
/// `Marker` はクロージャ用 impl と構造体用 impl を区別するためだけの型で、
/// 呼び出し側では常に推論されます。
pub trait IntoChain<Marker> {
    type Chain: Chain;

    fn into_chain(self) -> Self::Chain;
}

/// クロージャ・関数用の marker
pub struct FnMarker<In, Out>(PhantomData<fn(In) -> Out>);

/// ラッパー型・パイプライン用の marker
pub enum Wrapped {}

impl<F, In, Out> IntoChain<FnMarker<In, Out>> for F
where
    F: FnMut(In) -> Out,
{
    type Chain = Pipeline<Plain<F>, End>;

    fn into_chain(self) -> Self::Chain {
        Pipeline::single(Plain(self))
    }
}

impl<H: Element, T: Chain> IntoChain<Wrapped> for Pipeline<H, T> {
    type Chain = Self;

    fn into_chain(self) -> Self {
        self
    }
}

impl<S> IntoChain<Wrapped> for Plain<S> {
    type Chain = Pipeline<Plain<S>, End>;

    fn into_chain(self) -> Self::Chain {
        Pipeline::single(self)
    }
}

impl<I> IntoChain<Wrapped> for Intercepting<I> {
    type Chain = Pipeline<Intercepting<I>, End>;

    fn into_chain(self) -> Self::Chain {
        Pipeline::single(self)
    }
}

impl<F> IntoChain<Wrapped> for Source<F> {
    type Chain = Pipeline<Plain<Source<F>>, End>;

    fn into_chain(self) -> Self::Chain {
        Pipeline::single(Plain(self))
    }
}

impl<'a, S: ?Sized> IntoChain<Wrapped> for Borrowed<'a, S> {
    type Chain = Pipeline<Plain<Borrowed<'a, S>>, End>;

    fn into_chain(self) -> Self::Chain {
        Pipeline::single(Plain(self))
    }
}

/// compose は 2 つの要素・パイプラインを 1 つの平坦なパイプラインにする
///
/// - 要素 + 要素 → 2 要素のパイプライン
/// - 要素 + パイプライン → 先頭に追加
/// - パイプライン + 要素 → 末尾に追加
/// - パイプライン + パイプライン → 連結
pub fn compose<A, B, MA, MB>(first: A, second: B) -> <A::Chain as Append<B::Chain>>::Output
where
    A: IntoChain<MA>,
    B: IntoChain<MB>,
    A::Chain: Append<B::Chain>,
{
    first.into_chain().append(second.into_chain())
}

/// 3 つ以上を左から順に `compose` する
///
/// ```ignore
/// let mut p = compose!(parse, validate, store);
/// ```
#[macro_export]
macro_rules! compose {
    ($first:expr, $second:expr $(,)?) => {
        $crate::pipeline::compose($first, $second)
    };
    ($first:expr, $second:expr, $($rest:expr),+ $(,)?) => {
        $crate::compose!($crate::pipeline::compose($first, $second), $($rest),+)
    };
}
