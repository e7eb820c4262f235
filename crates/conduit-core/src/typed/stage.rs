//! Stage trait - 「値 T で呼び出せる」ことを表す trait
//!
//! # 学習ポイント
//! - ジェネリック trait (`Stage<In>`) による呼び出し可能性の判定
//! - クロージャへの blanket impl（`FnMut(In) -> Out` なら何でも Stage）
//! - 1 つの構造体に複数の `Stage<Ti>` を実装するとオーバーロード集合になる
//!
//! 「C は T で呼び出せるか？」はすべて `C: Stage<T>` という trait 境界で表します。
//! 判定はコンパイル時に行われ、満たさない合成はコンパイルエラーになります。

/// Stage は `In` で呼び出せる callable
///
/// # 使用例
/// ```ignore
/// struct Printer;
///
/// impl Stage<i32> for Printer {
///     type Output = ();
///     fn call(&mut self, input: i32) { println!("int {input}"); }
/// }
///
/// impl Stage<String> for Printer {
///     type Output = ();
///     fn call(&mut self, input: String) { println!("string {input}"); }
/// }
/// ```
pub trait Stage<In> {
    type Output;

    fn call(&mut self, input: In) -> Self::Output;
}

impl<F, In, Out> Stage<In> for F
where
    F: FnMut(In) -> Out,
{
    type Output = Out;

    fn call(&mut self, input: In) -> Out {
        self(input)
    }
}

/// Source は引数なしの生成関数を `()` で呼べる Stage にするラッパー
///
/// パイプラインの先頭に置くと、`pipeline.run(())` で値の生成から始められます。
#[derive(Debug, Clone, Copy)]
pub struct Source<F>(pub F);

/// 引数なしのクロージャを Source にする
pub fn source<F, V>(producer: F) -> Source<F>
where
    F: FnMut() -> V,
{
    Source(producer)
}

impl<F, V> Stage<()> for Source<F>
where
    F: FnMut() -> V,
{
    type Output = V;

    fn call(&mut self, _: ()) -> V {
        (self.0)()
    }
}

/// Borrowed は Stage への非所有参照
///
/// パイプラインに参照として組み込む場合に使います。
/// 呼び出し時には参照先へそのまま委譲されます。
/// 参照先がパイプラインより長生きすることは借用チェッカーが保証します。
pub struct Borrowed<'a, S: ?Sized>(&'a mut S);

/// Stage を借用したまま合成・呼び出しに使う
pub fn by_ref<S: ?Sized>(stage: &mut S) -> Borrowed<'_, S> {
    Borrowed(stage)
}

impl<In, S> Stage<In> for Borrowed<'_, S>
where
    S: Stage<In> + ?Sized,
{
    type Output = S::Output;

    fn call(&mut self, input: In) -> S::Output {
        self.0.call(input)
    }
}
