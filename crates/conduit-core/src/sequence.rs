//! Sequence - pull 型の値の供給
//!
//! `Generator` は空 (`None`) になるまで値を 1 つずつ返します。
//! `iter()` で `Iterator` として扱えるので、`Broadcaster::broadcast_iter` や
//! `for_each` 付きのパイプラインにそのまま渡せます。
//!
//! # 使用例
//! ```ignore
//! let mut countdown = sequence::from_fn({
//!     let mut n = 3;
//!     move || (n > 0).then(|| { n -= 1; n + 1 })
//! });
//! ticks.broadcast_iter(countdown.iter())?;
//! ```

use crate::typed::stage::Stage;

pub trait Generator {
    type Item;

    fn next_value(&mut self) -> Option<Self::Item>;

    /// 借用したまま `Iterator` として扱う
    fn iter(&mut self) -> Iter<'_, Self>
    where
        Self: Sized,
    {
        Iter { generator: self }
    }

    /// 空になるまで値を `stage` に渡す。渡した数を返す
    ///
    /// 失敗しうる Stage には `try_feed` を使います。
    fn feed<S>(&mut self, stage: &mut S) -> usize
    where
        Self: Sized,
        S: Stage<Self::Item, Output = ()>,
    {
        let mut fed = 0;
        while let Some(value) = self.next_value() {
            <S as Stage<Self::Item>>::call(stage, value);
            fed += 1;
        }
        fed
    }

    /// 値を `stage` に渡し、最初の `Err` で止まる
    ///
    /// 失敗した値より後ろは generator に残ります。
    fn try_feed<S, E>(&mut self, stage: &mut S) -> Result<usize, E>
    where
        Self: Sized,
        S: Stage<Self::Item, Output = Result<(), E>>,
    {
        let mut fed = 0;
        while let Some(value) = self.next_value() {
            <S as Stage<Self::Item>>::call(stage, value)?;
            fed += 1;
        }
        Ok(fed)
    }
}

pub struct Iter<'a, G> {
    generator: &'a mut G,
}

impl<G: Generator> Iterator for Iter<'_, G> {
    type Item = G::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.generator.next_value()
    }
}

/// クロージャから作る Generator
#[derive(Clone)]
pub struct FromFn<F>(F);

pub fn from_fn<T, F: FnMut() -> Option<T>>(f: F) -> FromFn<F> {
    FromFn(f)
}

impl<T, F: FnMut() -> Option<T>> Generator for FromFn<F> {
    type Item = T;

    fn next_value(&mut self) -> Option<T> {
        (self.0)()
    }
}
