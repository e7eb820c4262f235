//! Broadcaster - 型付きのマルチキャスト配信
//!
//! # 学習ポイント
//! - 出力型のタプル `O` と backend `B` の 2 つの型パラメータ
//! - 型ごとの table に分けて保持し、配信は値の静的な型で table を選ぶ
//! - 最後の購読者にだけ値を move し、それ以外には複製を渡す
//! - `Arc<Broadcaster<_, Guarded>>` 自身も購読者になれる（連鎖）
//!
//! # 配信の規則
//! - 登録順に呼ぶ
//! - `Receive<T>` の購読者は自分専用の値を受け取る。他の購読者が値を消費しても影響しない
//! - `ReceiveMut<T>` の購読者は同じインスタンスを参照で受け取る。変更は後続から見える
//! - 購読者が失敗したらそこで打ち切り、`BroadcastError` を返す（後続には届かない）
//!
//! # 使用例
//! ```ignore
//! let ticks: Broadcaster<(u64, String), Guarded> = Broadcaster::new();
//! let id = ticks.attach_fn(|n: u64| println!("tick {n}"));
//! ticks.attach(Arc::new(Recorder::default()))?;
//!
//! ticks.broadcast(1u64)?;
//! ticks.broadcast("done".to_string())?;
//! ticks.detach(id);
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace, warn};

use super::builder::BroadcasterBuilder;
use super::outputs::{Has, Outputs};
use super::wiring::Wiring;
use crate::config::{BroadcasterConfig, DuplicatePolicy};
use crate::domain::errors::{AttachError, BroadcastError, DeliveryError};
use crate::domain::identity::Identity;
use crate::domain::ids::SubscriptionId;
use crate::impls::guarded::Guarded;
use crate::impls::local::Local;
use crate::ports::backend::{Backend, Entry, EntryMeta, Sink, SubscriberTable};
use crate::typed::receive::{Message, Outcome, Subscriber};
use crate::typed::stage::Stage;

/// Broadcaster は出力型 `O` の値を購読者へ配信する
///
/// - `O`: 出力型のタプル（例: `(i32, String)`）
/// - `B`: backend（`Local` は単一スレッド用、`Guarded` は複数スレッド用）
pub struct Broadcaster<O: Outputs, B: Backend = Local> {
    config: BroadcasterConfig,
    tables: O::Tables<B>,
    /// `DuplicatePolicy::Reject` の重複判定から登録までを直列化する
    attaching: Mutex<()>,
}

impl<O: Outputs, B: Backend> Broadcaster<O, B> {
    pub fn new() -> Self {
        Self::with_config(BroadcasterConfig::default_v1())
    }

    pub fn with_config(config: BroadcasterConfig) -> Self {
        Self {
            config,
            tables: Default::default(),
            attaching: Mutex::new(()),
        }
    }

    pub fn builder() -> BroadcasterBuilder<O, B> {
        BroadcasterBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &BroadcasterConfig {
        &self.config
    }

    /// 購読者を登録する
    ///
    /// 購読者が受け取れる出力型それぞれの table に追加されます。
    /// 1 つも一致しなければ、どの table にも触れずに `NoMatchingOutput` を返します。
    ///
    /// `DuplicatePolicy::Reject` のときは判定から登録までを 1 つのロックの中で行うので、
    /// 同じ `Arc` を複数スレッドから同時に attach しても成功するのは 1 回だけです。
    /// このロックの中で `Subscriber::wire` が呼ばれるため、`wire` から同じ
    /// Broadcaster へ attach してはいけません。
    pub fn attach<S: Subscriber>(&self, subscriber: Arc<S>) -> Result<SubscriptionId, AttachError> {
        let identity = Identity::of(&subscriber);
        let reject_guard = (self.config.duplicates == DuplicatePolicy::Reject)
            .then(|| self.attaching.lock().unwrap_or_else(PoisonError::into_inner));
        if reject_guard.is_some() && self.is_attached(identity) {
            debug!(
                broadcaster = %self.config.name,
                %identity,
                "duplicate subscriber rejected"
            );
            return Err(AttachError::AlreadyAttached { identity });
        }

        let mut wiring: Wiring<'_, O, B> = Wiring::new(&self.tables, Some(identity));
        S::wire(subscriber, &mut wiring);
        if wiring.is_empty() {
            return Err(AttachError::NoMatchingOutput {
                subscriber: type_name::<S>(),
                outputs: O::type_names(),
            });
        }

        let id = SubscriptionId::generate();
        let routed = wiring.commit(id);
        debug!(
            broadcaster = %self.config.name,
            subscription = %id,
            %identity,
            outputs = ?routed,
            "subscriber attached"
        );
        Ok(id)
    }

    /// クロージャを `T` の購読者として登録する
    pub fn attach_fn<T, I, F>(&self, f: F) -> SubscriptionId
    where
        O: Has<T, I>,
        T: Message,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.attach_sink::<T, I>(Sink::Owned(Arc::new(move |value: T| {
            f(value);
            Ok(())
        })))
    }

    /// 失敗しうるクロージャを `T` の購読者として登録する
    pub fn attach_try_fn<T, I, F>(&self, f: F) -> SubscriptionId
    where
        O: Has<T, I>,
        T: Message,
        F: Fn(T) -> Result<(), DeliveryError> + Send + Sync + 'static,
    {
        self.attach_sink::<T, I>(Sink::Owned(Arc::new(f)))
    }

    /// 配信中の値を参照で受け取るクロージャを登録する
    pub fn attach_mut_fn<T, I, F>(&self, f: F) -> SubscriptionId
    where
        O: Has<T, I>,
        T: Message,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.attach_sink::<T, I>(Sink::InPlace(Arc::new(move |value: &mut T| {
            f(value);
            Ok(())
        })))
    }

    /// Stage（パイプラインを含む）を `T` の購読者として登録する
    ///
    /// Stage は `&mut self` で呼ばれるので `Mutex` で包みます。
    /// 戻り値は `Outcome` として配信結果になります。
    /// `Err` を返した Stage は他の購読者と同じく配信を打ち切ります。
    pub fn attach_stage<T, I, S>(&self, stage: S) -> SubscriptionId
    where
        O: Has<T, I>,
        T: Message,
        S: Stage<T> + Send + 'static,
        S::Output: Outcome,
    {
        let stage = Mutex::new(stage);
        self.attach_try_fn::<T, I, _>(move |value: T| {
            let mut stage = stage.lock().unwrap_or_else(PoisonError::into_inner);
            <S as Stage<T>>::call(&mut *stage, value).into_delivery()
        })
    }

    fn attach_sink<T, I>(&self, sink: Sink<T>) -> SubscriptionId
    where
        O: Has<T, I>,
        T: Message,
    {
        let id = SubscriptionId::generate();
        let meta = EntryMeta { id, identity: None };
        <O as Has<T, I>>::table::<B>(&self.tables)
            .modify(|entries| entries.push(Entry { meta, sink }));
        debug!(
            broadcaster = %self.config.name,
            subscription = %id,
            output = type_name::<T>(),
            "closure attached"
        );
        id
    }

    /// 購読を外す（全出力型から）
    ///
    /// 見つからなければ何もせず `false` を返します。
    pub fn detach(&self, id: SubscriptionId) -> bool {
        let removed = O::remove_where::<B>(&self.tables, &|meta: &EntryMeta| meta.id == id);
        if removed > 0 {
            debug!(broadcaster = %self.config.name, subscription = %id, removed, "detached");
        }
        removed > 0
    }

    /// `Arc` 購読者を外す（同じ `Arc` で登録されたエントリはすべて）
    ///
    /// 取り除いたエントリ数を返します。
    pub fn detach_subscriber<S: ?Sized>(&self, subscriber: &Arc<S>) -> usize {
        let identity = Identity::of(subscriber);
        let removed = O::remove_where::<B>(&self.tables, &|meta: &EntryMeta| {
            meta.identity == Some(identity)
        });
        if removed > 0 {
            debug!(broadcaster = %self.config.name, %identity, removed, "subscriber detached");
        }
        removed
    }

    /// 値を `T` の購読者全員に配信する
    ///
    /// 成功時は値が届いた購読者の数を返します。
    pub fn broadcast<T, I>(&self, value: T) -> Result<usize, BroadcastError>
    where
        O: Has<T, I>,
        T: Message,
    {
        let entries = <O as Has<T, I>>::table::<B>(&self.tables).snapshot();
        trace!(
            broadcaster = %self.config.name,
            output = type_name::<T>(),
            fan_out = entries.len(),
            "broadcast"
        );

        let Some((last, rest)) = entries.split_last() else {
            return Ok(0);
        };
        let mut value = value;
        for entry in rest {
            entry
                .sink
                .deliver_ref(&mut value)
                .map_err(|source| self.failed(entry, source))?;
        }
        last.sink
            .deliver_owned(value)
            .map_err(|source| self.failed(last, source))?;
        Ok(entries.len())
    }

    /// 呼び出し側が持つ値を配信する
    ///
    /// `ReceiveMut` の購読者による変更は `value` に残ります。
    pub fn broadcast_mut<T, I>(&self, value: &mut T) -> Result<usize, BroadcastError>
    where
        O: Has<T, I>,
        T: Message,
    {
        let entries = <O as Has<T, I>>::table::<B>(&self.tables).snapshot();
        trace!(
            broadcaster = %self.config.name,
            output = type_name::<T>(),
            fan_out = entries.len(),
            "broadcast by reference"
        );

        for entry in entries.iter() {
            entry
                .sink
                .deliver_ref(value)
                .map_err(|source| self.failed(entry, source))?;
        }
        Ok(entries.len())
    }

    /// イテレータの値を順に配信する（最初の失敗で止まる）
    ///
    /// 配信した値の数を返します。
    pub fn broadcast_iter<T, I, It>(&self, values: It) -> Result<usize, BroadcastError>
    where
        O: Has<T, I>,
        T: Message,
        It: IntoIterator<Item = T>,
    {
        let mut sent = 0;
        for value in values {
            self.broadcast::<T, I>(value)?;
            sent += 1;
        }
        Ok(sent)
    }

    /// `T` の購読者数
    pub fn len<T, I>(&self) -> usize
    where
        O: Has<T, I>,
        T: Message,
    {
        <O as Has<T, I>>::table::<B>(&self.tables).snapshot().len()
    }

    /// 全出力型のエントリ数の合計
    pub fn total(&self) -> usize {
        O::metas::<B>(&self.tables).len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// 登録中の購読 ID（出力型の宣言順、重複なし）
    pub fn subscriptions(&self) -> Vec<SubscriptionId> {
        let mut ids = Vec::new();
        for meta in O::metas::<B>(&self.tables) {
            if !ids.contains(&meta.id) {
                ids.push(meta.id);
            }
        }
        ids
    }

    fn is_attached(&self, identity: Identity) -> bool {
        O::metas::<B>(&self.tables)
            .iter()
            .any(|meta| meta.identity == Some(identity))
    }

    fn failed<T>(&self, entry: &Entry<T>, source: DeliveryError) -> BroadcastError {
        warn!(
            broadcaster = %self.config.name,
            subscription = %entry.meta.id,
            output = type_name::<T>(),
            error = %source,
            "delivery failed"
        );
        BroadcastError::Delivery {
            subscription: entry.meta.id,
            source,
        }
    }

    /// 連鎖先として値を受け取り、自分の購読者へ配信する
    pub(crate) fn forward<T, I>(&self, value: T) -> Result<(), DeliveryError>
    where
        O: Has<T, I>,
        T: Message,
    {
        self.broadcast::<T, I>(value).map(|_| ()).map_err(|err| {
            DeliveryError::with_source(format!("relay through `{}` failed", self.config.name), err)
        })
    }
}

impl<O: Outputs, B: Backend> Default for Broadcaster<O, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Outputs, B: Backend> fmt::Debug for Broadcaster<O, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("name", &self.config.name)
            .field("outputs", &O::type_names())
            .field("entries", &self.total())
            .finish()
    }
}

/// `Guarded` の Broadcaster は他の Broadcaster の購読者になれる
///
/// 共通する出力型それぞれについて、受け取った値を自分の購読者へ転送します。
impl<O: Outputs> Subscriber for Broadcaster<O, Guarded>
where
    Broadcaster<O, Guarded>: Send + Sync,
{
    fn wire<Src: Outputs, SB: Backend>(self: Arc<Self>, wiring: &mut Wiring<'_, Src, SB>) {
        O::relay(&self, wiring);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::chain::compose;
    use crate::typed::receive::{Receive, ReceiveMut};
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 受け取った値を記録する購読者（i32 と String の両方を受け取る）
    #[derive(Default)]
    struct Recorder {
        ints: Mutex<Vec<i32>>,
        strings: Mutex<Vec<String>>,
    }

    impl Receive<i32> for Recorder {
        fn receive(&self, value: i32) -> Result<(), DeliveryError> {
            self.ints.lock().unwrap().push(value);
            Ok(())
        }
    }

    impl Receive<String> for Recorder {
        fn receive(&self, value: String) -> Result<(), DeliveryError> {
            self.strings.lock().unwrap().push(value);
            Ok(())
        }
    }

    impl Subscriber for Recorder {
        fn wire<O: Outputs, B: Backend>(self: Arc<Self>, wiring: &mut Wiring<'_, O, B>) {
            wiring.receive::<i32, _>(&self);
            wiring.receive::<String, _>(&self);
        }
    }

    /// 受け取った String を消費する購読者
    #[derive(Default)]
    struct Consumer {
        received: Mutex<String>,
    }

    impl Receive<String> for Consumer {
        fn receive(&self, mut value: String) -> Result<(), DeliveryError> {
            *self.received.lock().unwrap() = std::mem::take(&mut value);
            Ok(())
        }
    }

    impl Subscriber for Consumer {
        fn wire<O: Outputs, B: Backend>(self: Arc<Self>, wiring: &mut Wiring<'_, O, B>) {
            wiring.receive::<String, _>(&self);
        }
    }

    /// 値を参照で受け取り、末尾に印を付ける購読者
    struct Marker(char);

    impl ReceiveMut<String> for Marker {
        fn receive_mut(&self, value: &mut String) -> Result<(), DeliveryError> {
            value.push(self.0);
            Ok(())
        }
    }

    impl Subscriber for Marker {
        fn wire<O: Outputs, B: Backend>(self: Arc<Self>, wiring: &mut Wiring<'_, O, B>) {
            wiring.receive_mut::<String, _>(&self);
        }
    }

    /// f64 しか受け取れない購読者
    struct FloatsOnly;

    impl Receive<f64> for FloatsOnly {
        fn receive(&self, _: f64) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    impl Subscriber for FloatsOnly {
        fn wire<O: Outputs, B: Backend>(self: Arc<Self>, wiring: &mut Wiring<'_, O, B>) {
            wiring.receive::<f64, _>(&self);
        }
    }

    fn collector<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: T| sink.lock().unwrap().push(value))
    }

    #[test]
    fn attach_then_broadcast_delivers_once() {
        let broadcaster: Broadcaster<(i32,)> = Broadcaster::new();
        let recorder = Arc::new(Recorder::default());
        broadcaster.attach(Arc::clone(&recorder)).unwrap();

        assert_eq!(broadcaster.broadcast(7).unwrap(), 1);
        assert_eq!(*recorder.ints.lock().unwrap(), vec![7]);
    }

    #[test]
    fn detach_then_broadcast_skips_subscriber() {
        let broadcaster: Broadcaster<(i32,)> = Broadcaster::new();
        let recorder = Arc::new(Recorder::default());
        let (seen, sink) = collector::<i32>();

        broadcaster.attach(Arc::clone(&recorder)).unwrap();
        let closure_id = broadcaster.attach_fn(sink);

        assert_eq!(broadcaster.detach_subscriber(&recorder), 1);
        assert!(broadcaster.detach(closure_id));
        assert_eq!(broadcaster.broadcast(1).unwrap(), 0);

        assert!(recorder.ints.lock().unwrap().is_empty());
        assert!(seen.lock().unwrap().is_empty());
        assert!(broadcaster.is_empty());
    }

    #[test]
    fn detach_of_unknown_subscription_is_a_no_op() {
        let broadcaster: Broadcaster<(i32,)> = Broadcaster::new();
        assert!(!broadcaster.detach(SubscriptionId::generate()));
        assert_eq!(broadcaster.detach_subscriber(&Arc::new(Recorder::default())), 0);
    }

    #[test]
    fn values_are_routed_by_type() {
        let broadcaster: Broadcaster<(i32, String)> = Broadcaster::new();
        let recorder = Arc::new(Recorder::default());
        let id = broadcaster.attach(Arc::clone(&recorder)).unwrap();

        assert_eq!(broadcaster.len::<i32, _>(), 1);
        assert_eq!(broadcaster.len::<String, _>(), 1);
        assert_eq!(broadcaster.subscriptions(), vec![id]);

        broadcaster.broadcast(5).unwrap();
        assert_eq!(*recorder.ints.lock().unwrap(), vec![5]);
        assert!(recorder.strings.lock().unwrap().is_empty());

        broadcaster.broadcast("five".to_string()).unwrap();
        assert_eq!(*recorder.ints.lock().unwrap(), vec![5]);
        assert_eq!(*recorder.strings.lock().unwrap(), vec!["five".to_string()]);
    }

    #[test]
    fn subscriber_is_attached_only_for_declared_types() {
        let broadcaster: Broadcaster<(String,)> = Broadcaster::new();
        let recorder = Arc::new(Recorder::default());
        broadcaster.attach(Arc::clone(&recorder)).unwrap();

        assert_eq!(broadcaster.total(), 1);
        broadcaster.broadcast("only".to_string()).unwrap();
        assert_eq!(*recorder.strings.lock().unwrap(), vec!["only".to_string()]);
    }

    #[test]
    fn subscriber_without_matching_output_is_rejected() {
        let broadcaster: Broadcaster<(i32, String)> = Broadcaster::new();

        let err = broadcaster.attach(Arc::new(FloatsOnly)).unwrap_err();
        match err {
            AttachError::NoMatchingOutput { subscriber, outputs } => {
                assert!(subscriber.ends_with("FloatsOnly"));
                assert_eq!(outputs.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(broadcaster.is_empty());
    }

    #[test]
    fn every_owned_receiver_gets_the_original_value() {
        let broadcaster: Broadcaster<(String,)> = Broadcaster::new();
        let first = Arc::new(Consumer::default());
        let second = Arc::new(Consumer::default());
        broadcaster.attach(Arc::clone(&first)).unwrap();
        broadcaster.attach(Arc::clone(&second)).unwrap();

        assert_eq!(broadcaster.broadcast("dummy".to_string()).unwrap(), 2);

        assert_eq!(*first.received.lock().unwrap(), "dummy");
        assert_eq!(*second.received.lock().unwrap(), "dummy");
    }

    #[test]
    fn owned_receivers_do_not_observe_each_others_changes() {
        let broadcaster: Broadcaster<(String,)> = Broadcaster::new();
        let (seen, sink) = collector::<String>();
        broadcaster.attach_fn(|mut value: String| {
            value.clear();
            drop(value);
        });
        broadcaster.attach_fn(sink);

        broadcaster.broadcast("intact".to_string()).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["intact".to_string()]);
    }

    #[test]
    fn in_place_receivers_see_earlier_mutations() {
        let broadcaster: Broadcaster<(String,)> = Broadcaster::new();
        let (seen, sink) = collector::<String>();
        broadcaster.attach(Arc::new(Marker('a'))).unwrap();
        broadcaster.attach(Arc::new(Marker('b'))).unwrap();
        broadcaster.attach_fn(sink);

        let mut value = "x".to_string();
        broadcaster.broadcast_mut(&mut value).unwrap();
        assert_eq!(value, "xab");
        assert_eq!(*seen.lock().unwrap(), vec!["xab".to_string()]);

        broadcaster.broadcast("y".to_string()).unwrap();
        assert_eq!(seen.lock().unwrap().last().map(String::as_str), Some("yab"));
    }

    #[test]
    fn delivery_is_in_registration_order() {
        let broadcaster: Broadcaster<(i32,)> = Broadcaster::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            broadcaster.attach_fn(move |_: i32| order.lock().unwrap().push(tag));
        }

        broadcaster.broadcast(0).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn failing_receiver_stops_delivery() {
        let broadcaster: Broadcaster<(i32,)> = Broadcaster::new();
        let (before, before_sink) = collector::<i32>();
        let (after, after_sink) = collector::<i32>();

        broadcaster.attach_fn(before_sink);
        let failing = broadcaster.attach_try_fn(|value: i32| {
            if value < 0 {
                Err(DeliveryError::new("negative"))
            } else {
                Ok(())
            }
        });
        broadcaster.attach_fn(after_sink);

        let err = broadcaster.broadcast(-1).unwrap_err();
        assert_eq!(err.subscription(), failing);
        assert_eq!(*before.lock().unwrap(), vec![-1]);
        assert!(after.lock().unwrap().is_empty());

        assert_eq!(broadcaster.broadcast(2).unwrap(), 3);
        assert_eq!(*after.lock().unwrap(), vec![2]);
    }

    #[rstest]
    #[case(DuplicatePolicy::Allow)]
    #[case(DuplicatePolicy::Reject)]
    fn duplicate_attach_follows_policy(#[case] policy: DuplicatePolicy) {
        let broadcaster: Broadcaster<(i32,)> = Broadcaster::builder()
            .name("dup")
            .duplicates(policy)
            .build()
            .unwrap();
        let recorder = Arc::new(Recorder::default());

        broadcaster.attach(Arc::clone(&recorder)).unwrap();
        let second = broadcaster.attach(Arc::clone(&recorder));

        match policy {
            DuplicatePolicy::Allow => {
                assert!(second.is_ok());
                broadcaster.broadcast(3).unwrap();
                assert_eq!(*recorder.ints.lock().unwrap(), vec![3, 3]);
                assert_eq!(broadcaster.detach_subscriber(&recorder), 2);
            }
            DuplicatePolicy::Reject => {
                assert!(matches!(second, Err(AttachError::AlreadyAttached { .. })));
                assert_eq!(broadcaster.len::<i32, _>(), 1);
            }
        }
    }

    #[test]
    fn broadcasters_can_be_chained() {
        let upstream: Broadcaster<(i32, String)> = Broadcaster::new();
        let downstream: Arc<Broadcaster<(i32,), Guarded>> = Arc::new(Broadcaster::new());
        let (seen, sink) = collector::<i32>();
        downstream.attach_fn(sink);

        upstream.attach(Arc::clone(&downstream)).unwrap();
        assert_eq!(upstream.len::<i32, _>(), 1);
        assert_eq!(upstream.len::<String, _>(), 0);

        upstream.broadcast(1).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1]);

        assert_eq!(upstream.detach_subscriber(&downstream), 1);
        upstream.broadcast(2).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn relay_failure_is_reported_upstream() {
        let upstream: Broadcaster<(i32,), Guarded> = Broadcaster::new();
        let downstream: Arc<Broadcaster<(i32,), Guarded>> = Arc::new(Broadcaster::new());
        downstream.attach_try_fn(|_: i32| Err(DeliveryError::new("full")));
        let relay = upstream.attach(Arc::clone(&downstream)).unwrap();

        let err = upstream.broadcast(9).unwrap_err();
        assert_eq!(err.subscription(), relay);
        assert!(err.to_string().contains("relay through"));
    }

    #[test]
    fn pipeline_can_subscribe() {
        let broadcaster: Broadcaster<(i32,)> = Broadcaster::new();
        let (seen, sink) = collector::<String>();
        broadcaster.attach_stage::<i32, _, _>(compose(|x: i32| x * 2, move |x: i32| sink(x.to_string())));

        broadcaster.broadcast_iter([1, 2, 3]).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["2", "4", "6"]);
    }

    #[test]
    fn failing_pipeline_subscriber_stops_delivery() {
        let broadcaster: Broadcaster<(i32,)> = Broadcaster::new();
        let later_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&later_calls);

        let failing = broadcaster.attach_stage::<i32, _, _>(compose(
            |x: i32| x,
            |_: i32| -> Result<(), DeliveryError> { Err(DeliveryError::new("stage failed")) },
        ));
        broadcaster.attach_fn(move |_: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let err = broadcaster.broadcast(1).unwrap_err();
        assert!(matches!(err, BroadcastError::Delivery { .. }));
        assert_eq!(err.subscription(), failing);
        assert!(err.to_string().contains("stage failed"));
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn skipped_pipeline_counts_as_delivered() {
        let broadcaster: Broadcaster<(i32,)> = Broadcaster::new();
        let (seen, sink) = collector::<i32>();
        broadcaster.attach_stage::<i32, _, _>(crate::compose!(
            |x: i32| (x > 0).then_some(x),
            crate::pipeline::maybe(),
            move |x: i32| -> Result<(), DeliveryError> {
                if x > 100 {
                    return Err(DeliveryError::new("too large"));
                }
                sink(x);
                Ok(())
            }
        ));

        assert_eq!(broadcaster.broadcast(-5).unwrap(), 1);
        assert_eq!(broadcaster.broadcast(7).unwrap(), 1);
        assert!(broadcaster.broadcast(500).is_err());
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn reject_holds_under_concurrent_attach() {
        const ROUNDS: usize = 200;

        for _ in 0..ROUNDS {
            let broadcaster: Broadcaster<(i32,), Guarded> = Broadcaster::builder()
                .duplicates(DuplicatePolicy::Reject)
                .build()
                .unwrap();
            let recorder = Arc::new(Recorder::default());
            let barrier = std::sync::Barrier::new(2);

            let accepted = std::thread::scope(|scope| {
                let attach = || {
                    barrier.wait();
                    broadcaster.attach(Arc::clone(&recorder)).is_ok()
                };
                let first = scope.spawn(attach);
                let second = scope.spawn(attach);
                [first, second]
                    .into_iter()
                    .map(|handle| handle.join().unwrap())
                    .filter(|ok| *ok)
                    .count()
            });

            assert_eq!(accepted, 1);
            assert_eq!(broadcaster.len::<i32, _>(), 1);
        }
    }

    #[test]
    fn broadcast_iter_stops_at_first_failure() {
        let broadcaster: Broadcaster<(i32,)> = Broadcaster::new();
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        broadcaster.attach_try_fn(move |value: i32| {
            if value == 3 {
                return Err(DeliveryError::new("three"));
            }
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(broadcaster.broadcast_iter(1..=5).is_err());
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn subscriber_attached_during_broadcast_waits_for_next_value() {
        let broadcaster: Arc<Broadcaster<(i32,), Guarded>> = Arc::new(Broadcaster::new());
        let (late, late_sink) = collector::<i32>();
        let late_sink = Arc::new(late_sink);

        let weak = Arc::downgrade(&broadcaster);
        broadcaster.attach_fn(move |value: i32| {
            if value == 1 {
                if let Some(broadcaster) = weak.upgrade() {
                    let sink = Arc::clone(&late_sink);
                    broadcaster.attach_fn(move |v: i32| sink(v));
                }
            }
        });

        assert_eq!(broadcaster.broadcast(1).unwrap(), 1);
        assert!(late.lock().unwrap().is_empty());
        assert_eq!(broadcaster.broadcast(2).unwrap(), 2);
        assert_eq!(*late.lock().unwrap(), vec![2]);
    }

    #[test]
    fn concurrent_attach_detach_never_splits_a_snapshot() {
        const VALUES: usize = 500;
        const CHURNERS: usize = 4;

        let broadcaster: Broadcaster<(usize,), Guarded> = Broadcaster::new();
        let deliveries: Arc<Vec<AtomicUsize>> =
            Arc::new((0..VALUES).map(|_| AtomicUsize::new(0)).collect());
        let (permanent, permanent_sink) = collector::<usize>();
        broadcaster.attach_fn(permanent_sink);

        let counting = |deliveries: &Arc<Vec<AtomicUsize>>| {
            let deliveries = Arc::clone(deliveries);
            move |value: usize| {
                deliveries[value].fetch_add(1, Ordering::SeqCst);
            }
        };
        broadcaster.attach_fn(counting(&deliveries));
        let done = std::sync::atomic::AtomicBool::new(false);

        std::thread::scope(|scope| {
            for _ in 0..CHURNERS {
                scope.spawn(|| {
                    while !done.load(Ordering::SeqCst) {
                        let id = broadcaster.attach_fn(counting(&deliveries));
                        std::thread::yield_now();
                        assert!(broadcaster.detach(id));
                    }
                });
            }

            for value in 0..VALUES {
                // 恒久購読者 2 つ（記録用と数え上げ用）は常に含まれる
                let fan_out = broadcaster.broadcast(value).unwrap();
                assert!(fan_out >= 2);
                assert_eq!(deliveries[value].load(Ordering::SeqCst), fan_out - 1);
            }
            done.store(true, Ordering::SeqCst);
        });

        assert_eq!(*permanent.lock().unwrap(), (0..VALUES).collect::<Vec<_>>());
        assert_eq!(broadcaster.total(), 2);
    }

    #[test]
    fn debug_shows_name_and_outputs() {
        let broadcaster: Broadcaster<(i32, String)> =
            Broadcaster::builder().name("ticks").build().unwrap();
        let shown = format!("{broadcaster:?}");
        assert!(shown.contains("ticks"));
        assert!(shown.contains("i32"));
    }
}
