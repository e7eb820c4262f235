use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde::Serialize;
use tokio::time::{Duration, sleep};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use conduit_core::broadcast::Outputs;
use conduit_core::pipeline::{compose, maybe};
use conduit_core::ports::Backend;
use conduit_core::typed::{Receive, Subscriber};
use conduit_core::{Broadcaster, BroadcasterConfig, DeliveryError, Guarded, Wiring};

const PRODUCERS: u64 = 3;
const VALUES_PER_PRODUCER: u64 = 200;

/// 数値の合計とメモを集計する購読者
#[derive(Default)]
struct Tally {
    count: AtomicU64,
    sum: AtomicU64,
    notes: Mutex<Vec<String>>,
}

impl Receive<u64> for Tally {
    fn receive(&self, value: u64) -> Result<(), DeliveryError> {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(value, Ordering::Relaxed);
        Ok(())
    }
}

impl Receive<String> for Tally {
    fn receive(&self, note: String) -> Result<(), DeliveryError> {
        self.notes
            .lock()
            .map_err(|_| DeliveryError::new("notes lock poisoned"))?
            .push(note);
        Ok(())
    }
}

impl Subscriber for Tally {
    fn wire<O: Outputs, B: Backend>(self: Arc<Self>, wiring: &mut Wiring<'_, O, B>) {
        wiring.receive::<u64, _>(&self);
        wiring.receive::<String, _>(&self);
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    broadcaster: String,
    delivered: u64,
    sum: u64,
    notes: Vec<String>,
    churned: usize,
}

fn load_config() -> anyhow::Result<BroadcasterConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(BroadcasterConfig::default_v1());
    };
    let json = std::fs::read_to_string(&path).with_context(|| format!("read config {path}"))?;
    BroadcasterConfig::from_json_str(&json).with_context(|| format!("load config {path}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // (A) パイプライン: 文字列 → 数値（失敗は skip）→ 2 倍
    let mut normalize = conduit_core::compose!(
        |raw: String| raw.trim().parse::<u64>().ok(),
        maybe(),
        |n: u64| n * 2
    );
    info!(stages = normalize.len(), roles = ?normalize.roles(), "pipeline composed");
    for raw in ["21", "not a number", " 8 "] {
        let out = normalize.run(raw.to_string());
        info!(input = raw, output = ?out, "pipeline run");
    }

    // (B) Broadcaster（複数スレッド用）と購読者を用意
    let config = load_config()?;
    let ticks: Arc<Broadcaster<(u64, String), Guarded>> = Arc::new(
        Broadcaster::builder()
            .config(config)
            .build()
            .context("build broadcaster")?,
    );
    let tally = Arc::new(Tally::default());
    ticks.attach(Arc::clone(&tally)).context("attach tally")?;

    let digits = Arc::new(AtomicU64::new(0));
    let digit_sink = Arc::clone(&digits);
    ticks.attach_stage::<u64, _, _>(compose(|n: u64| n % 10, move |d: u64| {
        digit_sink.fetch_add(d, Ordering::Relaxed);
    }));

    // (C) producer を起動（配信は呼び出し側のスレッドで同期的に行われる）
    let mut producers = Vec::new();
    for p in 0..PRODUCERS {
        let ticks = Arc::clone(&ticks);
        producers.push(tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let start = p * VALUES_PER_PRODUCER;
            let sent = ticks.broadcast_iter(start..start + VALUES_PER_PRODUCER)?;
            ticks.broadcast(format!("producer {p} done"))?;
            Ok(sent)
        }));
    }

    // (D) 配信と並行して購読者の attach / detach を繰り返す
    let churn = {
        let ticks = Arc::clone(&ticks);
        tokio::spawn(async move {
            let mut churned = 0;
            for _ in 0..20 {
                let id = ticks.attach_fn(|_: u64| {});
                sleep(Duration::from_millis(1)).await;
                if ticks.detach(id) {
                    churned += 1;
                }
            }
            churned
        })
    };

    let mut sent = 0;
    for producer in producers {
        sent += producer.await??;
    }
    let churned = churn.await?;
    info!(sent, churned, digits = digits.load(Ordering::Relaxed), "producers finished");

    // (E) 集計を JSON で出力
    let summary = Summary {
        broadcaster: ticks.name().to_string(),
        delivered: tally.count.load(Ordering::Relaxed),
        sum: tally.sum.load(Ordering::Relaxed),
        notes: tally
            .notes
            .lock()
            .map(|notes| notes.clone())
            .unwrap_or_default(),
        churned,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    ticks.detach_subscriber(&tally);
    info!(remaining = ticks.total(), "tally detached");
    Ok(())
}
