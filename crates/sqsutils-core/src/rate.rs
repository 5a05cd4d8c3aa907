//! Sliding-window throughput counter and the periodic reporter that reads it.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Window used by both pipelines.
pub const RATE_WINDOW: Duration = Duration::from_secs(5);

/// Counts successes over the last `window`, plus a lifetime total.
#[derive(Debug)]
pub struct RateCounter {
    window: Duration,
    events: Mutex<VecDeque<(Instant, u64)>>,
    total: AtomicU64,
}

impl Default for RateCounter {
    fn default() -> Self {
        Self::new(RATE_WINDOW)
    }
}

impl RateCounter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            events: Mutex::new(VecDeque::new()),
            total: AtomicU64::new(0),
        }
    }

    pub fn incr(&self, n: u64) {
        if n == 0 {
            return;
        }
        let now = Instant::now();
        let mut events = self.events.lock();
        Self::prune(&mut events, now, self.window);
        events.push_back((now, n));
        self.total.fetch_add(n, Ordering::Relaxed);
    }

    /// Successes recorded within the window.
    pub fn count(&self) -> u64 {
        let mut events = self.events.lock();
        Self::prune(&mut events, Instant::now(), self.window);
        events.iter().map(|(_, n)| n).sum()
    }

    /// Successes per second over the window.
    pub fn rate(&self) -> f64 {
        self.count() as f64 / self.window.as_secs_f64()
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn prune(events: &mut VecDeque<(Instant, u64)>, now: Instant, window: Duration) {
        while let Some((at, _)) = events.front() {
            if now.duration_since(*at) < window {
                break;
            }
            events.pop_front();
        }
    }
}

/// Logs `counter`'s per-second rate every `every` until `token` is cancelled.
pub fn spawn_reporter(
    label: &'static str,
    counter: Arc<RateCounter>,
    every: Duration,
    token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = ticker.tick() => {
                    log::info!("{} rate={:.1}/s total={}", label, counter.rate(), counter.total());
                }
            }
        }
    })
}
