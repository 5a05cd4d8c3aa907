//! Exponential backoff for the fetch pool.
//!
//! A single [`Backoff`] is shared by every fetch worker. Rather than guarding
//! it with a lock, one coordinator task owns it and workers talk to that task
//! through a [`BackoffHandle`].

use rand::Rng;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[derive(Clone, Debug, PartialEq)]
pub struct BackoffConfig {
    pub min: Duration,
    pub max: Duration,
    pub factor: f64,
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackoffPhase {
    Idle,
    BackingOff(Duration),
}

/// `idle -> backing-off(delay) -> idle` state machine.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
    phase: BackoffPhase,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempt: 0,
            phase: BackoffPhase::Idle,
        }
    }

    /// Records a failure and returns how long to sleep before retrying.
    ///
    /// The un-jittered delay doubles (by `factor`) per consecutive failure,
    /// starting at `min` and capped at `max`. With jitter on, the returned
    /// sleep is drawn from `[min, delay]`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.phase = BackoffPhase::BackingOff(delay);

        if !self.config.jitter || delay <= self.config.min {
            return delay;
        }

        let min = self.config.min.as_secs_f64();
        let spread = delay.as_secs_f64() - min;
        Duration::from_secs_f64(min + rand::thread_rng().gen::<f64>() * spread)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
        self.phase = BackoffPhase::Idle;
    }

    /// The un-jittered delay of the last failure, or `min` when idle.
    pub fn current(&self) -> Duration {
        match self.phase {
            BackoffPhase::Idle => self.config.min,
            BackoffPhase::BackingOff(delay) => delay,
        }
    }

    pub fn phase(&self) -> BackoffPhase {
        self.phase
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let min = self.config.min.as_secs_f64();
        let max = self.config.max.as_secs_f64();
        let scaled = min * self.config.factor.powi(attempt.min(i32::MAX as u32) as i32);

        if !scaled.is_finite() || scaled >= max {
            return self.config.max;
        }
        Duration::from_secs_f64(scaled.max(min))
    }
}

enum Request {
    Failure(oneshot::Sender<Duration>),
    Success,
    Current(oneshot::Sender<Duration>),
}

/// Cloneable access to the coordinator task that owns the shared [`Backoff`].
///
/// The coordinator exits once every handle is dropped.
#[derive(Clone, Debug)]
pub struct BackoffHandle {
    tx: mpsc::Sender<Request>,
    max: Duration,
}

impl BackoffHandle {
    pub fn spawn(config: BackoffConfig) -> Self {
        let (tx, mut rx) = mpsc::channel::<Request>(64);
        let max = config.max;
        let mut backoff = Backoff::new(config);

        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                match request {
                    Request::Failure(reply) => {
                        let _ = reply.send(backoff.next_delay());
                    }
                    Request::Success => backoff.reset(),
                    Request::Current(reply) => {
                        let _ = reply.send(backoff.current());
                    }
                }
            }
        });

        Self { tx, max }
    }

    /// Reports a failed fetch and returns the sleep before the next attempt.
    pub async fn on_failure(&self) -> Duration {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Request::Failure(reply)).await.is_err() {
            return self.max;
        }
        rx.await.unwrap_or(self.max)
    }

    pub async fn on_success(&self) {
        let _ = self.tx.send(Request::Success).await;
    }

    pub async fn current(&self) -> Duration {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Request::Current(reply)).await.is_err() {
            return self.max;
        }
        rx.await.unwrap_or(self.max)
    }
}
