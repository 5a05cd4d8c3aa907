//! Handling workers: take messages off the dispatch channel, apply the
//! visibility policy, run the handler and acknowledge.

use crate::dispatch::{DispatchReceiver, InFlightMessage};
use crate::handler::Handler;
use crate::rate::RateCounter;
use crate::sqs::QueueService;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Older than the visibility timeout; the queue has already handed it
    /// out again, so it was dropped untouched.
    Expired,
    /// Handler accepted it and a delete was attempted.
    Accepted,
    /// Handler declined it; left for redelivery.
    Skipped,
}

/// Running totals across all workers.
#[derive(Debug, Default)]
pub struct HandlingStats {
    pub accepted: AtomicU64,
    pub skipped: AtomicU64,
    pub expired: AtomicU64,
    pub extended: AtomicU64,
    pub delete_failures: AtomicU64,
}

impl HandlingStats {
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn expired(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }

    /// Messages whose visibility was extended before handling.
    pub fn extended(&self) -> u64 {
        self.extended.load(Ordering::Relaxed)
    }

    pub fn delete_failures(&self) -> u64 {
        self.delete_failures.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.accepted() + self.skipped() + self.expired()
    }
}

pub struct MessageProcessor {
    pub queue: Arc<dyn QueueService>,
    pub handler: Arc<dyn Handler>,
    pub visibility_timeout_seconds: i32,
    pub extend_after: Duration,
    pub rate: Arc<RateCounter>,
    pub stats: Arc<HandlingStats>,
}

impl MessageProcessor {
    pub async fn process(&self, message: InFlightMessage) -> Outcome {
        let age = message.age();
        let visibility_timeout =
            Duration::from_secs(self.visibility_timeout_seconds.max(0) as u64);

        if age >= visibility_timeout {
            log::debug!(
                "dropping message {:?} aged {:?}, past its visibility timeout",
                message.receipt_handle,
                age
            );
            self.stats.expired.fetch_add(1, Ordering::Relaxed);
            return Outcome::Expired;
        }

        if age > self.extend_after {
            self.stats.extended.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = self
                .queue
                .change_visibility(&message.receipt_handle, self.visibility_timeout_seconds)
                .await
            {
                log::warn!("failed to extend visibility: {}", e);
            }
        }

        if !self.handler.handle(&message.body).await {
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            return Outcome::Skipped;
        }

        if let Err(e) = self.queue.delete_message(&message.receipt_handle).await {
            self.stats.delete_failures.fetch_add(1, Ordering::Relaxed);
            log::warn!("failed to delete message, it will be redelivered: {}", e);
        }
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
        self.rate.incr(1);
        Outcome::Accepted
    }
}

pub fn spawn_workers(
    workers: usize,
    processor: Arc<MessageProcessor>,
    rx: DispatchReceiver,
    token: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..workers)
        .map(|id| {
            tokio::spawn(work_loop(
                id,
                processor.clone(),
                rx.clone(),
                token.clone(),
            ))
        })
        .collect()
}

async fn work_loop(
    id: usize,
    processor: Arc<MessageProcessor>,
    rx: DispatchReceiver,
    token: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = async { rx.lock().await.recv().await } => next,
        };

        let Some(message) = next else {
            break;
        };
        // not raced against cancellation: a started handler always finishes
        processor.process(message).await;
    }

    log::debug!("worker {} stopped", id);
}
