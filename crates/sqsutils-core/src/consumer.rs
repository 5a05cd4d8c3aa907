//! The save pipeline: queue → fetch pool → dispatch channel → handling
//! workers → handler.

use crate::backoff::BackoffHandle;
use crate::dispatch::{dispatch_channel, drain};
use crate::error::Result;
use crate::fetch::{spawn_fetchers, ReceiveSettings};
use crate::handler::Handler;
use crate::options::ConsumerOptions;
use crate::rate::{spawn_reporter, RateCounter};
use crate::sqs::QueueService;
use crate::worker::{spawn_workers, HandlingStats, MessageProcessor};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of a single consumer run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Messages the handler accepted.
    pub accepted: u64,
    /// Messages the handler declined.
    pub skipped: u64,
    /// Messages dropped for outliving their visibility timeout.
    pub expired: u64,
    /// Messages whose visibility was extended before handling.
    pub extended: u64,
    /// Messages still waiting in the dispatch channel at shutdown.
    pub drained: u64,
}

impl SaveSummary {
    fn counted(stats: &HandlingStats) -> Self {
        Self {
            accepted: stats.accepted(),
            skipped: stats.skipped(),
            expired: stats.expired(),
            extended: stats.extended(),
            drained: 0,
        }
    }

    fn since(self, earlier: Self) -> Self {
        Self {
            accepted: self.accepted - earlier.accepted,
            skipped: self.skipped - earlier.skipped,
            expired: self.expired - earlier.expired,
            extended: self.extended - earlier.extended,
            drained: self.drained,
        }
    }
}

pub struct Consumer {
    queue: Arc<dyn QueueService>,
    handler: Arc<dyn Handler>,
    options: ConsumerOptions,
    stats: Arc<HandlingStats>,
}

impl Consumer {
    pub fn new(
        queue: Arc<dyn QueueService>,
        handler: Arc<dyn Handler>,
        options: ConsumerOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            queue,
            handler,
            options,
            stats: Arc::new(HandlingStats::default()),
        })
    }

    /// Live counters, cumulative across every run of this consumer.
    /// [`SaveSummary`] reports a single run.
    pub fn stats(&self) -> Arc<HandlingStats> {
        self.stats.clone()
    }

    /// Runs the pipeline until `shutdown` resolves.
    ///
    /// Shutdown cancels fetchers and workers, waits for in-progress handler
    /// calls to finish, drains what is left in the dispatch channel without
    /// handling it, flushes the handler and pauses for the grace period.
    /// Drained messages are left to their visibility timeout unless
    /// `release_on_shutdown` is set.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<SaveSummary>
    where
        F: Future<Output = ()>,
    {
        let options = &self.options;
        let before = SaveSummary::counted(&self.stats);
        let token = CancellationToken::new();
        let rate = Arc::new(RateCounter::default());

        let reporter = spawn_reporter(
            "save",
            rate.clone(),
            options.report_interval,
            token.child_token(),
        );

        let (tx, rx) = dispatch_channel(options.prefetch);
        let backoff = BackoffHandle::spawn(options.backoff.clone());

        let fetchers = spawn_fetchers(
            options.fetch_threads,
            ReceiveSettings {
                max_messages: options.max_messages,
                wait_time_seconds: options.wait_time_seconds,
                visibility_timeout_seconds: options.visibility_timeout_seconds,
            },
            self.queue.clone(),
            tx,
            backoff,
            token.clone(),
        );

        let processor = Arc::new(MessageProcessor {
            queue: self.queue.clone(),
            handler: self.handler.clone(),
            visibility_timeout_seconds: options.visibility_timeout_seconds,
            extend_after: options.extend_after,
            rate: rate.clone(),
            stats: self.stats.clone(),
        });
        let workers = spawn_workers(options.max_workers, processor, rx.clone(), token.clone());

        log::info!(
            "consuming with {} fetchers and {} workers",
            options.fetch_threads,
            options.max_workers
        );

        shutdown.await;
        log::info!("shutting down ....");
        token.cancel();

        for fetcher in fetchers {
            fetcher.await?;
        }
        for worker in workers {
            worker.await?;
        }

        let drained = drain(&rx).await;
        if !drained.is_empty() {
            log::info!("discarding {} undelivered messages", drained.len());
        }
        if options.release_on_shutdown {
            for message in &drained {
                if let Err(e) = self.queue.change_visibility(&message.receipt_handle, 0).await {
                    log::warn!("failed to release message: {}", e);
                }
            }
        }

        self.handler.flush().await?;
        tokio::time::sleep(options.shutdown_grace).await;
        let _ = reporter.await;

        let summary = SaveSummary {
            drained: drained.len() as u64,
            ..SaveSummary::counted(&self.stats)
        }
        .since(before);
        log::info!(
            "saved {} messages ({} skipped, {} expired, {} extended, {} discarded)",
            summary.accepted,
            summary.skipped,
            summary.expired,
            summary.extended,
            summary.drained
        );
        Ok(summary)
    }
}
