//! Pipeline configuration. Each pipeline takes its options by value at
//! construction; nothing is read from process-wide state.

use crate::backoff::BackoffConfig;
use crate::error::{Error, Result};
use crate::sqs::MAX_BATCH_SIZE;
use crate::template::FormatTemplate;
use std::time::Duration;

/// SQS long polls cannot wait longer than this.
pub const MAX_WAIT_TIME_SECONDS: i32 = 20;
/// SQS visibility timeouts cannot exceed 12 hours.
pub const MAX_VISIBILITY_TIMEOUT_SECONDS: i32 = 43_200;

#[derive(Clone, Debug)]
pub struct ProducerOptions {
    /// Number of batch sender workers.
    pub sender_workers: usize,
    /// Records per `SendMessageBatch`; values above 10 are clamped.
    pub batch_size: usize,
    /// Read buffer for the input file. Lines longer than this still work.
    pub read_buffer_size: usize,
    pub template: FormatTemplate,
    pub report_interval: Duration,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            sender_workers: 64,
            batch_size: MAX_BATCH_SIZE,
            read_buffer_size: 256 * 1024,
            template: FormatTemplate::default(),
            report_interval: Duration::from_secs(5),
        }
    }
}

impl ProducerOptions {
    pub fn validate(&self) -> Result<()> {
        if self.sender_workers == 0 {
            return Err(Error::Config("sender_workers must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(Error::Config("read_buffer_size must be at least 1".into()));
        }
        if self.report_interval.is_zero() {
            return Err(Error::Config("report_interval must be positive".into()));
        }
        Ok(())
    }

    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.min(MAX_BATCH_SIZE)
    }
}

#[derive(Clone, Debug)]
pub struct ConsumerOptions {
    /// Number of handling workers.
    pub max_workers: usize,
    /// Capacity of the dispatch channel between fetchers and workers.
    pub prefetch: usize,
    pub fetch_threads: usize,
    /// `MaxNumberOfMessages` per receive, 1 to 10.
    pub max_messages: i32,
    /// Long-poll wait per receive, 0 to 20 seconds.
    pub wait_time_seconds: i32,
    pub visibility_timeout_seconds: i32,
    /// Messages older than this get their visibility extended before handling.
    pub extend_after: Duration,
    pub backoff: BackoffConfig,
    /// Make messages still in the dispatch channel at shutdown visible again
    /// right away instead of waiting out their visibility timeout.
    pub release_on_shutdown: bool,
    /// Pause after flushing the handler on shutdown.
    pub shutdown_grace: Duration,
    pub report_interval: Duration,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            max_workers: 50,
            prefetch: 100,
            fetch_threads: 2,
            max_messages: 10,
            wait_time_seconds: 20,
            visibility_timeout_seconds: 20,
            extend_after: Duration::from_secs(10),
            backoff: BackoffConfig::default(),
            release_on_shutdown: false,
            shutdown_grace: Duration::from_secs(1),
            report_interval: Duration::from_secs(10),
        }
    }
}

impl ConsumerOptions {
    /// The settings `sqsutils save` runs with: wide fan-out, short polls and
    /// a long lease so slow disks never lose a message to redelivery.
    pub fn for_save() -> Self {
        Self {
            max_workers: 100,
            prefetch: 1000,
            fetch_threads: 30,
            wait_time_seconds: 1,
            visibility_timeout_seconds: 600,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::Config("max_workers must be at least 1".into()));
        }
        if self.prefetch == 0 {
            return Err(Error::Config("prefetch must be at least 1".into()));
        }
        if self.fetch_threads == 0 {
            return Err(Error::Config("fetch_threads must be at least 1".into()));
        }
        if !(1..=MAX_BATCH_SIZE as i32).contains(&self.max_messages) {
            return Err(Error::Config(format!(
                "max_messages must be between 1 and {MAX_BATCH_SIZE}"
            )));
        }
        if !(0..=MAX_WAIT_TIME_SECONDS).contains(&self.wait_time_seconds) {
            return Err(Error::Config(format!(
                "wait_time_seconds must be between 0 and {MAX_WAIT_TIME_SECONDS}"
            )));
        }
        if !(1..=MAX_VISIBILITY_TIMEOUT_SECONDS).contains(&self.visibility_timeout_seconds) {
            return Err(Error::Config(format!(
                "visibility_timeout_seconds must be between 1 and {MAX_VISIBILITY_TIMEOUT_SECONDS}"
            )));
        }
        if self.backoff.min.is_zero() || self.backoff.min > self.backoff.max {
            return Err(Error::Config("backoff min must be positive and not above max".into()));
        }
        if self.backoff.factor < 1.0 {
            return Err(Error::Config("backoff factor must be at least 1".into()));
        }
        if self.report_interval.is_zero() {
            return Err(Error::Config("report_interval must be positive".into()));
        }
        Ok(())
    }
}
