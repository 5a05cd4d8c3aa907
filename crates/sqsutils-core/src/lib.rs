//! # sqsutils-core
//!
//! Bulk transfer of line-oriented records between local files and AWS SQS.
//!
//! The crate provides the two pipelines behind the `sqsutils` CLI:
//!
//! - **Load** ([`Producer`]): reads a file line by line into an unbounded
//!   [`OutboundBuffer`], from which a pool of senders issues
//!   `SendMessageBatch` calls of up to ten records.
//! - **Save** ([`Consumer`]): a fetch pool long-polls the queue into a bounded
//!   dispatch channel; handling workers apply the visibility-timeout policy,
//!   pass each body to a [`Handler`] and delete what it accepts.
//!
//! Both are written against the [`QueueService`] trait; [`SqsQueue`] is the
//! implementation backed by `aws-sdk-sqs`.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqsutils::{Producer, ProducerOptions, SqsQueue};
//!
//! # async fn example() -> sqsutils::Result<()> {
//! let config = aws_config::from_env().load().await;
//! let queue = SqsQueue::resolve(&config, "my-queue").await?;
//!
//! let producer = Producer::new(Arc::new(queue), ProducerOptions::default())?;
//! let summary = producer.load_file("records.txt").await?;
//! println!("sent {} of {}", summary.sent, summary.read);
//! # Ok(())
//! # }
//! ```

mod backoff;
mod buffer;
mod consumer;
mod dispatch;
mod error;
mod fetch;
mod handler;
mod options;
mod producer;
mod rate;
mod reader;
mod send;
mod sender;
mod sqs;
mod template;
mod worker;

#[cfg(test)]
mod test_utils;

pub use backoff::{Backoff, BackoffConfig, BackoffHandle, BackoffPhase};
pub use buffer::OutboundBuffer;
pub use consumer::{Consumer, SaveSummary};
pub use dispatch::{dispatch_channel, DispatchReceiver, DispatchSender, InFlightMessage};
pub use error::{Error, Result};
pub use handler::{FileSink, Handler};
pub use options::{ConsumerOptions, ProducerOptions};
pub use producer::{LoadSummary, Producer};
pub use rate::{spawn_reporter, RateCounter, RATE_WINDOW};
pub use reader::spawn_reader;
pub use sender::SenderPool;
pub use sqs::{is_queue_url, QueueService, ReceivedMessage, SqsQueue, MAX_BATCH_SIZE};
pub use template::FormatTemplate;
pub use worker::{HandlingStats, Outcome};
