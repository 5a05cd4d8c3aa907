//! The queue operations both pipelines depend on, and their SQS implementation.

use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs as sqs;

/// SQS refuses batches larger than this.
pub const MAX_BATCH_SIZE: usize = 10;

/// The remote operation set the pipelines are written against.
///
/// [`SqsQueue`] is the production implementation; tests substitute a
/// recording double.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Long-polls for up to `max_messages` messages.
    async fn receive(
        &self,
        max_messages: i32,
        wait_seconds: i32,
        visibility_timeout: i32,
    ) -> Result<Vec<ReceivedMessage>>;

    async fn delete_message(&self, receipt_handle: &str) -> Result<()>;

    async fn change_visibility(&self, receipt_handle: &str, seconds: i32) -> Result<()>;

    /// Enqueues every body in one request and returns how many the service accepted.
    async fn send_batch(&self, bodies: &[String]) -> Result<usize>;
}

/// A message as handed out by the queue, before it enters the dispatch channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub body: String,
    pub receipt_handle: String,
}

impl ReceivedMessage {
    pub fn new(body: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            receipt_handle: receipt_handle.into(),
        }
    }

    /// Converts an AWS SDK message.
    ///
    /// Returns `None` for messages without a receipt handle, since those can
    /// never be acknowledged. A missing body becomes the empty string.
    pub fn from_aws_message(message: sqs::types::Message) -> Option<Self> {
        let Some(receipt_handle) = message.receipt_handle else {
            log::warn!(
                "skipping message {} without a receipt handle",
                message.message_id.as_deref().unwrap_or("<unknown>")
            );
            return None;
        };

        Some(Self {
            body: message.body.unwrap_or_default(),
            receipt_handle,
        })
    }
}

/// A single SQS queue addressed by URL.
#[derive(Clone, Debug)]
pub struct SqsQueue {
    pub client: sqs::Client,
    pub queue_url: String,
}

impl SqsQueue {
    pub fn new(client: sqs::Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Builds a queue handle from an SDK config and either a queue URL or a
    /// queue name. Names are resolved with `GetQueueUrl`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sqsutils::SqsQueue;
    ///
    /// # async fn example() -> sqsutils::Result<()> {
    /// let config = aws_config::from_env().load().await;
    /// let queue = SqsQueue::resolve(&config, "my-queue").await?;
    /// println!("{}", queue.queue_url);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn resolve(config: &SdkConfig, queue: &str) -> Result<Self> {
        let client = sqs::Client::new(config);

        if is_queue_url(queue) {
            return Ok(Self::new(client, queue));
        }

        let output = client
            .get_queue_url()
            .queue_name(queue)
            .send()
            .await
            .map_err(|e| Error::queue("get_queue_url", e))?;

        let queue_url = output.queue_url.ok_or_else(|| Error::Queue {
            operation: "get_queue_url",
            message: format!("no URL returned for queue {queue}"),
        })?;

        log::debug!("resolved queue {} to {}", queue, queue_url);
        Ok(Self::new(client, queue_url))
    }
}

/// Anything with a scheme is taken as a URL; everything else is a queue name.
pub fn is_queue_url(queue: &str) -> bool {
    queue.contains("://")
}

#[async_trait]
impl QueueService for SqsQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait_seconds: i32,
        visibility_timeout: i32,
    ) -> Result<Vec<ReceivedMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_seconds)
            .visibility_timeout(visibility_timeout)
            .send()
            .await
            .map_err(|e| Error::queue("receive", e))?;

        Ok(output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(ReceivedMessage::from_aws_message)
            .collect())
    }

    async fn delete_message(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| Error::queue("delete_message", e))?;

        Ok(())
    }

    async fn change_visibility(&self, receipt_handle: &str, seconds: i32) -> Result<()> {
        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(seconds)
            .send()
            .await
            .map_err(|e| Error::queue("change_visibility", e))?;

        Ok(())
    }

    async fn send_batch(&self, bodies: &[String]) -> Result<usize> {
        self.send_entries(bodies).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_and_names_are_told_apart() {
        assert!(is_queue_url(
            "https://sqs.us-east-1.amazonaws.com/123456789012/orders"
        ));
        assert!(is_queue_url(
            "http://sqs.us-east-1.localhost.localstack.cloud:4566/000000000000/demo"
        ));
        assert!(!is_queue_url("orders"));
        assert!(!is_queue_url("orders-dlq.fifo"));
    }

    #[test]
    fn aws_message_without_receipt_handle_is_skipped() {
        let message = sqs::types::Message::builder()
            .message_id("m-1")
            .body("hello")
            .build();

        assert_eq!(ReceivedMessage::from_aws_message(message), None);
    }

    #[test]
    fn aws_message_without_body_becomes_empty() {
        let message = sqs::types::Message::builder()
            .message_id("m-2")
            .receipt_handle("rh-2")
            .build();

        assert_eq!(
            ReceivedMessage::from_aws_message(message),
            Some(ReceivedMessage::new("", "rh-2"))
        );
    }
}
