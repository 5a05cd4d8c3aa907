use crate::error::{Error, Result};
use crate::sqs::{SqsQueue, MAX_BATCH_SIZE};

impl SqsQueue {
    /// Sends one `SendMessageBatch` request. Every entry gets a fresh id, so
    /// duplicate bodies within a batch are fine.
    ///
    /// Per-entry failures are logged and left out of the returned count.
    pub(crate) async fn send_entries(&self, bodies: &[String]) -> Result<usize> {
        // SQS rejects empty batch requests
        if bodies.is_empty() {
            return Ok(0);
        }

        if bodies.len() > MAX_BATCH_SIZE {
            return Err(Error::Config(format!(
                "batch of {} exceeds the SQS limit of {}",
                bodies.len(),
                MAX_BATCH_SIZE
            )));
        }

        let entries = bodies
            .iter()
            .map(|body| {
                aws_sdk_sqs::types::SendMessageBatchRequestEntry::builder()
                    .id(uuid::Uuid::new_v4().to_string())
                    .message_body(body)
                    .build()
                    .map_err(|e| Error::Queue {
                        operation: "send_batch",
                        message: format!("failed to build message entry: {e}"),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| Error::queue("send_batch", e))?;

        for failed in output.failed() {
            log::warn!(
                "entry {} rejected ({}): {}",
                failed.id(),
                failed.code(),
                failed.message().unwrap_or("no message")
            );
        }

        Ok(output.successful().len())
    }
}
