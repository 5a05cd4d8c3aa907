//! Batch sender pool: workers that drain the outbound buffer and issue one
//! `SendMessageBatch` per drained batch.

use crate::buffer::OutboundBuffer;
use crate::error::Result;
use crate::rate::RateCounter;
use crate::sqs::QueueService;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct SenderPool {
    workers: Vec<JoinHandle<()>>,
}

impl SenderPool {
    /// Starts `workers` senders. They run until `token` is cancelled or the
    /// buffer is closed and exhausted.
    pub fn spawn(
        workers: usize,
        batch_size: usize,
        buffer: Arc<OutboundBuffer>,
        queue: Arc<dyn QueueService>,
        rate: Arc<RateCounter>,
        token: CancellationToken,
    ) -> Self {
        let workers = (0..workers)
            .map(|id| {
                tokio::spawn(send_loop(
                    id,
                    batch_size,
                    buffer.clone(),
                    queue.clone(),
                    rate.clone(),
                    token.clone(),
                ))
            })
            .collect();

        Self { workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker to exit.
    pub async fn join(self) -> Result<()> {
        for worker in self.workers {
            worker.await?;
        }
        Ok(())
    }
}

async fn send_loop(
    id: usize,
    batch_size: usize,
    buffer: Arc<OutboundBuffer>,
    queue: Arc<dyn QueueService>,
    rate: Arc<RateCounter>,
    token: CancellationToken,
) {
    loop {
        let batch = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            batch = buffer.drain_up_to(batch_size) => batch,
        };

        if batch.is_empty() {
            if buffer.is_closed() {
                break;
            }
            continue;
        }

        match queue.send_batch(&batch).await {
            Ok(sent) => {
                rate.incr(sent as u64);
                if sent < batch.len() {
                    log::warn!(
                        "sender {}: {} of {} records rejected by the queue",
                        id,
                        batch.len() - sent,
                        batch.len()
                    );
                }
            }
            Err(e) => {
                log::error!("sender {}: dropping batch of {}: {}", id, batch.len(), e);
            }
        }
    }

    log::debug!("sender {} stopped", id);
}
