//! Fetch pool: long-polls the queue and feeds the dispatch channel.

use crate::backoff::BackoffHandle;
use crate::dispatch::{DispatchSender, InFlightMessage};
use crate::sqs::QueueService;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Receive parameters shared by every fetch worker.
#[derive(Clone, Copy, Debug)]
pub struct ReceiveSettings {
    pub max_messages: i32,
    pub wait_time_seconds: i32,
    pub visibility_timeout_seconds: i32,
}

pub fn spawn_fetchers(
    threads: usize,
    settings: ReceiveSettings,
    queue: Arc<dyn QueueService>,
    tx: DispatchSender,
    backoff: BackoffHandle,
    token: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..threads)
        .map(|id| {
            tokio::spawn(fetch_loop(
                id,
                settings,
                queue.clone(),
                tx.clone(),
                backoff.clone(),
                token.clone(),
            ))
        })
        .collect()
}

async fn fetch_loop(
    id: usize,
    settings: ReceiveSettings,
    queue: Arc<dyn QueueService>,
    tx: DispatchSender,
    backoff: BackoffHandle,
    token: CancellationToken,
) {
    while !token.is_cancelled() {
        let received = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            received = queue.receive(
                settings.max_messages,
                settings.wait_time_seconds,
                settings.visibility_timeout_seconds,
            ) => received,
        };

        let messages = match received {
            Ok(messages) => messages,
            Err(e) => {
                let delay = backoff.on_failure().await;
                log::error!("fetcher {}: {} (retrying in {:?})", id, e, delay);
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                continue;
            }
        };

        backoff.on_success().await;

        let delivered_at = Instant::now();
        for message in messages {
            let message = InFlightMessage::new(message, delivered_at);
            // blocks while the channel is full
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                sent = tx.send(message) => {
                    if sent.is_err() {
                        log::debug!("fetcher {}: dispatch channel closed", id);
                        return;
                    }
                }
            }
        }
    }

    log::debug!("fetcher {} stopped", id);
}
