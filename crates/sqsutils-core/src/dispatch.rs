//! The bounded channel between the fetch pool and the handling workers.
//!
//! Its capacity is the prefetch limit. A full channel blocks the fetchers,
//! which is what keeps receives paced to handling.

use crate::sqs::ReceivedMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

/// A received message on its way to a handling worker.
#[derive(Clone, Debug)]
pub struct InFlightMessage {
    pub body: String,
    pub receipt_handle: String,
    pub delivered_at: Instant,
}

impl InFlightMessage {
    pub fn new(message: ReceivedMessage, delivered_at: Instant) -> Self {
        Self {
            body: message.body,
            receipt_handle: message.receipt_handle,
            delivered_at,
        }
    }

    /// Time since delivery, measured now.
    pub fn age(&self) -> Duration {
        self.delivered_at.elapsed()
    }
}

pub type DispatchSender = mpsc::Sender<InFlightMessage>;

/// Shared by all handling workers; each `recv` hands a message to exactly one.
pub type DispatchReceiver = Arc<Mutex<mpsc::Receiver<InFlightMessage>>>;

pub fn dispatch_channel(capacity: usize) -> (DispatchSender, DispatchReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, Arc::new(Mutex::new(rx)))
}

/// Takes whatever is still buffered without waiting for more.
pub async fn drain(rx: &DispatchReceiver) -> Vec<InFlightMessage> {
    let mut rx = rx.lock().await;
    let mut drained = Vec::new();
    while let Ok(message) = rx.try_recv() {
        drained.push(message);
    }
    drained
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> InFlightMessage {
        InFlightMessage::new(ReceivedMessage::new(body, format!("rh-{body}")), Instant::now())
    }

    #[tokio::test]
    async fn send_blocks_when_full() {
        let (tx, _rx) = dispatch_channel(2);
        tx.send(message("a")).await.unwrap();
        tx.send(message("b")).await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), tx.send(message("c"))).await;
        assert!(blocked.is_err());
    }

    #[tokio::test]
    async fn drain_empties_without_closing() {
        let (tx, rx) = dispatch_channel(10);
        for body in ["a", "b", "c"] {
            tx.send(message(body)).await.unwrap();
        }

        let drained = drain(&rx).await;
        assert_eq!(
            drained.iter().map(|m| m.body.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );

        tx.send(message("d")).await.unwrap();
        assert_eq!(drain(&rx).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn age_grows_with_time() {
        let message = message("a");
        tokio::time::advance(Duration::from_secs(12)).await;

        assert_eq!(message.age(), Duration::from_secs(12));
    }
}
