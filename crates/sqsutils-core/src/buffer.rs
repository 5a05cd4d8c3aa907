//! Unbounded multi-producer/multi-consumer buffer between the file reader and
//! the batch senders.
//!
//! Pushing never waits, so a slow queue never stalls the reader. The price is
//! that memory grows with the backlog.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct State {
    items: VecDeque<String>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct OutboundBuffer {
    state: Mutex<State>,
    /// Signalled when items arrive or the buffer closes.
    available: Notify,
    /// Signalled when a drain leaves the buffer empty.
    emptied: Notify,
}

impl OutboundBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: String) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Error::Closed);
            }
            state.items.push_back(record);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Waits until at least one record is buffered or the buffer is closed,
    /// then takes up to `max` records without waiting further.
    ///
    /// Returns an empty batch only once the buffer is closed and empty.
    pub async fn drain_up_to(&self, max: usize) -> Vec<String> {
        if max == 0 {
            return Vec::new();
        }

        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // register before checking so a push between the check and the
            // await still wakes us
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if !state.items.is_empty() {
                    let take = max.min(state.items.len());
                    let batch: Vec<String> = state.items.drain(..take).collect();
                    let remaining = state.items.len();
                    drop(state);

                    if remaining > 0 {
                        // hand the wakeup on to another drainer
                        self.available.notify_one();
                    } else {
                        self.emptied.notify_waiters();
                    }
                    return batch;
                }
                if state.closed {
                    return Vec::new();
                }
            }

            notified.await;
        }
    }

    /// Resolves once no records are buffered. Records already taken by a
    /// drain but not yet sent do not count.
    pub async fn wait_empty(&self) {
        loop {
            let notified = self.emptied.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.state.lock().items.is_empty() {
                return;
            }

            notified.await;
        }
    }

    /// Wakes every pending drain. Later pushes are rejected.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn filled(n: usize) -> OutboundBuffer {
        let buffer = OutboundBuffer::new();
        for i in 0..n {
            buffer.push(format!("record-{i}")).unwrap();
        }
        buffer
    }

    #[tokio::test]
    async fn drain_returns_at_most_max() {
        let buffer = filled(12);

        assert_eq!(buffer.drain_up_to(10).await.len(), 10);
        assert_eq!(buffer.drain_up_to(10).await.len(), 2);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn drain_does_not_wait_for_a_full_batch() {
        let buffer = filled(3);

        let batch = tokio::time::timeout(Duration::from_millis(100), buffer.drain_up_to(10))
            .await
            .expect("drain should not block when records are available");

        assert_eq!(batch, vec!["record-0", "record-1", "record-2"]);
    }

    #[tokio::test]
    async fn drain_waits_for_a_push() {
        let buffer = Arc::new(OutboundBuffer::new());

        let drainer = tokio::spawn({
            let buffer = buffer.clone();
            async move { buffer.drain_up_to(10).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!drainer.is_finished());

        buffer.push("late".to_string()).unwrap();
        assert_eq!(drainer.await.unwrap(), vec!["late"]);
    }

    #[tokio::test]
    async fn close_releases_pending_drains() {
        let buffer = Arc::new(OutboundBuffer::new());

        let drainers: Vec<_> = (0..4)
            .map(|_| {
                let buffer = buffer.clone();
                tokio::spawn(async move { buffer.drain_up_to(10).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        buffer.close();

        for drainer in drainers {
            let batch = tokio::time::timeout(Duration::from_secs(1), drainer)
                .await
                .unwrap()
                .unwrap();
            assert!(batch.is_empty());
        }
    }

    #[tokio::test]
    async fn closed_buffer_hands_out_what_is_left_then_nothing() {
        let buffer = filled(3);
        buffer.close();

        assert_eq!(buffer.drain_up_to(10).await.len(), 3);
        assert!(buffer.drain_up_to(10).await.is_empty());
        assert!(matches!(buffer.push("x".to_string()), Err(Error::Closed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_drains_never_duplicate() {
        let buffer = Arc::new(filled(1000));
        buffer.close();

        let drainers: Vec<_> = (0..8)
            .map(|_| {
                let buffer = buffer.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    loop {
                        let batch = buffer.drain_up_to(10).await;
                        if batch.is_empty() {
                            return seen;
                        }
                        seen.extend(batch);
                    }
                })
            })
            .collect();

        let mut all = Vec::new();
        for drainer in drainers {
            all.extend(drainer.await.unwrap());
        }

        assert_eq!(all.len(), 1000);
        assert_eq!(all.iter().collect::<HashSet<_>>().len(), 1000);
    }

    #[tokio::test]
    async fn wait_empty_resolves_after_last_drain() {
        let buffer = Arc::new(filled(5));

        let waiter = tokio::spawn({
            let buffer = buffer.clone();
            async move { buffer.wait_empty().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        buffer.drain_up_to(10).await;
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
