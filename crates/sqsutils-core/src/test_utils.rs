use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::sqs::{QueueService, ReceivedMessage};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Everything the mock queue and the recording handler observed, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Receive,
    Send(Vec<String>),
    Delete(String),
    ChangeVisibility(String, i32),
    Handle(String),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// Scripted stand-in for SQS.
///
/// Receives pop scripted responses; once the script runs out they behave
/// like an idle long poll (short sleep, no messages).
pub struct MockQueue {
    receives: Mutex<VecDeque<Result<Vec<ReceivedMessage>>>>,
    receive_times: Mutex<Vec<Instant>>,
    events: EventLog,
    /// Caps how many entries of each batch the "service" accepts.
    accept_per_batch: Option<usize>,
    fail_sends: bool,
    fail_deletes: bool,
    idle_poll: Duration,
}

impl Default for MockQueue {
    fn default() -> Self {
        Self {
            receives: Mutex::new(VecDeque::new()),
            receive_times: Mutex::new(Vec::new()),
            events: Arc::new(Mutex::new(Vec::new())),
            accept_per_batch: None,
            fail_sends: false,
            fail_deletes: false,
            idle_poll: Duration::from_millis(5),
        }
    }
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepting(mut self, per_batch: usize) -> Self {
        self.accept_per_batch = Some(per_batch);
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn script_messages(&self, messages: Vec<ReceivedMessage>) {
        self.receives.lock().push_back(Ok(messages));
    }

    pub fn script_failure(&self) {
        self.receives.lock().push_back(Err(Error::Queue {
            operation: "receive",
            message: "scripted failure".into(),
        }));
    }

    pub fn events(&self) -> EventLog {
        self.events.clone()
    }

    pub fn sent_batches(&self) -> Vec<Vec<String>> {
        self.filter(|e| match e {
            Event::Send(batch) => Some(batch.clone()),
            _ => None,
        })
    }

    pub fn deleted(&self) -> Vec<String> {
        self.filter(|e| match e {
            Event::Delete(handle) => Some(handle.clone()),
            _ => None,
        })
    }

    pub fn visibility_changes(&self) -> Vec<(String, i32)> {
        self.filter(|e| match e {
            Event::ChangeVisibility(handle, seconds) => Some((handle.clone(), *seconds)),
            _ => None,
        })
    }

    pub fn receive_times(&self) -> Vec<Instant> {
        self.receive_times.lock().clone()
    }

    fn filter<T>(&self, f: impl Fn(&Event) -> Option<T>) -> Vec<T> {
        self.events.lock().iter().filter_map(f).collect()
    }

    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl QueueService for MockQueue {
    async fn receive(
        &self,
        _max_messages: i32,
        _wait_seconds: i32,
        _visibility_timeout: i32,
    ) -> Result<Vec<ReceivedMessage>> {
        let scripted = self.receives.lock().pop_front();
        match scripted {
            Some(response) => {
                self.receive_times.lock().push(Instant::now());
                self.record(Event::Receive);
                response
            }
            None => {
                tokio::time::sleep(self.idle_poll).await;
                Ok(Vec::new())
            }
        }
    }

    async fn delete_message(&self, receipt_handle: &str) -> Result<()> {
        self.record(Event::Delete(receipt_handle.to_string()));
        if self.fail_deletes {
            return Err(Error::Queue {
                operation: "delete_message",
                message: "scripted failure".into(),
            });
        }
        Ok(())
    }

    async fn change_visibility(&self, receipt_handle: &str, seconds: i32) -> Result<()> {
        self.record(Event::ChangeVisibility(receipt_handle.to_string(), seconds));
        Ok(())
    }

    async fn send_batch(&self, bodies: &[String]) -> Result<usize> {
        self.record(Event::Send(bodies.to_vec()));
        if self.fail_sends {
            return Err(Error::Queue {
                operation: "send_batch",
                message: "scripted failure".into(),
            });
        }
        Ok(self
            .accept_per_batch
            .map_or(bodies.len(), |cap| cap.min(bodies.len())))
    }
}

/// Handler that logs every call into a shared [`EventLog`] and accepts
/// bodies matching `accept`.
pub struct RecordingHandler {
    events: EventLog,
    accept: fn(&str) -> bool,
}

impl RecordingHandler {
    pub fn new(events: EventLog, accept: fn(&str) -> bool) -> Self {
        Self { events, accept }
    }

    pub fn accepting_all(events: EventLog) -> Self {
        Self::new(events, |_| true)
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn handle(&self, body: &str) -> bool {
        self.events.lock().push(Event::Handle(body.to_string()));
        (self.accept)(body)
    }
}

pub fn messages(bodies: &[&str]) -> Vec<ReceivedMessage> {
    bodies
        .iter()
        .map(|body| ReceivedMessage::new(*body, format!("rh-{body}")))
        .collect()
}

/// Polls `condition` until it holds, panicking after five seconds.
pub async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met within 5s");
}
