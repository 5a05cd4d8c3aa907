//! The load pipeline: file → reader → outbound buffer → sender pool → queue.

use crate::buffer::OutboundBuffer;
use crate::error::{Error, Result};
use crate::options::ProducerOptions;
use crate::rate::{spawn_reporter, RateCounter};
use crate::reader::spawn_reader;
use crate::sender::SenderPool;
use crate::sqs::QueueService;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of a completed load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records read from the input and buffered.
    pub read: u64,
    /// Records the queue reported as accepted.
    pub sent: u64,
}

pub struct Producer {
    queue: Arc<dyn QueueService>,
    options: ProducerOptions,
}

impl Producer {
    pub fn new(queue: Arc<dyn QueueService>, options: ProducerOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { queue, options })
    }

    /// Opens `path` and loads every line of it into the queue.
    ///
    /// Failing to open the file is reported before any worker starts.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<LoadSummary> {
        let file = tokio::fs::File::open(path.as_ref()).await?;
        log::info!("loading {}", path.as_ref().display());
        self.load(file).await
    }

    /// Runs the load pipeline over `reader` until every line has been handed
    /// to the queue.
    ///
    /// Completion is the reader reaching EOF *and* the buffer running dry;
    /// only then is the buffer closed and the senders joined. A read error
    /// stops the senders and is returned.
    pub async fn load<R>(&self, reader: R) -> Result<LoadSummary>
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(OutboundBuffer::new());
        let rate = Arc::new(RateCounter::default());
        let token = CancellationToken::new();

        let reporter = spawn_reporter(
            "load",
            rate.clone(),
            self.options.report_interval,
            token.child_token(),
        );

        let senders = SenderPool::spawn(
            self.options.sender_workers,
            self.options.effective_batch_size(),
            buffer.clone(),
            self.queue.clone(),
            rate.clone(),
            token.clone(),
        );
        log::debug!("started {} senders", senders.worker_count());

        let reader = spawn_reader(
            reader,
            self.options.read_buffer_size,
            self.options.template.clone(),
            buffer.clone(),
        );

        let read = match reader.await.map_err(Error::from).and_then(|r| r) {
            Ok(read) => read,
            Err(e) => {
                log::error!("aborting load: {}", e);
                token.cancel();
                buffer.close();
                senders.join().await?;
                let _ = reporter.await;
                return Err(e);
            }
        };

        buffer.wait_empty().await;
        buffer.close();
        senders.join().await?;

        token.cancel();
        let _ = reporter.await;

        let summary = LoadSummary {
            read,
            sent: rate.total(),
        };
        log::info!("loaded {} of {} records", summary.sent, summary.read);
        Ok(summary)
    }
}
