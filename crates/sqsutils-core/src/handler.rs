//! Sinks for consumed messages.

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// Processes one message body.
///
/// Returning `true` means the body was durably taken care of and the message
/// may be deleted. `false` leaves the message to the queue, which redelivers
/// it once its visibility timeout runs out.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, body: &str) -> bool;

    /// Called once on shutdown, after the last `handle`.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Writes accepted bodies to a file, one per line.
///
/// With a filter, bodies that do not match are rejected without being
/// written.
pub struct FileSink {
    writer: Mutex<BufWriter<File>>,
    filter: Option<Regex>,
}

impl FileSink {
    /// Creates (or truncates) `path`.
    pub async fn create(path: impl AsRef<Path>, filter: Option<Regex>) -> Result<Self> {
        let file = File::create(path).await?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            filter,
        })
    }
}

#[async_trait]
impl Handler for FileSink {
    async fn handle(&self, body: &str) -> bool {
        if let Some(filter) = &self.filter {
            if !filter.is_match(body) {
                return false;
            }
        }

        let mut writer = self.writer.lock().await;
        let written = match writer.write_all(body.as_bytes()).await {
            Ok(()) => writer.write_all(b"\n").await,
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => true,
            Err(e) => {
                log::error!("failed to write message to output: {}", e);
                false
            }
        }
    }

    async fn flush(&self) -> Result<()> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}
