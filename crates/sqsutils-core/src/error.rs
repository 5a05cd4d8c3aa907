//! Error types shared by the producer and consumer pipelines.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Reading the input file or writing the output file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The record format template could not be parsed
    #[error("invalid format template {template:?}: {reason}")]
    Template { template: String, reason: String },

    /// Pipeline options rejected before start
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A remote queue operation failed
    #[error("queue error during {operation}: {message}")]
    Queue {
        operation: &'static str,
        message: String,
    },

    /// Push attempted on a closed outbound buffer
    #[error("outbound buffer is closed")]
    Closed,

    /// A pipeline task panicked or was aborted
    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Wraps an SDK error, keeping the service's own message when there is one.
    pub(crate) fn queue<E, R>(operation: &'static str, err: aws_sdk_sqs::error::SdkError<E, R>) -> Self
    where
        E: std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        let message = match &err {
            aws_sdk_sqs::error::SdkError::ServiceError(se) => se.err().to_string(),
            other => other.to_string(),
        };
        Error::Queue { operation, message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
