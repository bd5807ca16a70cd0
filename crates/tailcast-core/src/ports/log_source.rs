//! Log source trait definition.
//!
//! This port yields the raw bytes of a process's output. Lines are
//! newline-delimited and, when the source supports it, prefixed with an
//! RFC3339 nanosecond timestamp followed by a space.

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::LogSourceError;
use crate::domain::{ProcessHandle, ResumeMarker, TimeRange};

/// Raw log byte stream. Dropping the reader releases the underlying stream.
pub type LogReader = Pin<Box<dyn AsyncRead + Send>>;

/// Port for reading process output.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Follow the live output of `process`.
    ///
    /// Starts with the last `tail` lines, or from `since` when the client is
    /// resuming. Returns [`LogSourceError::Exhausted`] when the process has
    /// already finished and there is nothing to deliver. A clean end of the
    /// returned reader means the process stopped.
    async fn tail(
        &self,
        process: &ProcessHandle,
        tail: usize,
        since: Option<&ResumeMarker>,
    ) -> Result<LogReader, LogSourceError>;

    /// Read the output logged within `range`. The reader ends at `range.to`.
    async fn range(
        &self,
        process: &ProcessHandle,
        range: TimeRange,
    ) -> Result<LogReader, LogSourceError>;
}
