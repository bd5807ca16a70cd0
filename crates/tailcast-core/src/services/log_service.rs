//! Log service - resolves processes and opens their log streams.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{ProcessHandle, ResumeMarker, TimeRange};
use crate::ports::{LogReader, LogSource, LogSourceError, ProcessRegistry, StreamError};

/// Result of opening a live stream.
pub enum StreamOpen {
    /// The process is producing output; frame `reader` to the client.
    Live {
        process: ProcessHandle,
        reader: LogReader,
    },
    /// The process had already finished with nothing to deliver.
    Finished { process: ProcessHandle },
}

impl std::fmt::Debug for StreamOpen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live { process, .. } => f
                .debug_struct("Live")
                .field("process", process)
                .finish_non_exhaustive(),
            Self::Finished { process } => {
                f.debug_struct("Finished").field("process", process).finish()
            }
        }
    }
}

/// Entry point for both the resumable stream and range exports.
///
/// Everything here happens before a response is committed, so every failure
/// is a [`StreamError`] the adapter can still turn into a proper status code.
#[derive(Clone)]
pub struct LogService {
    registry: Arc<dyn ProcessRegistry>,
    source: Arc<dyn LogSource>,
}

impl LogService {
    pub fn new(registry: Arc<dyn ProcessRegistry>, source: Arc<dyn LogSource>) -> Self {
        Self { registry, source }
    }

    /// Validate and resolve a process identifier.
    pub async fn resolve(&self, id: &str) -> Result<ProcessHandle, StreamError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(StreamError::InvalidRequest("id is required".to_string()));
        }
        Ok(self.registry.find(id).await?)
    }

    /// Open the live output of a process, positioned at `since` if resuming.
    pub async fn open_stream(
        &self,
        id: &str,
        tail: usize,
        since: Option<&ResumeMarker>,
    ) -> Result<StreamOpen, StreamError> {
        let process = self.resolve(id).await?;

        match self.source.tail(&process, tail, since).await {
            Ok(reader) => Ok(StreamOpen::Live { process, reader }),
            Err(LogSourceError::Exhausted) => {
                debug!(process_id = %process.id, "process already stopped");
                Ok(StreamOpen::Finished { process })
            }
            Err(e) => {
                warn!(process_id = %process.id, error = %e, "failed to open log stream");
                Err(e.into())
            }
        }
    }

    /// Open the output of an already resolved process within `range`.
    ///
    /// A process that logged nothing in the range yields an empty reader.
    pub async fn read_range(
        &self,
        process: &ProcessHandle,
        range: TimeRange,
    ) -> Result<LogReader, StreamError> {
        match self.source.range(process, range).await {
            Ok(reader) => Ok(reader),
            Err(LogSourceError::Exhausted) => Ok(Box::pin(tokio::io::empty())),
            Err(e) => {
                warn!(
                    process_id = %process.id,
                    from = %range.from.to_rfc3339(),
                    to = %range.to.to_rfc3339(),
                    error = %e,
                    "failed to open log range"
                );
                Err(e.into())
            }
        }
    }
}
