//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No HTTP or SSE types in any signature
//! - The registry and the log source are collaborators: this crate never
//!   stores logs or tracks processes itself
//! - "Process finished" is a tagged outcome (`LogSourceError::Exhausted`),
//!   never inferred from a generic I/O error

pub mod log_source;
pub mod process_registry;
pub mod session_observer;

use thiserror::Error;

pub use log_source::{LogReader, LogSource};
pub use process_registry::ProcessRegistry;
pub use session_observer::{NoopObserver, SessionObserver, SessionOutcome, SessionReport};

/// Errors from resolving a process identifier.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No process with this identifier.
    #[error("Process not found: {0}")]
    NotFound(String),

    /// The registry itself could not be reached.
    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

/// Errors from opening a log stream.
#[derive(Debug, Error)]
pub enum LogSourceError {
    /// The process has finished and there is nothing (more) to read.
    #[error("Process no longer running")]
    Exhausted,

    /// The source refused or failed to open the stream.
    #[error("Log source unavailable: {0}")]
    Unavailable(String),

    /// Transport-level failure while opening the stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors surfaced before any bytes of a response are committed.
///
/// Adapters map these to their own error types (HTTP status codes, CLI exit
/// codes). Failures after streaming has started are not errors of this kind:
/// they end the session with a [`SessionOutcome`].
#[derive(Debug, Error)]
pub enum StreamError {
    /// Missing or malformed required input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The process identifier does not resolve.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The log source (or registry) failed for a well-formed request.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl From<RegistryError> for StreamError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => Self::NotFound(format!("process '{id}' not found")),
            RegistryError::Unavailable(msg) => Self::UpstreamUnavailable(msg),
        }
    }
}

impl From<LogSourceError> for StreamError {
    fn from(err: LogSourceError) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}
