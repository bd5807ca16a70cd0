//! Session observer trait for operational diagnostics.
//!
//! Stream sessions report here once, when they end. Observers are purely
//! observational: nothing they do can affect what was sent to the client.

use std::time::Duration;

/// How a stream session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The log source reached end of input: the process stopped.
    Exhausted,
    /// The client went away or the request was cancelled.
    Cancelled,
    /// The log stream failed mid-session.
    Failed(String),
}

impl SessionOutcome {
    /// Normal terminations are not failures, even when the client disconnects.
    pub const fn is_normal(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Cancelled)
    }
}

/// Summary of one finished stream session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub process_id: String,
    pub outcome: SessionOutcome,
    /// Frames handed to the transport, keepalives excluded.
    pub frames_sent: u64,
    pub elapsed: Duration,
}

/// Trait for observing session lifecycle.
///
/// # Implementations
///
/// - `NoopObserver` - For tests and embedders that don't want diagnostics
/// - `RuntimeDiagnostics` in `tailcast-runtime` - task count and memory stats
pub trait SessionObserver: Send + Sync {
    /// Called exactly once per session, after its last frame.
    ///
    /// This method should not block.
    fn session_ended(&self, report: &SessionReport);
}

/// An observer that discards all reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl NoopObserver {
    pub const fn new() -> Self {
        Self
    }
}

impl SessionObserver for NoopObserver {
    fn session_ended(&self, _report: &SessionReport) {}
}
