use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Handle to a running (or recently finished) process, as resolved by the registry.
///
/// This is an opaque handle: the log source uses `id` to address the process,
/// `name` and `created_at` feed archive naming and full-lifetime exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessHandle {
    /// Registry identifier (e.g. a container id).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// When the process was created.
    pub created_at: DateTime<Utc>,
}

impl ProcessHandle {
    /// Create a new process handle.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
        }
    }
}
