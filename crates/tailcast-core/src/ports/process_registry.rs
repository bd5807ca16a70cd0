//! Process registry trait definition.

use async_trait::async_trait;

use super::RegistryError;
use crate::domain::ProcessHandle;

/// Port for resolving opaque process identifiers.
#[async_trait]
pub trait ProcessRegistry: Send + Sync {
    /// Resolve `id` to a process handle.
    ///
    /// Returns [`RegistryError::NotFound`] for unknown identifiers.
    async fn find(&self, id: &str) -> Result<ProcessHandle, RegistryError>;
}
