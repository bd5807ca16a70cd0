//! Runtime and OS-level concerns for tailcast.
//!
//! - `diagnostics` - session-end reporting of task counts and process memory
//! - `archive` - gzip compression of exported log ranges

#![deny(unused_crate_dependencies)]

pub mod archive;
pub mod diagnostics;

pub use archive::{ARCHIVE_COMMENT, ArchiveName, gzip_stream};
pub use diagnostics::{MemoryStats, RuntimeDiagnostics, format_bytes};

#[cfg(test)]
use futures_util as _;
