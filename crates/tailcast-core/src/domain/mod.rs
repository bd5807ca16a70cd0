//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! transport concerns (HTTP, SSE framing, compression).
//!
//! # Structure
//!
//! - `log_event` - Log lines, their leading timestamp and resume markers
//! - `process` - Handles to the processes whose output is read
//! - `range` - Closed time intervals for range exports

mod log_event;
mod process;
mod range;

pub use log_event::{LogEvent, ResumeFilter, ResumeMarker, Timestamp, parse_timestamp};
pub use process::ProcessHandle;
pub use range::{RangeParamPolicy, TimeRange};
