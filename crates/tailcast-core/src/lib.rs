//! Core domain types, ports and services for tailcast.
//!
//! This crate knows nothing about HTTP. It defines what a log line is, how a
//! client's resume marker is interpreted, and the ports through which the
//! adapters reach the process registry and the log source.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types for convenience
pub use domain::{
    LogEvent, ProcessHandle, RangeParamPolicy, ResumeFilter, ResumeMarker, TimeRange, Timestamp,
    parse_timestamp,
};
pub use ports::{
    LogReader, LogSource, LogSourceError, NoopObserver, ProcessRegistry, RegistryError,
    SessionObserver, SessionOutcome, SessionReport, StreamError,
};
pub use services::{LogService, StreamOpen};
