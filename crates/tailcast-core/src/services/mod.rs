//! Services orchestrating the ports.
//!
//! Adapters stay thin: they extract request parameters, call a service and
//! turn the result into their transport's response.

mod log_service;

pub use log_service::{LogService, StreamOpen};
