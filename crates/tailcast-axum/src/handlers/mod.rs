//! HTTP request handlers for the Axum web server.
//!
//! Handlers are thin wrappers that delegate to `LogService` and hand the
//! opened readers to the SSE session or the archive stream.

pub mod logs;
