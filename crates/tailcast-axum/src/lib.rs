//! Axum web server adapter for tailcast.
//!
//! Serves the output of running processes over HTTP:
//!
//! - `GET /api/logs/stream?id=<id>` - resumable server-sent event stream
//! - `GET /api/logs/range?id=<id>&from=<RFC3339>&to=<RFC3339>` - raw log range
//! - `GET /api/logs/download?id=<id>` - gzip archive of the whole lifetime
//!
//! The process registry and the log source are injected by the embedder
//! through [`bootstrap`].

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Dev-dependencies used only by the integration tests
#[cfg(test)]
use flate2 as _;
#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use serde_json as _;
#[cfg(test)]
use tower as _;

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod sse;
pub mod state;

// Re-export primary types
pub use bootstrap::{AxumContext, CorsConfig, ServerConfig, StreamConfig, bootstrap, start_server};
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
