//! Server-sent events transport for log streams.
//!
//! - `frame` - the wire format of each event
//! - `session` - the per-connection framing loop and keepalive ticker

mod frame;
mod session;

pub use frame::{Frame, PING, STOPPED};
pub use session::{SessionBody, StreamSession};

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE, HeaderName};
use axum::response::{IntoResponse, Response};

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Wrap a session body in event-stream headers.
///
/// Caching, transformation and proxy buffering are disabled so each frame
/// reaches the client as soon as it is written.
pub fn event_stream(body: SessionBody) -> Response {
    (
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache, no-transform"),
            (CONNECTION, "keep-alive"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}
