//! Event-stream wire format.
//!
//! ```text
//! data: <raw log line including trailing newline>
//! id: <RFC3339Nano timestamp>      only if the line starts with one
//! <blank line>
//! ```
//!
//! Every frame is encoded into a single `Bytes` so it reaches the transport
//! as one unit.

use bytes::{BufMut, Bytes, BytesMut};
use tailcast_core::LogEvent;

/// Comment-only keepalive frame.
pub const PING: &[u8] = b": ping \n\n";

/// Terminal frame sent when the process has stopped.
pub const STOPPED: &[u8] = b"event: container-stopped\ndata: end of stream\n\n";

/// One protocol unit of the event stream.
#[derive(Debug, Clone, Copy)]
pub enum Frame<'a> {
    Log(LogEvent<'a>),
    Ping,
    Stopped,
}

impl Frame<'_> {
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Log(event) => encode_log(event),
            Self::Ping => Bytes::from_static(PING),
            Self::Stopped => Bytes::from_static(STOPPED),
        }
    }
}

fn encode_log(event: &LogEvent<'_>) -> Bytes {
    let payload = event.payload();
    let marker = event.marker();

    let mut buf = BytesMut::with_capacity(
        payload.len() + marker.map_or(0, |m| m.len() + 5) + 8,
    );
    buf.put_slice(b"data: ");
    buf.put_slice(payload);
    // A final line without newline would otherwise swallow the next field.
    if !payload.ends_with(b"\n") {
        buf.put_u8(b'\n');
    }
    if let Some(marker) = marker {
        buf.put_slice(b"id: ");
        buf.put_slice(marker.as_bytes());
        buf.put_u8(b'\n');
    }
    buf.put_u8(b'\n');
    buf.freeze()
}
