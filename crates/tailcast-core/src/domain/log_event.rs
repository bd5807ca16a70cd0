//! Log lines and resume markers.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Timestamp carried at the start of a log line.
pub type Timestamp = DateTime<FixedOffset>;

/// Parse an RFC3339 timestamp with optional (up to nanosecond) fractional seconds.
pub fn parse_timestamp(token: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(token).ok()
}

/// One line of process output, borrowed from the read buffer.
///
/// A line is `<timestamp> <text>\n` when the log source prefixes timestamps.
/// Lines without a parseable leading token are still events, they just
/// cannot be used as a resume point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogEvent<'a> {
    payload: &'a [u8],
    marker: Option<&'a str>,
    timestamp: Option<Timestamp>,
}

impl<'a> LogEvent<'a> {
    /// Split the leading token off a raw line and try to read it as a timestamp.
    ///
    /// The token is everything before the first space. A line with no space
    /// has no token.
    pub fn parse(line: &'a [u8]) -> Self {
        let token = line
            .iter()
            .position(|b| *b == b' ')
            .and_then(|end| std::str::from_utf8(&line[..end]).ok());

        let (marker, timestamp) = match token.and_then(|t| parse_timestamp(t).map(|ts| (t, ts))) {
            Some((token, ts)) => (Some(token), Some(ts)),
            None => (None, None),
        };

        Self {
            payload: line,
            marker,
            timestamp,
        }
    }

    /// Raw line bytes as read, trailing newline included.
    pub const fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// The leading timestamp token, verbatim. Advertised to clients as the event id.
    pub const fn marker(&self) -> Option<&'a str> {
        self.marker
    }

    pub const fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }
}

/// Timestamp of the last event a client has seen.
///
/// The marker is opaque to clients: they echo back whatever they received
/// in the most recent `id:` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeMarker(String);

impl ResumeMarker {
    /// Wrap a raw marker. Blank input is treated as no marker at all.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Pick the marker for a reconnecting client.
    ///
    /// The query parameter takes precedence over the `Last-Event-ID` header;
    /// an empty query value falls back to the header.
    pub fn from_request(query: Option<&str>, header: Option<&str>) -> Option<Self> {
        query
            .and_then(Self::new)
            .or_else(|| header.and_then(Self::new))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The marker as a timestamp, if the client sent one we issued.
    pub fn timestamp(&self) -> Option<Timestamp> {
        parse_timestamp(&self.0)
    }
}

impl std::fmt::Display for ResumeMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drops lines a resuming client has already received.
///
/// Log sources may treat the marker inclusively or at coarser precision than
/// the marker carries, so the head of a resumed stream can repeat events.
/// Lines stamped at or before the marker are dropped, together with any
/// unstamped continuation lines that directly follow a dropped line. The
/// filter switches off for good at the first line stamped after the marker.
#[derive(Debug, Clone)]
pub struct ResumeFilter {
    marker: Option<Timestamp>,
    dropped_previous: bool,
}

impl ResumeFilter {
    pub fn new(marker: Option<&ResumeMarker>) -> Self {
        Self {
            marker: marker.and_then(ResumeMarker::timestamp),
            dropped_previous: false,
        }
    }

    /// Decide whether `event` should be delivered.
    pub fn admit(&mut self, event: &LogEvent<'_>) -> bool {
        let Some(marker) = self.marker else {
            return true;
        };

        match event.timestamp() {
            Some(ts) if ts <= marker => {
                self.dropped_previous = true;
                false
            }
            Some(_) => {
                self.marker = None;
                self.dropped_previous = false;
                true
            }
            None => !self.dropped_previous,
        }
    }
}
