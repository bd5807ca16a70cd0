//! Closed time intervals for range exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::StreamError;

/// Closed interval `[from, to]` of log time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    #[must_use]
    pub const fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Whole lifetime of a process up to `now`.
    #[must_use]
    pub const fn lifetime(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::new(created_at, now)
    }
}

/// How `from`/`to` request parameters are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeParamPolicy {
    /// Missing or malformed bounds, and `from > to`, are rejected as invalid requests.
    #[default]
    Strict,
    /// Missing or malformed bounds silently become the zero time (UNIX epoch).
    ///
    /// Widens the requested range instead of failing, which can hide caller bugs.
    Lenient,
}

impl RangeParamPolicy {
    /// Build a range from raw query values.
    pub fn parse(self, from: Option<&str>, to: Option<&str>) -> Result<TimeRange, StreamError> {
        let range = TimeRange::new(self.bound("from", from)?, self.bound("to", to)?);

        if self == Self::Strict && range.from > range.to {
            return Err(StreamError::InvalidRequest(format!(
                "'from' ({}) is after 'to' ({})",
                range.from.to_rfc3339(),
                range.to.to_rfc3339()
            )));
        }

        Ok(range)
    }

    fn bound(self, name: &str, raw: Option<&str>) -> Result<DateTime<Utc>, StreamError> {
        let parsed = raw
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| (value, DateTime::parse_from_rfc3339(value)));

        match (self, parsed) {
            (_, Some((_, Ok(ts)))) => Ok(ts.with_timezone(&Utc)),
            (Self::Lenient, _) => Ok(DateTime::<Utc>::UNIX_EPOCH),
            (Self::Strict, None) => Err(StreamError::InvalidRequest(format!(
                "'{name}' is required"
            ))),
            (Self::Strict, Some((value, Err(e)))) => Err(StreamError::InvalidRequest(format!(
                "'{name}' is not an RFC3339 timestamp ({value}): {e}"
            ))),
        }
    }
}
