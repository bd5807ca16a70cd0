//! gzip archives of exported logs.
//!
//! The compressed body is produced incrementally: each chunk read from the
//! log source is fed through the encoder and whatever compressed output is
//! ready is yielded right away, so large exports never sit in memory.

use std::io::{self, Write};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use flate2::{Compression, GzBuilder};
use futures_core::Stream;
use tailcast_core::LogReader;
use tokio::io::AsyncReadExt;

/// Comment stored in the gzip header of every archive.
pub const ARCHIVE_COMMENT: &str = "Logs generated by tailcast";

const READ_CHUNK: usize = 32 * 1024;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Deterministic archive naming: `<process>-<YYYY-MM-DDTHH-MM-SS>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    stem: String,
    created: DateTime<Utc>,
}

impl ArchiveName {
    pub fn new(process_name: &str, at: DateTime<Utc>) -> Self {
        Self {
            stem: format!("{}-{}", sanitize(process_name), at.format(TIMESTAMP_FORMAT)),
            created: at,
        }
    }

    /// Name of the downloaded file.
    pub fn file_name(&self) -> String {
        format!("{}.log.gz", self.stem)
    }

    /// Name of the uncompressed file recorded inside the gzip header.
    pub fn entry_name(&self) -> String {
        format!("{}.log", self.stem)
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.file_name())
    }

    fn mtime(&self) -> u32 {
        u32::try_from(self.created.timestamp()).unwrap_or(0)
    }
}

/// Container names may carry a leading slash or characters that would
/// break a `Content-Disposition` header.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim_start_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "process".to_string()
    } else {
        cleaned
    }
}

/// Compress `reader` into a gzip stream named after `name`.
///
/// The reader is owned by the stream and dropped when the stream completes,
/// fails, or is itself dropped.
pub fn gzip_stream(
    mut reader: LogReader,
    name: &ArchiveName,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    let mut encoder = GzBuilder::new()
        .filename(name.entry_name())
        .comment(ARCHIVE_COMMENT)
        .mtime(name.mtime())
        .write(Vec::new(), Compression::default());

    async_stream::try_stream! {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            encoder.write_all(&buf[..n])?;

            let ready = std::mem::take(encoder.get_mut());
            if !ready.is_empty() {
                yield Bytes::from(ready);
            }
        }

        let rest = encoder.finish()?;
        if !rest.is_empty() {
            yield Bytes::from(rest);
        }
    }
}
