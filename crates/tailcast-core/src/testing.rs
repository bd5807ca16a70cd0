//! In-memory collaborators for tests.
//!
//! `StaticRegistry` and `ScriptedLogSource` stand in for a real process
//! registry and log backend. The scripted source treats resume markers
//! inclusively, the way coarse-grained backends do, so the head of a resumed
//! stream repeats the last delivered line unless the caller filters it.

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

use crate::domain::{LogEvent, ProcessHandle, ResumeMarker, TimeRange};
use crate::ports::{
    LogReader, LogSource, LogSourceError, ProcessRegistry, RegistryError, SessionObserver,
    SessionReport,
};

/// Creation time of every process built by [`process`].
pub const PROCESS_CREATED_AT: &str = "2024-01-01T00:00:00Z";

/// Build a process handle created at [`PROCESS_CREATED_AT`].
pub fn process(id: &str, name: &str) -> ProcessHandle {
    let created_at = PROCESS_CREATED_AT
        .parse::<DateTime<Utc>>()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    ProcessHandle::new(id, name, created_at)
}

/// Registry backed by a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    processes: HashMap<String, ProcessHandle>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_process(mut self, process: ProcessHandle) -> Self {
        self.processes.insert(process.id.clone(), process);
        self
    }
}

#[async_trait]
impl ProcessRegistry for StaticRegistry {
    async fn find(&self, id: &str) -> Result<ProcessHandle, RegistryError> {
        self.processes
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }
}

/// What a scripted reader does once its lines are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderEnd {
    /// Clean end of input: the process stopped.
    Eof,
    /// Never returns again, like a live process that went quiet.
    Hang,
    /// Fails with an I/O error of this kind.
    Fail(io::ErrorKind),
}

/// Output of one scripted process.
#[derive(Debug, Clone)]
pub struct ScriptedLog {
    lines: Vec<String>,
    end: ReaderEnd,
    open_error: Option<String>,
}

impl ScriptedLog {
    /// Lines are given without their trailing newline.
    pub fn new<I, S>(lines: I, end: ReaderEnd) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines
                .into_iter()
                .map(|line| {
                    let mut line = line.into();
                    line.push('\n');
                    line
                })
                .collect(),
            end,
            open_error: None,
        }
    }

    /// Raw output, split after each newline. The last line may be partial.
    pub fn raw(output: &str, end: ReaderEnd) -> Self {
        Self {
            lines: output.split_inclusive('\n').map(str::to_string).collect(),
            end,
            open_error: None,
        }
    }

    /// A log whose streams always fail to open.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            lines: Vec::new(),
            end: ReaderEnd::Eof,
            open_error: Some(reason.to_string()),
        }
    }
}

/// Log source replaying [`ScriptedLog`]s and counting reader lifetimes.
#[derive(Debug, Default)]
pub struct ScriptedLogSource {
    logs: Mutex<HashMap<String, ScriptedLog>>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    last_range: Mutex<Option<TimeRange>>,
    last_since: Mutex<Option<ResumeMarker>>,
}

impl ScriptedLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: &str, log: ScriptedLog) {
        self.logs.lock().unwrap().insert(id.to_string(), log);
    }

    /// Readers handed out so far.
    pub fn opened_readers(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Readers dropped so far.
    pub fn closed_readers(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn last_range(&self) -> Option<TimeRange> {
        *self.last_range.lock().unwrap()
    }

    pub fn last_since(&self) -> Option<ResumeMarker> {
        self.last_since.lock().unwrap().clone()
    }

    fn script(&self, process: &ProcessHandle) -> Result<ScriptedLog, LogSourceError> {
        let log = self
            .logs
            .lock()
            .unwrap()
            .get(&process.id)
            .cloned()
            .ok_or_else(|| LogSourceError::Unavailable(format!("no output for {}", process.id)))?;

        match &log.open_error {
            Some(reason) => Err(LogSourceError::Unavailable(reason.clone())),
            None => Ok(log),
        }
    }

    fn reader(&self, lines: &[String], end: ReaderEnd) -> LogReader {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Box::pin(ScriptedReader {
            data: lines.concat().into_bytes(),
            pos: 0,
            end,
            closed: Arc::clone(&self.closed),
        })
    }
}

#[async_trait]
impl LogSource for ScriptedLogSource {
    async fn tail(
        &self,
        process: &ProcessHandle,
        tail: usize,
        since: Option<&ResumeMarker>,
    ) -> Result<LogReader, LogSourceError> {
        let log = self.script(process)?;
        *self.last_since.lock().unwrap() = since.cloned();

        let selected: Vec<String> = match since.and_then(ResumeMarker::timestamp) {
            Some(marker) => {
                let mut started = false;
                log.lines
                    .iter()
                    .filter(|line| {
                        if let Some(ts) = LogEvent::parse(line.as_bytes()).timestamp() {
                            started |= ts >= marker;
                        }
                        started
                    })
                    .cloned()
                    .collect()
            }
            None => {
                let skip = log.lines.len().saturating_sub(tail);
                log.lines[skip..].to_vec()
            }
        };

        if selected.is_empty() && log.end == ReaderEnd::Eof {
            return Err(LogSourceError::Exhausted);
        }
        Ok(self.reader(&selected, log.end))
    }

    async fn range(
        &self,
        process: &ProcessHandle,
        range: TimeRange,
    ) -> Result<LogReader, LogSourceError> {
        let log = self.script(process)?;
        *self.last_range.lock().unwrap() = Some(range);

        let mut inside = false;
        let selected: Vec<String> = log
            .lines
            .iter()
            .filter(|line| {
                if let Some(ts) = LogEvent::parse(line.as_bytes()).timestamp() {
                    let ts = ts.with_timezone(&Utc);
                    inside = ts >= range.from && ts <= range.to;
                }
                inside
            })
            .cloned()
            .collect();

        if selected.is_empty() {
            return Err(LogSourceError::Exhausted);
        }
        Ok(self.reader(&selected, ReaderEnd::Eof))
    }
}

struct ScriptedReader {
    data: Vec<u8>,
    pos: usize,
    end: ReaderEnd,
    closed: Arc<AtomicUsize>,
}

impl AsyncRead for ScriptedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.pos < this.data.len() {
            let n = buf.remaining().min(this.data.len() - this.pos);
            buf.put_slice(&this.data[this.pos..this.pos + n]);
            this.pos += n;
            return Poll::Ready(Ok(()));
        }

        match this.end {
            ReaderEnd::Eof => Poll::Ready(Ok(())),
            ReaderEnd::Hang => Poll::Pending,
            ReaderEnd::Fail(kind) => {
                Poll::Ready(Err(io::Error::new(kind, "scripted read failure")))
            }
        }
    }
}

impl Drop for ScriptedReader {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Observer forwarding every report to a channel.
#[derive(Debug, Clone)]
pub struct RecordingObserver {
    tx: mpsc::UnboundedSender<SessionReport>,
}

impl RecordingObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionObserver for RecordingObserver {
    fn session_ended(&self, report: &SessionReport) {
        let _ = self.tx.send(report.clone());
    }
}
