//! Resumable stream sessions.
//!
//! A session runs two tasks for the lifetime of one connection:
//!
//! - the framing loop, which reads the log line by line and turns each line
//!   into a frame;
//! - the keepalive ticker, which emits a ping frame on a fixed interval.
//!
//! Both push whole frames into one bounded queue. The response body is the
//! only consumer of that queue, so frames are never interleaved and a slow
//! client pushes back on the log reader instead of growing memory.
//!
//! Dropping the response body (client disconnect) cancels the session token
//! through a drop guard, which wakes and stops both tasks.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_core::Stream;
use tailcast_core::{
    LogEvent, LogReader, ProcessHandle, ResumeFilter, ResumeMarker, SessionObserver,
    SessionOutcome, SessionReport,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error};

use super::frame::Frame;
use crate::bootstrap::StreamConfig;

const MIN_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(10);

/// One open event-stream connection.
pub struct StreamSession {
    process: ProcessHandle,
    marker: Option<ResumeMarker>,
    config: StreamConfig,
    observer: Arc<dyn SessionObserver>,
}

impl StreamSession {
    pub fn new(
        process: ProcessHandle,
        marker: Option<ResumeMarker>,
        config: StreamConfig,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            process,
            marker,
            config,
            observer,
        }
    }

    /// Start the framing loop and the keepalive ticker over `reader`.
    ///
    /// The returned body yields frames until the session ends. Must be called
    /// from within a tokio runtime.
    pub fn spawn(self, reader: LogReader) -> SessionBody {
        let (tx, rx) = mpsc::channel(self.config.frame_buffer.max(1));
        let cancel = CancellationToken::new();

        let keepalive = tokio::spawn(keepalive(
            tx.clone(),
            cancel.clone(),
            self.config.keepalive_interval.max(MIN_KEEPALIVE_INTERVAL),
        ));
        tokio::spawn(self.run(reader, tx, cancel.clone(), keepalive));

        SessionBody::new(rx, Some(cancel.drop_guard()))
    }

    async fn run(
        self,
        reader: LogReader,
        tx: mpsc::Sender<Bytes>,
        cancel: CancellationToken,
        keepalive: JoinHandle<()>,
    ) {
        let started = Instant::now();
        let process_id = self.process.id.as_str();
        debug!(
            process_id,
            resume_from = self.marker.as_ref().map(ResumeMarker::as_str),
            "streaming started"
        );

        let (outcome, mut frames_sent) = pump(reader, &tx, &cancel, self.marker.as_ref()).await;

        // No ping may follow the terminal frame.
        cancel.cancel();
        let _ = keepalive.await;

        if outcome == SessionOutcome::Exhausted
            && tx.send(Frame::Stopped.encode()).await.is_ok()
        {
            frames_sent += 1;
        }
        drop(tx);

        if outcome.is_normal() {
            debug!(process_id, outcome = ?outcome, "session closed");
        } else {
            error!(process_id, outcome = ?outcome, "unknown error while streaming");
        }

        self.observer.session_ended(&SessionReport {
            process_id: self.process.id.clone(),
            outcome,
            frames_sent,
            elapsed: started.elapsed(),
        });
    }
}

/// Framing loop. Owns the reader, which is dropped on every return path.
async fn pump(
    reader: LogReader,
    tx: &mpsc::Sender<Bytes>,
    cancel: &CancellationToken,
    marker: Option<&ResumeMarker>,
) -> (SessionOutcome, u64) {
    let mut reader = BufReader::new(reader);
    let mut filter = ResumeFilter::new(marker);
    let mut line: Vec<u8> = Vec::with_capacity(1024);
    let mut sent = 0;

    loop {
        line.clear();
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => return (SessionOutcome::Cancelled, sent),
            read = reader.read_until(b'\n', &mut line) => read,
        };

        match read {
            Ok(0) => return (SessionOutcome::Exhausted, sent),
            Ok(_) => {
                let event = LogEvent::parse(&line);
                if !filter.admit(&event) {
                    continue;
                }
                if !deliver(tx, cancel, Frame::Log(event).encode()).await {
                    return (SessionOutcome::Cancelled, sent);
                }
                sent += 1;
            }
            // A read interrupted by cancellation is part of the disconnect.
            Err(_) if cancel.is_cancelled() => return (SessionOutcome::Cancelled, sent),
            Err(e) => return (SessionOutcome::Failed(e.to_string()), sent),
        }
    }
}

async fn keepalive(tx: mpsc::Sender<Bytes>, cancel: CancellationToken, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if !deliver(&tx, &cancel, Frame::Ping.encode()).await {
                    break;
                }
            }
        }
    }
}

/// Queue one frame. `false` once the session is cancelled or the body is gone.
async fn deliver(tx: &mpsc::Sender<Bytes>, cancel: &CancellationToken, frame: Bytes) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        sent = tx.send(frame) => sent.is_ok(),
    }
}

/// Response body draining a session's frame queue.
#[derive(Debug)]
pub struct SessionBody {
    frames: ReceiverStream<Bytes>,
    _cancel_on_drop: Option<DropGuard>,
}

impl SessionBody {
    fn new(rx: mpsc::Receiver<Bytes>, cancel_on_drop: Option<DropGuard>) -> Self {
        Self {
            frames: ReceiverStream::new(rx),
            _cancel_on_drop: cancel_on_drop,
        }
    }

    /// Body for a process that had already stopped: one terminal frame.
    pub fn stopped() -> Self {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(Frame::Stopped.encode());
        Self::new(rx, None)
    }
}

impl Stream for SessionBody {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().frames)
            .poll_next(cx)
            .map(|frame| frame.map(Ok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::frame::{PING, STOPPED};
    use futures_util::StreamExt;
    use std::io;
    use tailcast_core::LogSource;
    use tailcast_core::testing::{
        ReaderEnd, RecordingObserver, ScriptedLog, ScriptedLogSource, process,
    };
    use tokio::sync::mpsc::UnboundedReceiver;

    const T1: &str = "2024-01-01T00:00:00.000000001Z";
    const T2: &str = "2024-01-01T00:00:00.000000002Z";

    struct Harness {
        source: Arc<ScriptedLogSource>,
        reports: UnboundedReceiver<SessionReport>,
        body: SessionBody,
    }

    async fn start(log: ScriptedLog, marker: Option<&str>, config: StreamConfig) -> Harness {
        let source = Arc::new(ScriptedLogSource::new());
        source.insert("abc123", log);
        let handle = process("abc123", "web");
        let marker = marker.and_then(ResumeMarker::new);

        let reader = source
            .tail(&handle, config.tail_size, marker.as_ref())
            .await
            .unwrap();
        let (observer, reports) = RecordingObserver::new();
        let body = StreamSession::new(handle, marker, config, Arc::new(observer)).spawn(reader);

        Harness {
            source,
            reports,
            body,
        }
    }

    async fn drain(body: SessionBody) -> Vec<Bytes> {
        body.map(|frame| frame.unwrap()).collect().await
    }

    fn data(ts: &str, text: &str) -> Bytes {
        Bytes::from(format!("data: {ts} {text}\nid: {ts}\n\n"))
    }

    fn two_lines(end: ReaderEnd) -> ScriptedLog {
        ScriptedLog::new([format!("{T1} hello"), format!("{T2} world")], end)
    }

    #[tokio::test]
    async fn streams_lines_then_terminal_frame() {
        let mut h = start(two_lines(ReaderEnd::Eof), None, StreamConfig::default()).await;
        let frames = drain(h.body).await;

        assert_eq!(
            frames,
            vec![data(T1, "hello"), data(T2, "world"), Bytes::from_static(STOPPED)]
        );

        let report = h.reports.recv().await.unwrap();
        assert_eq!(report.outcome, SessionOutcome::Exhausted);
        assert_eq!(report.frames_sent, 3);
        assert_eq!(h.source.closed_readers(), 1);
    }

    #[tokio::test]
    async fn resume_skips_delivered_events() {
        let h = start(two_lines(ReaderEnd::Eof), Some(T1), StreamConfig::default()).await;
        assert_eq!(h.source.last_since().unwrap().as_str(), T1);

        let frames = drain(h.body).await;
        assert_eq!(frames, vec![data(T2, "world"), Bytes::from_static(STOPPED)]);
    }

    #[tokio::test]
    async fn untimestamped_lines_have_no_id() {
        let log = ScriptedLog::raw("starting up\nlast words", ReaderEnd::Eof);
        let h = start(log, None, StreamConfig::default()).await;

        let frames = drain(h.body).await;
        assert_eq!(
            frames,
            vec![
                Bytes::from_static(b"data: starting up\n\n"),
                Bytes::from_static(b"data: last words\n\n"),
                Bytes::from_static(STOPPED),
            ]
        );
    }

    #[tokio::test]
    async fn read_failure_closes_without_terminal_frame() {
        let log = two_lines(ReaderEnd::Fail(io::ErrorKind::ConnectionReset));
        let mut h = start(log, None, StreamConfig::default()).await;

        let frames = drain(h.body).await;
        assert_eq!(frames, vec![data(T1, "hello"), data(T2, "world")]);

        let report = h.reports.recv().await.unwrap();
        assert!(matches!(report.outcome, SessionOutcome::Failed(_)));
        assert_eq!(h.source.closed_readers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_frames_are_whole_and_interleaved() {
        let config = StreamConfig::default().with_keepalive_interval(Duration::from_secs(5));
        let mut h = start(two_lines(ReaderEnd::Hang), None, config).await;

        let mut frames = Vec::new();
        for _ in 0..4 {
            frames.push(h.body.next().await.unwrap().unwrap());
        }

        assert_eq!(
            frames,
            vec![
                data(T1, "hello"),
                data(T2, "world"),
                Bytes::from_static(PING),
                Bytes::from_static(PING),
            ]
        );

        drop(h.body);
        let report = h.reports.recv().await.unwrap();
        assert_eq!(report.outcome, SessionOutcome::Cancelled);
        assert_eq!(report.frames_sent, 2);
        assert_eq!(h.source.closed_readers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_ping_waits_a_full_interval() {
        let config = StreamConfig::default().with_keepalive_interval(Duration::from_secs(5));
        let mut h = start(ScriptedLog::new(Vec::<String>::new(), ReaderEnd::Hang), None, config).await;

        let begin = Instant::now();
        let frame = h.body.next().await.unwrap().unwrap();
        assert_eq!(frame, Bytes::from_static(PING));
        assert!(begin.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn no_ping_follows_the_terminal_frame() {
        let lines: Vec<String> = (0..200)
            .map(|i| format!("2024-01-01T00:00:00.{i:09}Z line {i}"))
            .collect();
        let config = StreamConfig::default()
            .with_keepalive_interval(Duration::from_millis(10))
            .with_frame_buffer(1);
        let mut h = start(ScriptedLog::new(lines, ReaderEnd::Eof), None, config).await;

        let mut frames = Vec::new();
        while let Some(frame) = h.body.next().await {
            frames.push(frame.unwrap());
            tokio::time::sleep(Duration::from_millis(3)).await;
        }

        assert_eq!(frames.last(), Some(&Bytes::from_static(STOPPED)));
        assert!(frames.iter().any(|f| f == &Bytes::from_static(PING)));
        assert_eq!(
            frames.iter().filter(|f| f.starts_with(b"data: ")).count(),
            200
        );

        let report = h.reports.recv().await.unwrap();
        assert_eq!(report.outcome, SessionOutcome::Exhausted);
        assert_eq!(report.frames_sent, 201);
    }

    #[tokio::test]
    async fn disconnect_closes_reader_once() {
        let mut h = start(two_lines(ReaderEnd::Hang), None, StreamConfig::default()).await;
        drop(h.body);

        let report = h.reports.recv().await.unwrap();
        assert_eq!(report.outcome, SessionOutcome::Cancelled);
        assert_eq!(h.source.opened_readers(), 1);
        assert_eq!(h.source.closed_readers(), 1);
    }

    #[tokio::test]
    async fn bounded_queue_preserves_order() {
        let lines: Vec<String> = (1..=20)
            .map(|i| format!("2024-01-01T00:00:{i:02}Z line {i}"))
            .collect();
        let config = StreamConfig::default().with_frame_buffer(1);
        let h = start(ScriptedLog::new(lines, ReaderEnd::Eof), None, config).await;

        let frames = drain(h.body).await;
        assert_eq!(frames.len(), 21);
        for (i, frame) in frames.iter().take(20).enumerate() {
            let expected = format!("line {}\n", i + 1);
            assert!(std::str::from_utf8(frame).unwrap().contains(&expected));
        }
    }

    #[tokio::test]
    async fn stopped_body_is_a_single_terminal_frame() {
        let frames = drain(SessionBody::stopped()).await;
        assert_eq!(frames, vec![Bytes::from_static(STOPPED)]);
    }
}
