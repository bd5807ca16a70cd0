//! Log handlers - resumable event stream, range export and archive download.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use tailcast_core::{ResumeMarker, StreamOpen, TimeRange};
use tailcast_runtime::{ArchiveName, gzip_stream};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::HttpError;
use crate::sse::{SessionBody, StreamSession, event_stream};
use crate::state::AppState;

/// Standard reconnect header sent by `EventSource` clients.
const LAST_EVENT_ID: &str = "last-event-id";

/// Query parameters of the stream endpoint.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub id: Option<String>,
    /// Overrides the `Last-Event-ID` header when non-empty.
    #[serde(rename = "lastEventId")]
    pub last_event_id: Option<String>,
}

/// Stream the output of a process as server-sent events.
///
/// Reconnecting clients resume after the event they last saw, identified by
/// the `lastEventId` query parameter or the `Last-Event-ID` header.
pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let header_marker = headers
        .get(LAST_EVENT_ID)
        .and_then(|value| value.to_str().ok());
    let marker = ResumeMarker::from_request(query.last_event_id.as_deref(), header_marker);

    let opened = state
        .logs
        .open_stream(
            query.id.as_deref().unwrap_or_default(),
            state.stream.tail_size,
            marker.as_ref(),
        )
        .await?;

    let body = match opened {
        StreamOpen::Live { process, reader } => {
            StreamSession::new(process, marker, state.stream.clone(), state.observer.clone())
                .spawn(reader)
        }
        StreamOpen::Finished { process } => {
            debug!(process_id = %process.id, "container stopped before streaming");
            SessionBody::stopped()
        }
    };

    Ok(event_stream(body))
}

/// Query parameters of the range endpoint.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Copy the output logged between `from` and `to` verbatim.
pub async fn range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Response, HttpError> {
    let process = state
        .logs
        .resolve(query.id.as_deref().unwrap_or_default())
        .await?;
    let range = state
        .range_params
        .parse(query.from.as_deref(), query.to.as_deref())?;
    let reader = state.logs.read_range(&process, range).await?;

    Ok((
        [(CONTENT_TYPE, "text/plain; charset=UTF-8")],
        Body::from_stream(ReaderStream::new(reader)),
    )
        .into_response())
}

/// Query parameters of the download endpoint.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub id: Option<String>,
}

/// Download the whole lifetime of a process as a gzip archive.
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, HttpError> {
    let now = Utc::now();
    let process = state
        .logs
        .resolve(query.id.as_deref().unwrap_or_default())
        .await
        .map_err(|e| HttpError::BadRequest(e.to_string()))?;

    let reader = state
        .logs
        .read_range(&process, TimeRange::lifetime(process.created_at, now))
        .await?;

    let name = ArchiveName::new(&process.name, now);
    Ok((
        [
            (CONTENT_TYPE, "application/gzip".to_string()),
            (CONTENT_DISPOSITION, name.content_disposition()),
        ],
        Body::from_stream(gzip_stream(reader, &name)),
    )
        .into_response())
}
