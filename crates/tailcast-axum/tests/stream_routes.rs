//! Integration tests for the resumable event stream.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};

use common::{STOPPED, T1, T2, app, body_text, data_frame, get, header, hello_world, send};
use tailcast_axum::{ServerConfig, StreamConfig};
use tailcast_core::testing::{ReaderEnd, ScriptedLog, ScriptedLogSource};

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let response = get(app(hello_world(ReaderEnd::Eof), &ServerConfig::default()), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn cors_allows_only_configured_origins() {
    let config = ServerConfig::default().with_allowed_origins(vec!["http://dash.local".into()]);

    let request = Request::builder()
        .uri("/api/logs/stream?id=abc123")
        .header("Origin", "http://dash.local")
        .body(Body::empty())
        .unwrap();
    let response = send(app(hello_world(ReaderEnd::Eof), &config), request).await;
    assert_eq!(header(&response, "access-control-allow-origin"), "http://dash.local");

    let request = Request::builder()
        .uri("/api/logs/stream?id=abc123")
        .header("Origin", "http://elsewhere.local")
        .body(Body::empty())
        .unwrap();
    let response = send(app(hello_world(ReaderEnd::Eof), &config), request).await;
    assert_eq!(header(&response, "access-control-allow-origin"), "");
}

#[tokio::test]
async fn stream_sets_event_stream_headers() {
    let response = get(
        app(hello_world(ReaderEnd::Eof), &ServerConfig::default()),
        "/api/logs/stream?id=abc123",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "text/event-stream");
    assert!(header(&response, "cache-control").contains("no-cache"));
    assert!(header(&response, "cache-control").contains("no-transform"));
    assert_eq!(header(&response, "x-accel-buffering"), "no");
}

#[tokio::test]
async fn stream_from_start_then_terminal_frame() {
    let source = hello_world(ReaderEnd::Eof);
    let response = get(app(source.clone(), &ServerConfig::default()), "/api/logs/stream?id=abc123").await;

    let expected = [data_frame(T1, "hello"), data_frame(T2, "world"), STOPPED.to_string()].concat();
    assert_eq!(body_text(response).await, expected);
    assert_eq!(source.closed_readers(), 1);
}

#[tokio::test]
async fn resume_with_query_marker_skips_delivered_events() {
    let uri = format!("/api/logs/stream?id=abc123&lastEventId={T1}");
    let response = get(app(hello_world(ReaderEnd::Eof), &ServerConfig::default()), &uri).await;

    assert_eq!(
        body_text(response).await,
        [data_frame(T2, "world"), STOPPED.to_string()].concat()
    );
}

#[tokio::test]
async fn resume_with_last_event_id_header() {
    let request = Request::builder()
        .uri("/api/logs/stream?id=abc123")
        .header("Last-Event-ID", T1)
        .body(Body::empty())
        .unwrap();
    let source = hello_world(ReaderEnd::Eof);
    let response = send(app(source.clone(), &ServerConfig::default()), request).await;

    assert_eq!(
        body_text(response).await,
        [data_frame(T2, "world"), STOPPED.to_string()].concat()
    );
    assert_eq!(source.last_since().unwrap().as_str(), T1);
}

#[tokio::test]
async fn query_marker_wins_over_header() {
    let request = Request::builder()
        .uri(format!("/api/logs/stream?id=abc123&lastEventId={T1}"))
        .header("Last-Event-ID", T2)
        .body(Body::empty())
        .unwrap();
    let source = hello_world(ReaderEnd::Eof);
    let response = send(app(source.clone(), &ServerConfig::default()), request).await;

    assert!(body_text(response).await.starts_with(&data_frame(T2, "world")));
    assert_eq!(source.last_since().unwrap().as_str(), T1);
}

#[tokio::test]
async fn stopped_process_yields_only_terminal_frame() {
    let source = Arc::new(ScriptedLogSource::new());
    source.insert("abc123", ScriptedLog::new(Vec::<String>::new(), ReaderEnd::Eof));

    let response = get(app(source.clone(), &ServerConfig::default()), "/api/logs/stream?id=abc123").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "text/event-stream");
    assert_eq!(body_text(response).await, STOPPED);
    assert_eq!(source.opened_readers(), 0);
}

#[tokio::test]
async fn stream_respects_tail_size() {
    let config = ServerConfig::default().with_stream(StreamConfig::default().with_tail_size(1));

    let response = get(app(hello_world(ReaderEnd::Eof), &config), "/api/logs/stream?id=abc123").await;
    assert_eq!(
        body_text(response).await,
        [data_frame(T2, "world"), STOPPED.to_string()].concat()
    );
}

#[tokio::test]
async fn missing_id_is_bad_request() {
    let response = get(
        app(hello_world(ReaderEnd::Eof), &ServerConfig::default()),
        "/api/logs/stream",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("id"));
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let response = get(
        app(hello_world(ReaderEnd::Eof), &ServerConfig::default()),
        "/api/logs/stream?id=nope",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn open_failure_is_server_error_without_frames() {
    let source = Arc::new(ScriptedLogSource::new());
    source.insert("abc123", ScriptedLog::unavailable("daemon unreachable"));

    let response = get(app(source, &ServerConfig::default()), "/api/logs/stream?id=abc123").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(header(&response, "content-type").starts_with("application/json"));

    let text = body_text(response).await;
    assert!(text.contains("daemon unreachable"));
    assert!(!text.contains("data:"));
}

#[tokio::test]
async fn mid_stream_failure_ends_without_terminal_frame() {
    let source = hello_world(ReaderEnd::Fail(std::io::ErrorKind::BrokenPipe));
    let response = get(app(source.clone(), &ServerConfig::default()), "/api/logs/stream?id=abc123").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        [data_frame(T1, "hello"), data_frame(T2, "world")].concat()
    );
    assert_eq!(source.closed_readers(), 1);
}
