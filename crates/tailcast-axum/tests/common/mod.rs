//! Shared fixtures for tailcast-axum integration tests.

// Not every test binary uses every helper
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

use tailcast_axum::bootstrap::{ServerConfig, bootstrap};
use tailcast_axum::routes::create_router;
use tailcast_core::NoopObserver;
use tailcast_core::testing::{ReaderEnd, ScriptedLog, ScriptedLogSource, StaticRegistry, process};

pub const T1: &str = "2024-01-01T00:00:00.000000001Z";
pub const T2: &str = "2024-01-01T00:00:00.000000002Z";

/// Terminal frame of a stream whose process stopped.
pub const STOPPED: &str = "event: container-stopped\ndata: end of stream\n\n";

/// Source with process `abc123` logging `hello` at T1 and `world` at T2.
pub fn hello_world(end: ReaderEnd) -> Arc<ScriptedLogSource> {
    let source = Arc::new(ScriptedLogSource::new());
    source.insert(
        "abc123",
        ScriptedLog::new([format!("{T1} hello"), format!("{T2} world")], end),
    );
    source
}

/// Router serving process `abc123` (named `web`) from `source`.
pub fn app(source: Arc<ScriptedLogSource>, config: &ServerConfig) -> Router {
    let registry = StaticRegistry::new().with_process(process("abc123", "web"));
    let ctx = bootstrap(config, Arc::new(registry), source).with_observer(Arc::new(NoopObserver));
    create_router(ctx, &config.cors)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

pub fn data_frame(ts: &str, text: &str) -> String {
    format!("data: {ts} {text}\nid: {ts}\n\n")
}
