//! Axum server bootstrap - the composition root.
//!
//! The process registry and the log source are supplied by the embedder;
//! everything else the web adapter needs is wired together here.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tailcast_core::{LogService, LogSource, ProcessRegistry, RangeParamPolicy, SessionObserver};
use tailcast_runtime::RuntimeDiagnostics;

/// Lines replayed to a new client before following live output.
pub const DEFAULT_TAIL_SIZE: usize = 300;
/// Interval between keepalive pings on an idle stream.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);
/// Frames queued per session before the log reader is paused.
pub const DEFAULT_FRAME_BUFFER: usize = 64;

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Per-session settings of the resumable stream.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub tail_size: usize,
    pub keepalive_interval: Duration,
    pub frame_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tail_size: DEFAULT_TAIL_SIZE,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            frame_buffer: DEFAULT_FRAME_BUFFER,
        }
    }
}

impl StreamConfig {
    #[must_use]
    pub const fn with_tail_size(mut self, tail_size: usize) -> Self {
        self.tail_size = tail_size;
        self
    }

    #[must_use]
    pub const fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_frame_buffer(mut self, frames: usize) -> Self {
        self.frame_buffer = frames;
        self
    }
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,
    /// CORS configuration.
    pub cors: CorsConfig,
    /// Resumable stream settings.
    pub stream: StreamConfig,
    /// How `from`/`to` parameters of range exports are parsed.
    pub range_params: RangeParamPolicy,
}

impl ServerConfig {
    /// Create config with default values.
    pub fn with_defaults() -> Self {
        Self {
            port: 8080,
            cors: CorsConfig::default(),
            stream: StreamConfig::default(),
            range_params: RangeParamPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_stream(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    #[must_use]
    pub const fn with_range_params(mut self, policy: RangeParamPolicy) -> Self {
        self.range_params = policy;
        self
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Application context for the Axum adapter.
pub struct AxumContext {
    /// Process resolution and log stream opening.
    pub logs: LogService,
    /// Receives a report when each stream session ends.
    pub observer: Arc<dyn SessionObserver>,
    pub stream: StreamConfig,
    pub range_params: RangeParamPolicy,
}

impl AxumContext {
    /// Replace the session observer (e.g. with a no-op in tests).
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// Wire the collaborators into an adapter context.
pub fn bootstrap(
    config: &ServerConfig,
    registry: Arc<dyn ProcessRegistry>,
    source: Arc<dyn LogSource>,
) -> AxumContext {
    tracing::debug!(
        tail_size = config.stream.tail_size,
        keepalive = ?config.stream.keepalive_interval,
        frame_buffer = config.stream.frame_buffer,
        range_params = ?config.range_params,
        "Axum bootstrap"
    );

    AxumContext {
        logs: LogService::new(registry, source),
        observer: Arc::new(RuntimeDiagnostics::new()),
        stream: config.stream.clone(),
        range_params: config.range_params,
    }
}

/// Start the web server on the configured port.
pub async fn start_server(
    config: ServerConfig,
    registry: Arc<dyn ProcessRegistry>,
    source: Arc<dyn LogSource>,
) -> Result<()> {
    use tokio::net::TcpListener;
    use tracing::info;

    let ctx = bootstrap(&config, registry, source);
    let app = crate::routes::create_router(ctx, &config.cors);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("tailcast listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
