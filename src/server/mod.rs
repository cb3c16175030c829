//! HTTP side: static assets, the `update_data` push channel and `/predict`.

pub mod feed;
pub mod generator;
mod handlers;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::config::ServerConfig;
use crate::predict::ViscosityModel;

pub use feed::Feed;
pub use generator::{GeneratedSample, SampleGenerator};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Push channel path on the server origin.
pub const STREAM_PATH: &str = "/ws";
pub const PREDICT_PATH: &str = "/predict";

#[derive(Clone)]
pub(crate) struct AppState {
    feed: Feed,
    model: ViscosityModel,
    /// Fired when the server stops; open streams close on it.
    stopping: CancellationToken,
}

/// A server whose listener is bound but which is not yet serving.
pub struct BoundServer {
    listener: TcpListener,
    router: Router,
    feed: Feed,
    stopping: CancellationToken,
    config: ServerConfig,
}

/// Binds `0.0.0.0:<port>`.
pub async fn bind(config: ServerConfig) -> Result<BoundServer> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    bind_to(addr, config).await
}

pub async fn bind_to(addr: SocketAddr, config: ServerConfig) -> Result<BoundServer> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let feed = Feed::new(
        SampleGenerator::new(config.model),
        config.window_size,
        config.send_full_window,
    );
    let stopping = CancellationToken::new();
    let router = router(&config, feed.clone(), stopping.clone())?;

    Ok(BoundServer {
        listener,
        router,
        feed,
        stopping,
        config,
    })
}

fn router(config: &ServerConfig, feed: Feed, stopping: CancellationToken) -> Result<Router> {
    let state = AppState {
        feed,
        model: config.model,
        stopping,
    };

    let mut router = Router::new()
        .route(STREAM_PATH, get(handlers::stream_handler))
        .route(PREDICT_PATH, post(handlers::predict_handler))
        .fallback_service(ServeDir::new(&config.assets_dir))
        .with_state(state);

    if let Some(origin) = &config.allowed_origin {
        let origin: HeaderValue = origin
            .parse()
            .with_context(|| format!("invalid CORS origin {origin}"))?;
        router = router.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        );
    }

    Ok(router)
}

impl BoundServer {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("listener has no local address")
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    /// Seeds the window, starts the ticker and serves until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.local_addr()?;
        let interval = self.config.tick_interval();

        self.feed.seed(interval).await;
        let ticker = self.feed.spawn_ticker(interval, self.stopping.clone());

        log_info!(
            "Server running on port {} (assets from {})",
            addr.port(),
            self.config.assets_dir.display()
        );

        let stopping = self.stopping.clone();
        let served = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                stopping.cancel();
            })
            .await
            .context("server stopped unexpectedly");

        self.stopping.cancel();
        ticker.await.context("feed ticker failed to join")?;
        served
    }
}

/// Binds on the configured port and serves until `shutdown` fires.
pub async fn serve(config: ServerConfig, shutdown: CancellationToken) -> Result<()> {
    bind(config).await?.run(shutdown).await
}
