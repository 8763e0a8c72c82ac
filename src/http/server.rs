//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router that hands every request to the pipeline
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Stop accepting on shutdown and drain in-flight requests

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::http::middleware::{BodyParser, Echo};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::pipeline::{Chain, Pipeline};

/// HTTP front end for a [`Pipeline`].
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a server running the default chain: body parser, then echo.
    pub fn new(config: AppConfig) -> Self {
        let chain = Chain::new()
            .with(BodyParser::from_config(&config.body))
            .with(Echo);
        let pipeline = Pipeline::new(chain).with_body_limit(config.body.max_length);
        Self::with_pipeline(config, pipeline)
    }

    /// Create a server running a custom pipeline.
    pub fn with_pipeline(config: AppConfig, pipeline: Pipeline) -> Self {
        let router = Self::build_router(&config, pipeline);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, pipeline: Pipeline) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(pipeline)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, e.g. for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_body_length = %self.config.body.max_length,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

async fn dispatch(State(pipeline): State<Pipeline>, request: Request<Body>) -> Response {
    pipeline.handle(request).await
}
