//! Runs a chain for one request and turns the outcome into a response.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use crate::body::BodyLimit;
use crate::pipeline::chain::Chain;
use crate::pipeline::error_handler::{status_response, DefaultErrorHandler, ErrorHandler};
use crate::pipeline::exchange::Exchange;
use crate::pipeline::signal::Signal;

/// A middleware chain plus the error handler and per-request defaults.
#[derive(Clone)]
pub struct Pipeline {
    chain: Arc<Chain>,
    error_handler: Arc<dyn ErrorHandler>,
    body_limit: BodyLimit,
}

impl Pipeline {
    pub fn new(chain: Chain) -> Self {
        Self {
            chain: Arc::new(chain),
            error_handler: Arc::new(DefaultErrorHandler),
            body_limit: BodyLimit::default(),
        }
    }

    pub fn with_error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Body limit every exchange starts with.
    pub fn with_body_limit(mut self, limit: BodyLimit) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn body_limit(&self) -> BodyLimit {
        self.body_limit
    }

    /// Handle one request end to end.
    ///
    /// Attachments produced along the way are released before this returns.
    /// If the future is dropped early they are released when the exchange drops.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let mut exchange = Exchange::new(request, self.body_limit);
        let span = tracing::debug_span!(
            "exchange",
            request_id = exchange.request_id().unwrap_or("unknown"),
            method = %exchange.method(),
            version = ?exchange.version(),
            path = %exchange.uri().path(),
        );

        async move {
            let signal = self.chain.run(&mut exchange).await;
            let response = self.respond(signal, &mut exchange);
            tracing::debug!(status = %response.status(), "Exchange complete");
            exchange.finish();
            response
        }
        .instrument(span)
        .await
    }

    fn respond(&self, signal: Signal, exchange: &mut Exchange) -> Response {
        match signal {
            Signal::Proceed => exchange
                .take_response()
                .unwrap_or_else(|| StatusCode::NOT_FOUND.into_response()),
            Signal::Status(status) => status_response(status),
            Signal::Error(error) => self.error_handler.handle(error, exchange),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("chain", &self.chain)
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}
