//! Middleware outcome.

use axum::http::StatusCode;

use crate::pipeline::error::PipelineError;

/// What a middleware stage reports back to the chain.
///
/// Returning the signal is the only way a stage hands control on, so every
/// invocation produces exactly one of these.
#[must_use]
#[derive(Debug)]
pub enum Signal {
    /// Continue with the next stage.
    Proceed,
    /// Stop the chain and answer with this status.
    Status(StatusCode),
    /// Stop the chain and route the error to the error handler.
    Error(PipelineError),
}

impl Signal {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Signal::Proceed)
    }

    /// Wrap anything convertible into a pipeline error.
    pub fn error(error: impl Into<PipelineError>) -> Self {
        Signal::Error(error.into())
    }
}

impl From<StatusCode> for Signal {
    fn from(status: StatusCode) -> Self {
        Signal::Status(status)
    }
}

impl From<PipelineError> for Signal {
    fn from(error: PipelineError) -> Self {
        Signal::Error(error)
    }
}
