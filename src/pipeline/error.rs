//! Errors carried by `Signal::Error`.

use axum::http::StatusCode;

use crate::body::DecodeError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure that aborts a middleware chain.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The body was declared with a known type but did not decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The transport failed while the body was streaming (client abort, reset).
    #[error("failed to read request body: {0}")]
    Transport(#[source] axum::Error),
    /// A second stage tried to store a decoded body.
    #[error("request body was already decoded")]
    BodyAlreadySet,
    /// Error raised by application middleware.
    #[error("{0}")]
    Middleware(#[source] BoxError),
}

impl PipelineError {
    pub fn middleware(error: impl Into<BoxError>) -> Self {
        PipelineError::Middleware(error.into())
    }

    /// Status an error handler should answer with by default.
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::Decode(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            PipelineError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Transport(_) => StatusCode::BAD_REQUEST,
            PipelineError::BodyAlreadySet | PipelineError::Middleware(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The decode failure, if this error is one.
    pub fn as_decode(&self) -> Option<&DecodeError> {
        match self {
            PipelineError::Decode(e) => Some(e),
            _ => None,
        }
    }
}
