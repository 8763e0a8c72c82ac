//! Request body ingestion subsystem.
//!
//! # Data Flow
//! ```text
//! body chunks (transport)
//!     → accumulator.rs (buffer, enforce BodyLimit)
//!     → content_type.rs (pick decoder from Content-Type)
//!     → json.rs | form.rs | multipart.rs
//!     → ParsedBody (+ Attachments for multipart)
//!     → stored on the Exchange for later middleware
//! ```
//!
//! # Design Decisions
//! - Bodies are buffered before decoding; the limit bounds memory use
//! - Decoders are plain functions over a finished buffer
//! - Uploaded files live in transient storage owned by `Attachments`

pub mod accumulator;
pub mod attachment;
pub mod content_type;
pub mod form;
pub mod json;
pub mod limit;
pub mod multipart;

use std::collections::HashMap;

use serde::Serialize;

pub use accumulator::{accumulate, AccumulateError, Accumulator, LimitExceeded};
pub use attachment::{Attachment, Attachments};
pub use content_type::BodyKind;
pub use limit::BodyLimit;

/// A decoded request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParsedBody {
    /// `application/json` object or array.
    Json(serde_json::Value),
    /// Url-encoded form or multipart attributes, first value per key.
    Form(HashMap<String, String>),
}

impl ParsedBody {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ParsedBody::Json(value) => Some(value),
            ParsedBody::Form(_) => None,
        }
    }

    pub fn as_form(&self) -> Option<&HashMap<String, String>> {
        match self {
            ParsedBody::Form(fields) => Some(fields),
            ParsedBody::Json(_) => None,
        }
    }
}

/// A body that looked decodable but could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),
    #[error("failed to spool upload for field `{field}`: {source}")]
    Spool {
        field: String,
        #[source]
        source: std::io::Error,
    },
}

impl DecodeError {
    /// True when the client sent bytes that do not parse, as opposed to a
    /// server-side failure while storing them.
    pub fn is_client_error(&self) -> bool {
        match self {
            DecodeError::Json(e) => !matches!(e.classify(), serde_json::error::Category::Io),
            DecodeError::Multipart(_) => true,
            DecodeError::Spool { .. } => false,
        }
    }
}
