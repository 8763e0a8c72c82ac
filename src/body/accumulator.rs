//! Chunk accumulation with a byte ceiling.
//!
//! # Responsibilities
//! - Concatenate body chunks in arrival order
//! - Enforce the configured `BodyLimit` while streaming
//! - Stop reading the source on the first violation
//!
//! # Design Decisions
//! - One `Accumulator` per request, never shared
//! - A declared `Content-Length` above the limit is rejected before any chunk is read
//! - Pre-allocation from `Content-Length` is capped so a lying header cannot reserve memory

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use crate::body::limit::BodyLimit;

/// Upper bound for the initial buffer reservation.
const MAX_INITIAL_CAPACITY: usize = 64 * 1024;

/// The body would grow beyond the configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request body of at least {attempted} bytes exceeds limit of {limit}")]
pub struct LimitExceeded {
    /// Length the body would have reached.
    pub attempted: u64,
    /// The configured ceiling.
    pub limit: u64,
}

/// Failure while draining a chunk source.
#[derive(Debug, thiserror::Error)]
pub enum AccumulateError {
    #[error(transparent)]
    LimitExceeded(#[from] LimitExceeded),
    #[error("failed to read request body: {0}")]
    Transport(#[source] axum::Error),
}

/// Per-request accumulation buffer.
#[derive(Debug)]
pub struct Accumulator {
    buffer: BytesMut,
    limit: BodyLimit,
}

impl Accumulator {
    /// Create an empty accumulator.
    pub fn new(limit: BodyLimit) -> Self {
        Self {
            buffer: BytesMut::new(),
            limit,
        }
    }

    /// Create an accumulator pre-sized from a declared `Content-Length`.
    pub fn with_capacity_hint(limit: BodyLimit, content_length: Option<u64>) -> Self {
        let mut hint = content_length.unwrap_or(0);
        if let Some(max) = limit.max() {
            hint = hint.min(max);
        }
        let capacity = usize::try_from(hint)
            .unwrap_or(MAX_INITIAL_CAPACITY)
            .min(MAX_INITIAL_CAPACITY);
        Self {
            buffer: BytesMut::with_capacity(capacity),
            limit,
        }
    }

    /// Append a chunk, or refuse it when the buffer would exceed the limit.
    ///
    /// A refused chunk leaves the buffer untouched.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), LimitExceeded> {
        let attempted = self.buffer.len() as u64 + chunk.len() as u64;
        if let Some(limit) = self.limit.max() {
            if attempted > limit {
                return Err(LimitExceeded { attempted, limit });
            }
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// Bytes buffered so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Hand out the completed buffer.
    pub fn finish(self) -> Bytes {
        self.buffer.freeze()
    }
}

/// Drain `source` into one contiguous buffer.
///
/// The source is dropped as soon as the limit is violated, so a client that
/// keeps streaming an oversized body is not read any further.
pub async fn accumulate(
    source: Body,
    limit: BodyLimit,
    content_length: Option<u64>,
) -> Result<Bytes, AccumulateError> {
    if let (Some(declared), Some(max)) = (content_length, limit.max()) {
        if declared > max {
            return Err(LimitExceeded {
                attempted: declared,
                limit: max,
            }
            .into());
        }
    }

    let mut acc = Accumulator::with_capacity_hint(limit, content_length);
    let mut chunks = source.into_data_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(AccumulateError::Transport)?;
        acc.push(&chunk)?;
    }
    Ok(acc.finish())
}
