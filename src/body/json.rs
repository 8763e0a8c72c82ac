//! JSON body decoding.
//!
//! Only documents whose first non-whitespace byte opens an object or an
//! array are attempted. Anything else is rejected without invoking the
//! parser, which lets callers answer 400 for "not JSON at all" while still
//! surfacing real syntax errors to error-handling middleware.

use serde_json::Value;

/// Why a buffer declared as JSON was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum JsonRejection {
    /// Zero-length or whitespace-only buffer.
    #[error("JSON body is empty")]
    Empty,
    /// First significant byte is neither `{` nor `[`.
    #[error("JSON body must start with `{{` or `[`, found `{}`", .0.escape_ascii())]
    UnexpectedStart(u8),
    /// Looked like JSON but failed to parse.
    #[error("malformed JSON body: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode `buffer` into a JSON object or array.
pub fn decode(buffer: &[u8]) -> Result<Value, JsonRejection> {
    let start = buffer
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or(JsonRejection::Empty)?;

    match buffer[start] {
        b'{' | b'[' => Ok(serde_json::from_slice(&buffer[start..])?),
        other => Err(JsonRejection::UnexpectedStart(other)),
    }
}
