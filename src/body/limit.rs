//! Request body size limit.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default maximum body length (2MB).
pub const DEFAULT_MAX_BODY_LENGTH: u64 = 2 * 1024 * 1024;

/// Maximum number of bytes a request body may occupy once buffered.
///
/// In config files this is either a byte count or the string `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLimit {
    /// No ceiling; every chunk is accepted.
    Unlimited,
    /// Bodies longer than this many bytes are rejected with 413.
    Bytes(u64),
}

impl BodyLimit {
    /// True when `len` strictly exceeds the limit.
    pub fn exceeded_by(&self, len: u64) -> bool {
        match self {
            BodyLimit::Unlimited => false,
            BodyLimit::Bytes(max) => len > *max,
        }
    }

    /// The configured ceiling, if any.
    pub fn max(&self) -> Option<u64> {
        match self {
            BodyLimit::Unlimited => None,
            BodyLimit::Bytes(max) => Some(*max),
        }
    }
}

impl Default for BodyLimit {
    fn default() -> Self {
        BodyLimit::Bytes(DEFAULT_MAX_BODY_LENGTH)
    }
}

impl std::fmt::Display for BodyLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyLimit::Unlimited => write!(f, "unlimited"),
            BodyLimit::Bytes(max) => write!(f, "{} bytes", max),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLimit {
    Bytes(u64),
    Keyword(String),
}

impl<'de> Deserialize<'de> for BodyLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawLimit::deserialize(deserializer)? {
            RawLimit::Bytes(max) => Ok(BodyLimit::Bytes(max)),
            RawLimit::Keyword(word) if word.eq_ignore_ascii_case("unlimited") => {
                Ok(BodyLimit::Unlimited)
            }
            RawLimit::Keyword(word) => Err(serde::de::Error::custom(format!(
                "invalid body limit `{}`: expected a byte count or \"unlimited\"",
                word
            ))),
        }
    }
}

impl Serialize for BodyLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BodyLimit::Unlimited => serializer.serialize_str("unlimited"),
            BodyLimit::Bytes(max) => serializer.serialize_u64(*max),
        }
    }
}
