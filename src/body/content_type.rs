//! Content-type dispatch.
//!
//! Only the media-type portion of the header (before the first `;`) is
//! matched, case-insensitively, by substring. Rules are checked in order and
//! the first hit wins.

/// Decoder selected for a declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Form,
    Multipart,
}

impl BodyKind {
    /// Pick the decoder for `content_type`, or `None` if the type is not interpreted.
    pub fn detect(content_type: &str) -> Option<Self> {
        let media_type = media_type(content_type).to_ascii_lowercase();
        if media_type.contains("application/json") {
            Some(BodyKind::Json)
        } else if media_type.contains("application/x-www-form-urlencoded") {
            Some(BodyKind::Form)
        } else if media_type.contains("multipart/form-data") {
            Some(BodyKind::Multipart)
        } else {
            None
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyKind::Json => "json",
            BodyKind::Form => "form",
            BodyKind::Multipart => "multipart",
        }
    }
}

impl std::fmt::Display for BodyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn media_type(content_type: &str) -> &str {
    content_type
        .split_once(';')
        .map_or(content_type, |(media, _)| media)
        .trim()
}

/// Value of the parameter `name` in a content-type header, unquoted.
pub fn content_type_param<'a>(content_type: &'a str, name: &str) -> Option<&'a str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}
