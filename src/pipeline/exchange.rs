//! Per-request state shared by the stages of one chain run.
//!
//! # Responsibilities
//! - Expose request line and headers to middleware
//! - Hand the body chunk source out at most once
//! - Hold the decoded body (write-once) and uploaded attachments
//! - Hold the response written by a terminal stage
//!
//! # Design Decisions
//! - Owned by exactly one in-flight request, passed by `&mut` to each stage
//! - Attachments are released by `finish`, or by `Drop` if the request is abandoned

use std::borrow::Cow;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, Uri, Version};
use axum::response::Response;

use crate::body::{Attachments, BodyLimit, ParsedBody};
use crate::pipeline::error::PipelineError;

/// Header carrying the request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// One HTTP exchange as seen by the middleware chain.
#[derive(Debug)]
pub struct Exchange {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    source: Option<Body>,
    body_limit: BodyLimit,
    body: Option<ParsedBody>,
    files: Option<Attachments>,
    response: Option<Response>,
}

impl Exchange {
    /// Wrap an incoming request. The body stays unread until a stage takes it.
    pub fn new(request: Request<Body>, body_limit: BodyLimit) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            source: Some(body),
            body_limit,
            body: None,
            files: None,
            response: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text; `None` if absent or not visible ASCII.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Declared `Content-Type`, if any.
    ///
    /// Read from the raw header bytes, so a non-ASCII parameter value does
    /// not hide the media type.
    pub fn content_type(&self) -> Option<Cow<'_, str>> {
        self.headers
            .get(header::CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    /// Declared `Content-Length`, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.header(header::CONTENT_LENGTH)
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    pub fn body_limit(&self) -> BodyLimit {
        self.body_limit
    }

    /// Override the body limit for this request only.
    pub fn set_body_limit(&mut self, limit: BodyLimit) {
        self.body_limit = limit;
    }

    /// Take the chunk source. Returns `None` once a stage has consumed it.
    pub fn take_source(&mut self) -> Option<Body> {
        self.source.take()
    }

    /// Decoded body, if a body parser ran and produced one.
    pub fn body(&self) -> Option<&ParsedBody> {
        self.body.as_ref()
    }

    /// Store the decoded body. The slot can only be written once.
    pub fn set_body(&mut self, body: ParsedBody) -> Result<(), PipelineError> {
        if self.body.is_some() {
            return Err(PipelineError::BodyAlreadySet);
        }
        self.body = Some(body);
        Ok(())
    }

    /// Uploaded files, if a multipart body was decoded.
    pub fn files(&self) -> Option<&Attachments> {
        self.files.as_ref()
    }

    /// Hand the upload set to the exchange, which releases it in `finish`.
    ///
    /// Fails (and gives the set back) if attachments were already stored.
    pub fn set_files(&mut self, files: Attachments) -> Result<(), Attachments> {
        if self.files.is_some() {
            return Err(files);
        }
        self.files = Some(files);
        Ok(())
    }

    /// Write the response. Later stages are skipped once this is set.
    pub fn respond(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub fn is_responded(&self) -> bool {
        self.response.is_some()
    }

    pub(crate) fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// End the exchange and release its transient storage.
    pub fn finish(mut self) {
        if let Some(files) = self.files.take() {
            let count = files.len();
            match files.release() {
                Ok(()) => tracing::trace!(count, "Released attachments"),
                Err(e) => tracing::warn!(error = %e, "Failed to release attachments"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn exchange(headers: &[(&str, &str)]) -> Exchange {
        let mut builder = Request::builder().method(Method::POST).uri("/upload");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        Exchange::new(builder.body(Body::empty()).unwrap(), BodyLimit::Unlimited)
    }

    #[test]
    fn header_accessors() {
        let ex = exchange(&[
            ("content-type", "application/json"),
            ("content-length", "42"),
            ("x-request-id", "abc"),
        ]);
        assert_eq!(ex.method(), Method::POST);
        assert_eq!(ex.uri().path(), "/upload");
        assert_eq!(ex.version(), Version::HTTP_11);
        assert_eq!(ex.content_type().as_deref(), Some("application/json"));
        assert_eq!(ex.content_length(), Some(42));
        assert_eq!(ex.request_id(), Some("abc"));

        let ex = exchange(&[("content-length", "lots")]);
        assert_eq!(ex.content_type(), None);
        assert_eq!(ex.content_length(), None);
    }

    #[test]
    fn content_type_with_non_ascii_parameter() {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::empty())
            .unwrap();
        request.headers_mut().insert(
            header::CONTENT_TYPE,
            axum::http::HeaderValue::from_bytes(b"text/plain; note=\xe9").unwrap(),
        );
        let ex = Exchange::new(request, BodyLimit::Unlimited);
        let content_type = ex.content_type().unwrap();
        assert!(content_type.starts_with("text/plain; note="));
    }

    #[test]
    fn source_is_taken_once() {
        let mut ex = exchange(&[]);
        assert!(ex.take_source().is_some());
        assert!(ex.take_source().is_none());
    }

    #[test]
    fn body_is_write_once() {
        let mut ex = exchange(&[]);
        assert!(ex.body().is_none());
        ex.set_body(ParsedBody::Form(HashMap::new())).unwrap();
        let err = ex
            .set_body(ParsedBody::Json(serde_json::json!({})))
            .unwrap_err();
        assert!(matches!(err, PipelineError::BodyAlreadySet));
        assert!(ex.body().unwrap().as_form().is_some());
    }

    #[test]
    fn files_are_write_once() {
        let mut ex = exchange(&[]);
        ex.set_files(Attachments::new()).unwrap();
        assert!(ex.set_files(Attachments::new()).is_err());
        ex.finish();
    }

    #[test]
    fn body_limit_can_be_overridden() {
        let mut ex = exchange(&[]);
        assert_eq!(ex.body_limit(), BodyLimit::Unlimited);
        ex.set_body_limit(BodyLimit::Bytes(8));
        assert_eq!(ex.body_limit(), BodyLimit::Bytes(8));
    }
}
