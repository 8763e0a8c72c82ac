//! Body parsing middleware.
//!
//! # Responsibilities
//! - Skip methods without a body and requests without a content type
//! - Accumulate the body under the exchange's `BodyLimit`
//! - Dispatch to the JSON, form, or multipart decoder
//! - Store the decoded body and attachments on the exchange
//!
//! # Design Decisions
//! - 413 on limit violation, 400 for bodies declared JSON that are not JSON
//! - Real decode failures travel as `Signal::Error` with their cause
//! - Unknown content types are read (so the limit applies) and discarded

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use axum::http::{Method, StatusCode};
use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::body::json::JsonRejection;
use crate::body::{self, accumulate, AccumulateError, BodyKind, ParsedBody};
use crate::config::BodyConfig;
use crate::observability::metrics;
use crate::pipeline::{Exchange, Middleware, PipelineError, Signal};

/// Decodes request bodies into `Exchange::body` and `Exchange::files`.
#[derive(Debug, Clone, Default)]
pub struct BodyParser {
    upload_dir: Option<PathBuf>,
}

impl BodyParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BodyConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
        }
    }

    /// Spool multipart uploads into `dir` instead of the system temp directory.
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    pub fn upload_dir(&self) -> Option<&Path> {
        self.upload_dir.as_deref()
    }

    async fn parse(&self, exchange: &mut Exchange) -> Signal {
        if is_bodyless(exchange.method()) {
            return Signal::Proceed;
        }
        let Some(content_type) = exchange.content_type().map(Cow::into_owned) else {
            return Signal::Proceed;
        };
        let Some(source) = exchange.take_source() else {
            tracing::trace!("Request body already consumed");
            return Signal::Proceed;
        };

        let kind = BodyKind::detect(&content_type);
        let label = kind.map_or("other", |k| k.as_str());

        let buffer =
            match accumulate(source, exchange.body_limit(), exchange.content_length()).await {
                Ok(buffer) => buffer,
                Err(AccumulateError::LimitExceeded(e)) => {
                    tracing::warn!(
                        attempted = e.attempted,
                        limit = e.limit,
                        "Request body exceeds limit"
                    );
                    metrics::record_body_outcome(label, "too_large");
                    return Signal::Status(StatusCode::PAYLOAD_TOO_LARGE);
                }
                Err(AccumulateError::Transport(e)) => {
                    metrics::record_body_outcome(label, "aborted");
                    return Signal::Error(PipelineError::Transport(e));
                }
            };
        metrics::record_body_size(buffer.len());

        let Some(kind) = kind else {
            tracing::debug!(content_type = %content_type, "No decoder for content type");
            metrics::record_body_outcome(label, "skipped");
            return Signal::Proceed;
        };

        let signal = match kind {
            BodyKind::Json => decode_json(exchange, &buffer),
            BodyKind::Form => store(exchange, ParsedBody::Form(body::form::decode(&buffer))),
            BodyKind::Multipart => self.decode_multipart(exchange, buffer, &content_type).await,
        };
        metrics::record_body_outcome(label, outcome(&signal));
        signal
    }

    async fn decode_multipart(
        &self,
        exchange: &mut Exchange,
        buffer: Bytes,
        content_type: &str,
    ) -> Signal {
        let form = match body::multipart::decode(buffer, content_type, self.upload_dir()).await {
            Ok(form) => form,
            Err(e) => return Signal::error(e),
        };

        if let Some(files) = form.files {
            if let Err(files) = exchange.set_files(files) {
                if let Err(e) = files.release() {
                    tracing::warn!(error = %e, "Failed to release rejected uploads");
                }
                return Signal::Error(PipelineError::BodyAlreadySet);
            }
        }
        match form.fields {
            Some(fields) => store(exchange, ParsedBody::Form(fields)),
            None => Signal::Proceed,
        }
    }
}

impl Middleware for BodyParser {
    fn handle<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Signal> {
        Box::pin(self.parse(exchange))
    }

    fn name(&self) -> &'static str {
        "body_parser"
    }
}

/// Methods whose bodies are never interpreted.
fn is_bodyless(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

fn decode_json(exchange: &mut Exchange, buffer: &[u8]) -> Signal {
    match body::json::decode(buffer) {
        Ok(value) => store(exchange, ParsedBody::Json(value)),
        Err(JsonRejection::Malformed(e)) => Signal::error(body::DecodeError::Json(e)),
        Err(rejection) => {
            tracing::debug!(reason = %rejection, "Rejecting JSON body");
            Signal::Status(StatusCode::BAD_REQUEST)
        }
    }
}

fn store(exchange: &mut Exchange, body: ParsedBody) -> Signal {
    match exchange.set_body(body) {
        Ok(()) => Signal::Proceed,
        Err(e) => Signal::Error(e),
    }
}

fn outcome(signal: &Signal) -> &'static str {
    match signal {
        Signal::Proceed => "ok",
        Signal::Status(_) => "rejected",
        Signal::Error(_) => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyLimit;
    use axum::body::Body;
    use axum::http::Request;
    use futures_util::StreamExt;
    use serde_json::json;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn exchange(method: Method, content_type: Option<&str>, body: impl Into<Body>) -> Exchange {
        let mut builder = Request::builder().method(method).uri("/");
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        Exchange::new(builder.body(body.into()).unwrap(), BodyLimit::Unlimited)
    }

    async fn run(exchange: &mut Exchange) -> Signal {
        BodyParser::new().handle(exchange).await
    }

    #[tokio::test]
    async fn bodyless_methods_are_skipped() {
        for method in [Method::GET, Method::HEAD] {
            let mut ex = exchange(method, Some("application/json"), "{\"a\":1}");
            assert!(run(&mut ex).await.is_proceed());
            assert!(ex.body().is_none());
            assert!(ex.take_source().is_some(), "body must stay unread");
        }
    }

    #[tokio::test]
    async fn missing_content_type_is_skipped() {
        let mut ex = exchange(Method::POST, None, "a=1");
        assert!(run(&mut ex).await.is_proceed());
        assert!(ex.body().is_none());
        assert!(ex.take_source().is_some());
    }

    #[tokio::test]
    async fn form_end_to_end() {
        let mut ex = exchange(
            Method::POST,
            Some("application/x-www-form-urlencoded"),
            "name=Ann&age=30",
        );
        assert!(run(&mut ex).await.is_proceed());
        let form = ex.body().unwrap().as_form().unwrap();
        assert_eq!(form.len(), 2);
        assert_eq!(form["name"], "Ann");
        assert_eq!(form["age"], "30");
    }

    #[tokio::test]
    async fn json_body_is_stored() {
        let value = json!({"user": {"name": "Ann"}, "ids": [1, 2]});
        let mut ex = exchange(
            Method::PUT,
            Some("application/json; charset=utf-8"),
            serde_json::to_vec(&value).unwrap(),
        );
        assert!(run(&mut ex).await.is_proceed());
        assert_eq!(ex.body().unwrap().as_json(), Some(&value));
    }

    #[tokio::test]
    async fn non_ascii_content_type_parameter_still_dispatches() {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from("{\"a\":1}"))
            .unwrap();
        request.headers_mut().insert(
            "content-type",
            axum::http::HeaderValue::from_bytes(b"application/json; note=\xe9").unwrap(),
        );
        let mut ex = Exchange::new(request, BodyLimit::Unlimited);

        assert!(run(&mut ex).await.is_proceed());
        assert_eq!(ex.body().unwrap().as_json(), Some(&json!({"a": 1})));
    }

    #[tokio::test]
    async fn blank_or_scalar_json_is_bad_request() {
        for payload in ["", "   ", "42"] {
            let mut ex = exchange(Method::POST, Some("application/json"), payload);
            assert!(matches!(run(&mut ex).await, Signal::Status(StatusCode::BAD_REQUEST)));
            assert!(ex.body().is_none());
        }
    }

    #[tokio::test]
    async fn malformed_json_carries_its_cause() {
        let mut ex = exchange(Method::POST, Some("application/json"), "{\"a\": }");
        match run(&mut ex).await {
            Signal::Error(PipelineError::Decode(body::DecodeError::Json(e))) => {
                assert!(e.is_syntax())
            }
            other => panic!("expected JSON decode error, got {:?}", other),
        }
        assert!(ex.body().is_none());
    }

    #[tokio::test]
    async fn unknown_type_proceeds_without_body() {
        let mut ex = exchange(Method::POST, Some("text/plain"), "hello");
        assert!(run(&mut ex).await.is_proceed());
        assert!(ex.body().is_none());
        assert!(ex.files().is_none());
    }

    #[tokio::test]
    async fn oversized_body_is_413_and_not_decoded() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let chunks = futures_util::stream::iter(vec!["a=1&", "b=2&", "c=3&", "d=4&"]).map(
            move |c| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(Bytes::from_static(c.as_bytes()))
            },
        );
        let mut ex = exchange(
            Method::POST,
            Some("application/x-www-form-urlencoded"),
            Body::from_stream(chunks),
        );
        ex.set_body_limit(BodyLimit::Bytes(10));

        assert!(matches!(
            run(&mut ex).await,
            Signal::Status(StatusCode::PAYLOAD_TOO_LARGE)
        ));
        assert!(ex.body().is_none());
        assert_eq!(polled.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn body_at_limit_is_accepted() {
        let mut ex = exchange(
            Method::POST,
            Some("application/x-www-form-urlencoded"),
            "a=1&b=2",
        );
        ex.set_body_limit(BodyLimit::Bytes(7));
        assert!(run(&mut ex).await.is_proceed());
        assert_eq!(ex.body().unwrap().as_form().unwrap()["b"], "2");
    }

    #[tokio::test]
    async fn second_parser_does_not_decode_again() {
        let mut ex = exchange(Method::POST, Some("application/json"), "[1]");
        let parser = BodyParser::new();
        assert!(parser.handle(&mut ex).await.is_proceed());
        assert!(parser.handle(&mut ex).await.is_proceed());
        assert_eq!(ex.body().unwrap().as_json(), Some(&json!([1])));
    }

    #[tokio::test]
    async fn multipart_sets_body_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let payload = "--b0undary\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            hello\r\n\
            --b0undary\r\n\
            Content-Disposition: form-data; name=\"avatar\"; filename=\"x.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            PNG\r\n\
            --b0undary--\r\n";
        let mut ex = exchange(
            Method::POST,
            Some("multipart/form-data; boundary=b0undary"),
            payload,
        );

        let parser = BodyParser::new().with_upload_dir(dir.path());
        assert!(parser.handle(&mut ex).await.is_proceed());

        let form = ex.body().unwrap().as_form().unwrap();
        assert_eq!(form.len(), 1);
        assert_eq!(form["title"], "hello");
        let avatar = ex.files().unwrap().get("avatar").unwrap();
        assert_eq!(avatar.filename(), "x.png");
        assert!(avatar.path().exists());

        ex.finish();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn multipart_files_only_leaves_body_absent() {
        let dir = tempfile::tempdir().unwrap();
        let payload = "--B\r\n\
            Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\r\n\
            text\r\n\
            --B--\r\n";
        let mut ex = exchange(Method::POST, Some("multipart/form-data; boundary=B"), payload);

        let parser = BodyParser::new().with_upload_dir(dir.path());
        assert!(parser.handle(&mut ex).await.is_proceed());
        assert!(ex.body().is_none());
        assert_eq!(ex.files().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dropped_exchange_releases_files() {
        let dir = tempfile::tempdir().unwrap();
        let payload = "--B\r\n\
            Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\r\n\
            text\r\n\
            --B--\r\n";
        let mut ex = exchange(Method::POST, Some("multipart/form-data; boundary=B"), payload);
        let parser = BodyParser::new().with_upload_dir(dir.path());
        assert!(parser.handle(&mut ex).await.is_proceed());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        drop(ex);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
