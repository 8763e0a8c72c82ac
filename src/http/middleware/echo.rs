//! Terminal middleware that reports what the pipeline decoded.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use futures_util::future::BoxFuture;
use serde::Serialize;

use crate::body::ParsedBody;
use crate::pipeline::{Exchange, Middleware, Signal};

#[derive(Debug, Serialize)]
struct EchoReport<'a> {
    method: &'a str,
    path: &'a str,
    body: Option<&'a ParsedBody>,
    files: Vec<FileReport<'a>>,
}

#[derive(Debug, Serialize)]
struct FileReport<'a> {
    field: &'a str,
    filename: &'a str,
    content_type: Option<&'a str>,
    size: u64,
}

/// Answers 200 with a JSON description of the decoded body and uploads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Echo {
    fn respond(exchange: &mut Exchange) -> Signal {
        let mut files: Vec<FileReport<'_>> = exchange
            .files()
            .into_iter()
            .flatten()
            .map(|(field, file)| FileReport {
                field,
                filename: file.filename(),
                content_type: file.content_type(),
                size: file.len(),
            })
            .collect();
        files.sort_by(|a, b| a.field.cmp(b.field));

        let report = EchoReport {
            method: exchange.method().as_str(),
            path: exchange.uri().path(),
            body: exchange.body(),
            files,
        };
        let response = (StatusCode::OK, Json(&report)).into_response();
        exchange.respond(response);
        Signal::Proceed
    }
}

impl Middleware for Echo {
    fn handle<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Signal> {
        Box::pin(async move { Echo::respond(exchange) })
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}
