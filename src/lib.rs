//! Request body ingestion pipeline.
//!
//! Middleware stages share one [`pipeline::Exchange`] per request and report
//! their outcome as a [`pipeline::Signal`]. The [`http::BodyParser`] stage
//! buffers the body under a size limit and decodes JSON, url-encoded forms,
//! and multipart uploads for the stages that follow.

pub mod body;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;

pub use body::{Attachment, Attachments, BodyLimit, ParsedBody};
pub use config::AppConfig;
pub use http::{BodyParser, HttpServer};
pub use lifecycle::Shutdown;
pub use pipeline::{Chain, Exchange, Middleware, Pipeline, PipelineError, Signal};
