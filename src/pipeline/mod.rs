//! Middleware pipeline.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → exchange.rs (per-request state)
//!     → chain.rs (stage 1 → stage 2 → ... until a stage stops the chain)
//!     → signal.rs (Proceed | Status | Error)
//!     → runner.rs (response, or error_handler.rs for errors)
//!     → Exchange::finish (release attachments)
//! ```
//!
//! # Design Decisions
//! - Stages return their outcome instead of calling a continuation
//! - Errors keep their cause so error handlers can inspect them
//! - No state is shared between exchanges

pub mod chain;
pub mod error;
pub mod error_handler;
pub mod exchange;
pub mod runner;
pub mod signal;

pub use chain::{Chain, Middleware};
pub use error::{BoxError, PipelineError};
pub use error_handler::{DefaultErrorHandler, ErrorHandler};
pub use exchange::{Exchange, X_REQUEST_ID};
pub use runner::Pipeline;
pub use signal::Signal;
