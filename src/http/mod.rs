//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower-http layers)
//!     → request.rs (add request ID)
//!     → pipeline (BodyParser → application stages)
//!     → Send response to client
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::{BodyParser, Echo};
pub use request::MakeRequestUuid;
pub use server::HttpServer;
