//! Built-in middleware stages.

pub mod body_parser;
pub mod echo;

pub use body_parser::BodyParser;
pub use echo::Echo;
