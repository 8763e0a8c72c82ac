//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that the upload directory exists
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//!   (apart from the upload directory lookup)
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },
    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
    #[error("body.upload_dir `{}` is not a directory", .0.display())]
    UploadDirMissing(PathBuf),
    #[error("observability.log_level must not be empty")]
    EmptyLogLevel,
}

/// Check `config` and collect every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(
        "listener.bind_address",
        &config.listener.bind_address,
        &mut errors,
    );
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "timeouts.request_secs",
        });
    }

    if let Some(dir) = &config.body.upload_dir {
        if !dir.is_dir() {
            errors.push(ValidationError::UploadDirMissing(dir.clone()));
        }
    }

    if config.observability.log_level.trim().is_empty() {
        errors.push(ValidationError::EmptyLogLevel);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
