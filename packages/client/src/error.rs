//! Error types of the client binary.

use thiserror::Error;

use crate::{
    config::ConfigError,
    domain::{ApiError, DomainError},
};

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Command-line input that cannot be used
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Synchronization timings that cannot be used
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Buyer or seat data rejected by the domain
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Failure talking to the ticket services
    #[error(transparent)]
    Api(#[from] ApiError),
}
