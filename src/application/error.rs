use std::error::Error as StdError;

use thiserror::Error;

use crate::{cache::CacheError, domain::error::DomainError, infra::error::InfraError};

/// Error messages of `error` and every source below it, outermost first.
pub fn error_chain(error: &dyn StdError) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(inner) = current {
        messages.push(inner.to_string());
        current = inner.source();
    }
    messages
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("content cache failed: {0}")]
    Cache(#[from] CacheError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Short label used as the `kind` field when the error is logged.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Domain(_) => "domain",
            AppError::Infra(InfraError::Configuration { .. }) => "configuration",
            AppError::Infra(InfraError::Telemetry(_)) => "telemetry",
            AppError::Infra(_) => "infrastructure",
            AppError::Cache(_) => "cache",
            AppError::Validation(_) => "validation",
            AppError::Unexpected(_) => "unexpected",
        }
    }
}
