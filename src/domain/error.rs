use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} `{key}` is already taken by content {owner}")]
    Duplicate {
        entity: &'static str,
        key: String,
        owner: u64,
    },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn duplicate(entity: &'static str, key: impl Into<String>, owner: u64) -> Self {
        Self::Duplicate {
            entity,
            key: key.into(),
            owner,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}
