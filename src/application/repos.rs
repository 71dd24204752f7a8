//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{ContentRecord, SeriesRecord, SiteProfile};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("malformed record: {message}")]
    Malformed { message: String },
    #[error("resource not found")]
    NotFound,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Persistence port consumed by the content cache.
///
/// Implementations own the storage layout; the cache only relies on the
/// record shapes declared in [`crate::domain::entities`].
#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Every live content record. Order is unspecified; the cache sorts.
    async fn load_all_content(&self) -> Result<Vec<ContentRecord>, RepoError>;

    async fn load_all_series(&self) -> Result<Vec<SeriesRecord>, RepoError>;

    /// Return the stored site profile, persisting `defaults` first if none exists.
    async fn load_or_create_profile(&self, defaults: SiteProfile)
    -> Result<SiteProfile, RepoError>;

    /// Permanently remove trashed content deleted before `before`.
    /// Returns the number of removed records.
    async fn purge_trashed(&self, before: OffsetDateTime) -> Result<usize, RepoError>;
}
