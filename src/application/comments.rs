//! Port for the external comment service.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommentSourceError {
    #[error("comment service is not configured")]
    NotConfigured,
    #[error("comment service request failed: {0}")]
    Request(String),
    #[error("comment service returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Fetches comment counts keyed by content slug.
#[async_trait]
pub trait CommentCountSource: Send + Sync {
    async fn fetch_counts(&self, slugs: &[String])
    -> Result<HashMap<String, u64>, CommentSourceError>;
}
