//! Periodic purge of trashed content.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CacheError, ContentCache};

use super::spawn_periodic;

/// Purge content trashed more than `retention` before `now`.
pub async fn run_cleanup(
    cache: &ContentCache,
    retention: time::Duration,
    now: OffsetDateTime,
) -> Result<usize, CacheError> {
    let cutoff = now - retention;
    let removed = cache.purge_trashed(cutoff).await?;
    if removed > 0 {
        info!(
            target = "quire::jobs::cleanup",
            removed,
            cutoff = %cutoff,
            "Purged trashed content"
        );
    }
    Ok(removed)
}

pub struct CleanupJob {
    pub cache: Arc<ContentCache>,
    pub retention: time::Duration,
}

impl CleanupJob {
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        let job = Arc::new(self);
        spawn_periodic("cleanup", period, move || {
            let job = Arc::clone(&job);
            async move {
                run_cleanup(&job.cache, job.retention, OffsetDateTime::now_utc())
                    .await
                    .map(|_| ())
            }
        })
    }
}
