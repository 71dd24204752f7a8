//! Periodic comment-count refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::application::comments::{CommentCountSource, CommentSourceError};
use crate::cache::ContentCache;

use super::spawn_periodic;

/// Fetch counts for every visible item and replace the cached counts.
///
/// Returns how many slugs received a count.
pub async fn refresh_comment_counts(
    cache: &ContentCache,
    source: &dyn CommentCountSource,
) -> Result<usize, CommentSourceError> {
    let slugs = cache.visible_slugs();
    if slugs.is_empty() {
        return Ok(0);
    }

    let counts = source.fetch_counts(&slugs).await?;
    let updated = counts.len();
    cache.replace_comment_counts(counts);

    debug!(
        target = "quire::jobs::comments",
        requested = slugs.len(),
        updated,
        "Comment counts refreshed"
    );
    Ok(updated)
}

pub struct CommentRefreshJob {
    pub cache: Arc<ContentCache>,
    pub source: Arc<dyn CommentCountSource>,
}

impl CommentRefreshJob {
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        let job = Arc::new(self);
        spawn_periodic("comment_refresh", period, move || {
            let job = Arc::clone(&job);
            async move {
                refresh_comment_counts(&job.cache, job.source.as_ref())
                    .await
                    .map(|_| ())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use time::macros::datetime;

    use super::*;
    use crate::application::render::ComrakRenderService;
    use crate::application::repos::{ContentRepo, RepoError};
    use crate::cache::CacheConfig;
    use crate::domain::entities::{ContentRecord, SeriesRecord, SiteProfile};
    use crate::domain::types::ContentId;

    struct FixedRepo(Vec<ContentRecord>);

    #[async_trait]
    impl ContentRepo for FixedRepo {
        async fn load_all_content(&self) -> Result<Vec<ContentRecord>, RepoError> {
            Ok(self.0.clone())
        }

        async fn load_all_series(&self) -> Result<Vec<SeriesRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn load_or_create_profile(
            &self,
            defaults: SiteProfile,
        ) -> Result<SiteProfile, RepoError> {
            Ok(defaults)
        }

        async fn purge_trashed(&self, _before: OffsetDateTime) -> Result<usize, RepoError> {
            Ok(0)
        }
    }

    /// Answers with the slug length as count and records requests.
    #[derive(Default)]
    struct LengthCounter {
        requests: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl CommentCountSource for LengthCounter {
        async fn fetch_counts(
            &self,
            slugs: &[String],
        ) -> Result<HashMap<String, u64>, CommentSourceError> {
            self.requests.lock().expect("requests lock").push(slugs.to_vec());
            Ok(slugs
                .iter()
                .map(|slug| (slug.clone(), slug.len() as u64))
                .collect())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl CommentCountSource for Unreachable {
        async fn fetch_counts(
            &self,
            _slugs: &[String],
        ) -> Result<HashMap<String, u64>, CommentSourceError> {
            Err(CommentSourceError::Request("connection refused".to_string()))
        }
    }

    fn record(id: u64, slug: &str) -> ContentRecord {
        ContentRecord {
            id: ContentId(id),
            slug: slug.to_string(),
            title: slug.to_string(),
            body_markdown: String::new(),
            excerpt_markdown: None,
            tags: BTreeSet::new(),
            series_id: None,
            created_at: datetime!(2024-01-01 00:00 UTC),
            updated_at: None,
        }
    }

    async fn loaded_cache() -> ContentCache {
        let config = CacheConfig {
            visibility_threshold: 2,
            ..CacheConfig::default()
        };
        let cache = ContentCache::new(
            config,
            Arc::new(FixedRepo(vec![
                record(1, "legacy"),
                record(2, "ab"),
                record(3, "abcd"),
            ])),
            Arc::new(ComrakRenderService::new()),
            SiteProfile::default(),
        );
        cache.load().await.expect("load");
        cache
    }

    #[tokio::test]
    async fn refresh_requests_visible_slugs_only() {
        let cache = loaded_cache().await;
        cache.replace_comment_counts(HashMap::from([("renamed".to_string(), 7)]));
        let source = LengthCounter::default();

        let updated = refresh_comment_counts(&cache, &source)
            .await
            .expect("refresh");

        assert_eq!(updated, 2);
        assert_eq!(
            source.requests.lock().expect("requests lock").as_slice(),
            &[vec!["abcd".to_string(), "ab".to_string()]]
        );
        assert_eq!(cache.comment_count("abcd"), 4);
        assert_eq!(cache.comment_count("legacy"), 0);
        assert_eq!(cache.comment_count("renamed"), 0);
        cache.shutdown().await;
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_counts() {
        let cache = loaded_cache().await;
        cache.replace_comment_counts(HashMap::from([("ab".to_string(), 9)]));

        let err = refresh_comment_counts(&cache, &Unreachable)
            .await
            .expect_err("source down");

        assert!(matches!(err, CommentSourceError::Request(_)));
        assert_eq!(cache.comment_count("ab"), 9);
        cache.shutdown().await;
    }
}
