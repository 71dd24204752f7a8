//! The content cache facade.
//!
//! Owns the index snapshot, the regeneration worker and the comment counts,
//! and exposes the read path (lookups, pagination, rendered pages) and the
//! write path (`on_content_upserted`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::excerpt::render_excerpt;
use crate::application::pagination::{Pagination, paginate};
use crate::application::render::RenderService;
use crate::application::repos::{ContentRepo, RepoError};
use crate::domain::entities::{ContentItem, ContentRecord, Neighbors, SiteProfile};
use crate::domain::error::DomainError;
use crate::domain::types::ContentId;

use super::config::CacheConfig;
use super::events::{Published, SignalQueue, SignalReceiver};
use super::lock::mutex_lock;
use super::rebuild::Regeneration;
use super::state::{IndexHandle, IndexState};
use super::worker::{RegenerationWorker, RenderedPages};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("content repository failed: {0}")]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("content cache has shut down")]
    ShutDown,
}

enum WorkerSlot {
    Idle(SignalReceiver),
    Running(JoinHandle<()>),
    Stopped,
}

/// In-memory content cache.
///
/// Constructed once and shared by `Arc`. Readers take lock-free snapshots;
/// loads and upserts are serialised by a writer lock.
pub struct ContentCache {
    config: CacheConfig,
    repo: Arc<dyn ContentRepo>,
    renderer: Arc<dyn RenderService>,
    profile_defaults: SiteProfile,
    index: Arc<IndexHandle>,
    writer: tokio::sync::Mutex<()>,
    signals: SignalQueue,
    pages: Arc<watch::Sender<RenderedPages>>,
    worker: Mutex<WorkerSlot>,
    comment_counts: DashMap<String, u64>,
    shut_down: AtomicBool,
}

impl ContentCache {
    pub fn new(
        config: CacheConfig,
        repo: Arc<dyn ContentRepo>,
        renderer: Arc<dyn RenderService>,
        profile_defaults: SiteProfile,
    ) -> Self {
        let index = Arc::new(IndexHandle::new(IndexState::empty(
            profile_defaults.clone(),
            config.threshold(),
        )));
        let (signals, receiver) = SignalQueue::new();
        let (pages, _) = watch::channel(RenderedPages::default());

        Self {
            config,
            repo,
            renderer,
            profile_defaults,
            index,
            writer: tokio::sync::Mutex::new(()),
            signals,
            pages: Arc::new(pages),
            worker: Mutex::new(WorkerSlot::Idle(receiver)),
            comment_counts: DashMap::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Load every record from the repository and replace the index.
    ///
    /// On failure the current snapshot stays in place. Starts the
    /// regeneration worker on first use and requests both composite pages.
    pub async fn load(&self) -> Result<(), CacheError> {
        self.load_with("load").await
    }

    /// Same as [`ContentCache::load`]; used after content was removed.
    pub async fn reload(&self) -> Result<(), CacheError> {
        self.load_with("reload").await
    }

    async fn load_with(&self, op: &'static str) -> Result<(), CacheError> {
        let _writer = self.writer.lock().await;
        self.ensure_running()?;

        let profile = self
            .repo
            .load_or_create_profile(self.profile_defaults.clone())
            .await?;
        let series = self.repo.load_all_series().await?;
        let records = self.repo.load_all_content().await?;

        let rules = self.config.excerpt_rules();
        let items: Vec<ContentItem> = records
            .into_iter()
            .map(|record| {
                let excerpt = render_excerpt(self.renderer.as_ref(), &record, &rules);
                ContentItem::from_record(record, excerpt)
            })
            .collect();

        let state = IndexState::build(profile, self.config.threshold(), series, items)?;
        info!(
            target = "quire::cache::store",
            op,
            items = state.len(),
            visible = state.visible_items().len(),
            tags = state.tag_counts().count(),
            series = state.series().count(),
            archive_months = state.archives().len(),
            "Content index loaded"
        );
        self.index.replace(state);

        self.start_worker();
        self.publish(Regeneration::ALL);
        Ok(())
    }

    /// Apply a created or edited record to every index.
    ///
    /// Returns the composite pages that were scheduled for regeneration.
    pub async fn on_content_upserted(
        &self,
        record: ContentRecord,
    ) -> Result<Regeneration, CacheError> {
        let _writer = self.writer.lock().await;
        self.ensure_running()?;

        let id = record.id;
        let excerpt = render_excerpt(
            self.renderer.as_ref(),
            &record,
            &self.config.excerpt_rules(),
        );
        let item = ContentItem::from_record(record, excerpt);

        let mut next = IndexState::clone(&self.index.snapshot());
        let regeneration = next.upsert(item)?;
        self.index.replace(next);

        info!(
            target = "quire::cache::store",
            content_id = %id,
            series = regeneration.series,
            archive = regeneration.archive,
            "Content upserted"
        );
        self.publish(regeneration);
        Ok(regeneration)
    }

    /// Permanently remove content trashed before `before` and reload when
    /// anything was removed.
    pub async fn purge_trashed(&self, before: OffsetDateTime) -> Result<usize, CacheError> {
        let removed = self.repo.purge_trashed(before).await?;
        if removed > 0 {
            self.reload().await?;
        }
        Ok(removed)
    }

    fn ensure_running(&self) -> Result<(), CacheError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(CacheError::ShutDown);
        }
        Ok(())
    }

    fn start_worker(&self) {
        let mut slot = mutex_lock(&self.worker, SOURCE, "start_worker");
        if !matches!(*slot, WorkerSlot::Idle(_)) {
            return;
        }
        if let WorkerSlot::Idle(receiver) = std::mem::replace(&mut *slot, WorkerSlot::Stopped) {
            let worker = RegenerationWorker::new(
                Arc::clone(&self.index),
                Arc::clone(&self.renderer),
                Arc::clone(&self.pages),
                receiver,
                self.config.archive_compact_threshold,
            );
            *slot = WorkerSlot::Running(worker.spawn());
        }
    }

    fn publish(&self, regeneration: Regeneration) {
        for signal in regeneration.signals() {
            if self.signals.publish(signal) == Published::Closed {
                warn!(
                    target = "quire::cache::store",
                    signal = signal.as_str(),
                    "Regeneration signal published after shutdown"
                );
            }
        }
    }

    /// Stop the regeneration worker after it drains queued signals.
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        self.signals.close();

        let slot = std::mem::replace(
            &mut *mutex_lock(&self.worker, SOURCE, "shutdown"),
            WorkerSlot::Stopped,
        );
        if let WorkerSlot::Running(handle) = slot
            && let Err(err) = handle.await
        {
            warn!(
                target = "quire::cache::store",
                error = %err,
                "Regeneration worker ended abnormally"
            );
        }
        info!(target = "quire::cache::store", "Content cache shut down");
    }

    pub fn snapshot(&self) -> Arc<IndexState> {
        self.index.snapshot()
    }

    pub fn profile(&self) -> SiteProfile {
        self.index.snapshot().profile().clone()
    }

    pub fn get_by_slug(&self, slug: &str) -> Option<Arc<ContentItem>> {
        self.index.snapshot().get_by_slug(slug).cloned()
    }

    pub fn get_by_id(&self, id: ContentId) -> Option<Arc<ContentItem>> {
        self.index.snapshot().get_by_id(id).cloned()
    }

    pub fn neighbors(&self, id: ContentId) -> Neighbors {
        self.index.snapshot().neighbors(id)
    }

    pub fn tag_items(&self, tag: &str) -> Vec<Arc<ContentItem>> {
        self.index.snapshot().tag_items(tag).to_vec()
    }

    /// Page `page` (1-based) of the canonical sequence, `page_size` items per
    /// page.
    pub fn paginate(&self, page: usize, page_size: usize) -> Pagination {
        let snapshot = self.index.snapshot();
        paginate(snapshot.items(), snapshot.threshold(), page, page_size)
    }

    /// [`ContentCache::paginate`] with the configured page size.
    pub fn listing(&self, page: usize) -> Pagination {
        self.paginate(page, self.config.page_size)
    }

    /// Latest rendered series page; empty until first generated.
    pub fn series_page(&self) -> String {
        self.pages.borrow().series.clone()
    }

    /// Latest rendered archive page; empty until first generated.
    pub fn archive_page(&self) -> String {
        self.pages.borrow().archive.clone()
    }

    pub fn subscribe_pages(&self) -> watch::Receiver<RenderedPages> {
        self.pages.subscribe()
    }

    /// Slugs of all visible content, newest first.
    pub fn visible_slugs(&self) -> Vec<String> {
        self.index
            .snapshot()
            .visible_items()
            .iter()
            .map(|item| item.slug.clone())
            .collect()
    }

    pub fn comment_count(&self, slug: &str) -> u64 {
        self.comment_counts
            .get(slug)
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Replace the known comment counts with a freshly fetched set.
    ///
    /// Slugs absent from `counts` fall back to zero.
    pub fn replace_comment_counts(&self, counts: HashMap<String, u64>) {
        self.comment_counts.retain(|slug, _| counts.contains_key(slug));
        for (slug, count) in counts {
            self.comment_counts.insert(slug, count);
        }
    }
}
