//! Index snapshot held by the content cache.
//!
//! An [`IndexState`] is immutable once published through [`IndexHandle`].
//! Writers clone the current state, mutate the clone and swap it in, so a
//! reader holding a snapshot always sees every index at the same version.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::domain::archive::ArchiveKey;
use crate::domain::entities::{ContentItem, Neighbors, SeriesRecord, SiteProfile};
use crate::domain::types::{ContentId, SeriesId};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::state";

/// A series with its member items in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBucket {
    pub record: SeriesRecord,
    pub items: Vec<Arc<ContentItem>>,
}

impl SeriesBucket {
    pub fn new(record: SeriesRecord) -> Self {
        Self {
            record,
            items: Vec::new(),
        }
    }
}

/// Every derived index over the loaded content.
///
/// `items` is the canonical sequence, newest (largest identifier) first.
/// Items at or above `threshold` form its visible prefix.
#[derive(Debug, Clone)]
pub struct IndexState {
    pub(super) profile: SiteProfile,
    pub(super) threshold: ContentId,
    pub(super) items: Vec<Arc<ContentItem>>,
    pub(super) by_id: HashMap<ContentId, Arc<ContentItem>>,
    pub(super) by_slug: HashMap<String, Arc<ContentItem>>,
    pub(super) links: HashMap<ContentId, Neighbors>,
    pub(super) tags: BTreeMap<String, Vec<Arc<ContentItem>>>,
    pub(super) series: BTreeMap<SeriesId, SeriesBucket>,
    pub(super) archives: BTreeMap<ArchiveKey, Vec<Arc<ContentItem>>>,
}

impl IndexState {
    pub fn empty(profile: SiteProfile, threshold: ContentId) -> Self {
        Self {
            profile,
            threshold,
            items: Vec::new(),
            by_id: HashMap::new(),
            by_slug: HashMap::new(),
            links: HashMap::new(),
            tags: BTreeMap::new(),
            series: BTreeMap::new(),
            archives: BTreeMap::new(),
        }
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    pub fn threshold(&self) -> ContentId {
        self.threshold
    }

    /// Canonical sequence, newest first. Includes items below the threshold.
    pub fn items(&self) -> &[Arc<ContentItem>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Visible prefix of the canonical sequence.
    pub fn visible_items(&self) -> &[Arc<ContentItem>] {
        let end = self
            .items
            .iter()
            .position(|item| !item.id.is_visible(self.threshold))
            .unwrap_or(self.items.len());
        &self.items[..end]
    }

    pub fn get_by_id(&self, id: ContentId) -> Option<&Arc<ContentItem>> {
        self.by_id.get(&id)
    }

    pub fn get_by_slug(&self, slug: &str) -> Option<&Arc<ContentItem>> {
        self.by_slug.get(slug)
    }

    /// Links of `id`; empty for unknown or invisible items.
    pub fn neighbors(&self, id: ContentId) -> Neighbors {
        self.links.get(&id).copied().unwrap_or_default()
    }

    pub fn tag_items(&self, tag: &str) -> &[Arc<ContentItem>] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tag names with the number of visible items carrying each.
    pub fn tag_counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.tags
            .iter()
            .map(|(name, items)| (name.as_str(), items.len()))
    }

    /// Series ordered by identifier.
    pub fn series(&self) -> impl Iterator<Item = &SeriesBucket> {
        self.series.values()
    }

    pub fn series_bucket(&self, id: SeriesId) -> Option<&SeriesBucket> {
        self.series.get(&id)
    }

    /// Archive buckets in chronological order.
    pub fn archives(&self) -> &BTreeMap<ArchiveKey, Vec<Arc<ContentItem>>> {
        &self.archives
    }

    pub fn archive_items(&self, key: ArchiveKey) -> &[Arc<ContentItem>] {
        self.archives.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Shared pointer to the current [`IndexState`].
#[derive(Debug)]
pub struct IndexHandle {
    current: RwLock<Arc<IndexState>>,
}

impl IndexHandle {
    pub fn new(state: IndexState) -> Self {
        Self {
            current: RwLock::new(Arc::new(state)),
        }
    }

    /// Current snapshot. The read lock is held only for the pointer clone.
    pub fn snapshot(&self) -> Arc<IndexState> {
        Arc::clone(&rw_read(&self.current, SOURCE, "snapshot"))
    }

    /// Publish `state`, returning the snapshot it replaces.
    pub fn replace(&self, state: IndexState) -> Arc<IndexState> {
        let next = Arc::new(state);
        std::mem::replace(&mut *rw_write(&self.current, SOURCE, "replace"), next)
    }
}
