//! Index construction and incremental maintenance.
//!
//! Every bucket is derived from the canonical sequence: an item sits in a tag
//! bucket iff it carries the tag, in a series bucket iff its series id names a
//! known series, and in exactly one archive bucket keyed by its creation
//! month. Buckets keep canonical (newest first) order and never hold two
//! entries with the same identifier.

use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::domain::archive::ArchiveKey;
use crate::domain::entities::{ContentItem, Neighbors, SeriesRecord, SiteProfile};
use crate::domain::error::DomainError;
use crate::domain::types::ContentId;

use super::events::RegenerationSignal;
use super::state::{IndexState, SeriesBucket};

/// Composite pages made stale by an index mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Regeneration {
    pub series: bool,
    pub archive: bool,
}

impl Regeneration {
    pub const ALL: Regeneration = Regeneration {
        series: true,
        archive: true,
    };

    pub fn merge(self, other: Regeneration) -> Regeneration {
        Regeneration {
            series: self.series || other.series,
            archive: self.archive || other.archive,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.series && !self.archive
    }

    pub fn signals(self) -> impl Iterator<Item = RegenerationSignal> {
        RegenerationSignal::ALL
            .into_iter()
            .filter(move |signal| match signal {
                RegenerationSignal::Series => self.series,
                RegenerationSignal::Archive => self.archive,
            })
    }
}

fn canonical_order(a: &Arc<ContentItem>, b: &Arc<ContentItem>) -> std::cmp::Ordering {
    b.id.cmp(&a.id)
}

/// Put `item` into `bucket`, replacing an entry with the same identifier.
fn insert_entry(bucket: &mut Vec<Arc<ContentItem>>, item: &Arc<ContentItem>, resort: bool) {
    match bucket.iter_mut().find(|entry| entry.id == item.id) {
        Some(entry) => *entry = Arc::clone(item),
        None => bucket.push(Arc::clone(item)),
    }
    if resort {
        bucket.sort_by(canonical_order);
    }
}

/// Append `item` without a duplicate scan. Only valid while building from a
/// sequence already checked for unique identifiers and fed in canonical order.
fn append_entry(bucket: &mut Vec<Arc<ContentItem>>, item: &Arc<ContentItem>, _resort: bool) {
    bucket.push(Arc::clone(item));
}

fn remove_entry(bucket: &mut Vec<Arc<ContentItem>>, id: ContentId) -> bool {
    let before = bucket.len();
    bucket.retain(|entry| entry.id != id);
    bucket.len() != before
}

impl IndexState {
    /// Index a full content set.
    ///
    /// Fails on a duplicate content identifier, slug or series identifier.
    pub fn build(
        profile: SiteProfile,
        threshold: ContentId,
        series: Vec<SeriesRecord>,
        items: Vec<ContentItem>,
    ) -> Result<Self, DomainError> {
        let mut state = IndexState::empty(profile, threshold);

        for record in series {
            let id = record.id;
            if state.series.insert(id, SeriesBucket::new(record)).is_some() {
                return Err(DomainError::duplicate(
                    "series",
                    id.to_string(),
                    u64::from(id.0),
                ));
            }
        }

        let mut items: Vec<Arc<ContentItem>> = items.into_iter().map(Arc::new).collect();
        items.sort_by(canonical_order);

        for item in &items {
            if let Some(existing) = state.by_id.insert(item.id, Arc::clone(item)) {
                return Err(DomainError::duplicate(
                    "identifier",
                    item.id.to_string(),
                    existing.id.get(),
                ));
            }
            match state.by_slug.entry(item.slug.clone()) {
                Entry::Occupied(owner) => {
                    return Err(DomainError::duplicate(
                        "slug",
                        item.slug.clone(),
                        owner.get().id.get(),
                    ));
                }
                Entry::Vacant(slot) => {
                    slot.insert(Arc::clone(item));
                }
            }
        }
        state.items = items;
        state.relink();

        let visible: Vec<Arc<ContentItem>> = state.visible_items().to_vec();
        for item in &visible {
            state.place(item, false, append_entry);
        }

        Ok(state)
    }

    /// Recompute neighbour links among visible items.
    pub(super) fn relink(&mut self) {
        self.links.clear();

        let visible: Vec<ContentId> = self.visible_items().iter().map(|item| item.id).collect();
        for (index, id) in visible.iter().enumerate() {
            let prev = index.checked_sub(1).map(|before| visible[before]);
            let next = visible.get(index + 1).copied();
            self.links.insert(*id, Neighbors { prev, next });
        }
    }

    /// Place one visible item in its tag, series and archive buckets.
    ///
    /// With `resort` the touched buckets are re-sorted and the series and
    /// archive pages are reported stale. An entry with the same identifier
    /// is replaced, so repeating a call changes nothing.
    pub fn rebuild(&mut self, item: &Arc<ContentItem>, resort: bool) -> Regeneration {
        self.place(item, resort, insert_entry)
    }

    /// Bucket placement shared by [`IndexState::rebuild`] and the bulk build,
    /// which appends without scanning since it feeds unique items in
    /// canonical order.
    fn place(
        &mut self,
        item: &Arc<ContentItem>,
        resort: bool,
        insert: fn(&mut Vec<Arc<ContentItem>>, &Arc<ContentItem>, bool),
    ) -> Regeneration {
        let mut regeneration = Regeneration::default();
        if !item.id.is_visible(self.threshold) {
            return regeneration;
        }

        for tag in &item.tags {
            insert(self.tags.entry(tag.clone()).or_default(), item, resort);
        }

        if let Some(bucket) = item
            .series_id
            .and_then(|series_id| self.series.get_mut(&series_id))
        {
            insert(&mut bucket.items, item, resort);
            regeneration.series = resort;
        }

        let key = ArchiveKey::of(item.created_at);
        match self.archives.get_mut(&key) {
            Some(bucket) => insert(bucket, item, resort),
            None => {
                self.archives.insert(key, vec![Arc::clone(item)]);
            }
        }
        regeneration.archive = resort;

        regeneration
    }

    /// Insert or replace a single item.
    ///
    /// A slug owned by another identifier is rejected and the state is left
    /// unchanged.
    pub fn upsert(&mut self, item: ContentItem) -> Result<Regeneration, DomainError> {
        if let Some(owner) = self.by_slug.get(&item.slug)
            && owner.id != item.id
        {
            return Err(DomainError::duplicate(
                "slug",
                item.slug.clone(),
                owner.id.get(),
            ));
        }

        let item = Arc::new(item);
        let mut regeneration = Regeneration::default();

        match self.by_id.get(&item.id).cloned() {
            Some(previous) => {
                regeneration = self.detach(&previous, &item);
                if let Ok(index) = self.position(item.id) {
                    self.items[index] = Arc::clone(&item);
                }
            }
            None => {
                let index = self.position(item.id).unwrap_or_else(|index| index);
                self.items.insert(index, Arc::clone(&item));
            }
        }

        self.by_id.insert(item.id, Arc::clone(&item));
        self.by_slug.insert(item.slug.clone(), Arc::clone(&item));
        self.relink();

        Ok(regeneration.merge(self.rebuild(&item, true)))
    }

    /// Binary search in the descending canonical sequence.
    fn position(&self, id: ContentId) -> Result<usize, usize> {
        self.items.binary_search_by(|entry| id.cmp(&entry.id))
    }

    /// Drop `previous` from every bucket `next` no longer belongs to.
    fn detach(&mut self, previous: &Arc<ContentItem>, next: &Arc<ContentItem>) -> Regeneration {
        let mut regeneration = Regeneration::default();

        if previous.slug != next.slug {
            self.by_slug.remove(&previous.slug);
        }

        if !previous.id.is_visible(self.threshold) {
            return regeneration;
        }

        for tag in previous.tags.difference(&next.tags) {
            if let Some(bucket) = self.tags.get_mut(tag) {
                remove_entry(bucket, previous.id);
                if bucket.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }

        if previous.series_id != next.series_id
            && let Some(bucket) = previous
                .series_id
                .and_then(|series_id| self.series.get_mut(&series_id))
        {
            regeneration.series |= remove_entry(&mut bucket.items, previous.id);
        }

        let old_key = ArchiveKey::of(previous.created_at);
        if old_key != ArchiveKey::of(next.created_at)
            && let Some(bucket) = self.archives.get_mut(&old_key)
        {
            regeneration.archive |= remove_entry(bucket, previous.id);
        }

        regeneration
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};

    use time::OffsetDateTime;
    use time::macros::datetime;

    use super::*;
    use crate::domain::types::SeriesId;

    fn item_at(id: u64, created_at: OffsetDateTime, tags: &[&str], series: Option<u32>) -> ContentItem {
        ContentItem {
            id: ContentId(id),
            slug: format!("post-{id}"),
            title: format!("Post {id}"),
            tags: tags.iter().map(|tag| tag.to_string()).collect::<BTreeSet<_>>(),
            series_id: series.map(SeriesId),
            created_at,
            updated_at: None,
            excerpt_html: String::new(),
        }
    }

    fn item(id: u64, tags: &[&str], series: Option<u32>) -> ContentItem {
        item_at(id, datetime!(2024-01-15 10:00 UTC), tags, series)
    }

    fn series(id: u32, name: &str) -> SeriesRecord {
        SeriesRecord {
            id: SeriesId(id),
            name: name.to_string(),
            description: String::new(),
        }
    }

    fn ids(items: &[Arc<ContentItem>]) -> Vec<u64> {
        items.iter().map(|item| item.id.get()).collect()
    }

    fn build(threshold: u64, items: Vec<ContentItem>) -> IndexState {
        IndexState::build(
            SiteProfile::default(),
            ContentId(threshold),
            vec![series(1, "Rust"), series(2, "Go")],
            items,
        )
        .expect("build should succeed")
    }

    fn assert_consistent(state: &IndexState) {
        let canonical: HashSet<ContentId> = state.items().iter().map(|item| item.id).collect();
        let by_id: HashSet<ContentId> = state.by_id.keys().copied().collect();
        let by_slug: HashSet<ContentId> = state.by_slug.values().map(|item| item.id).collect();

        assert_eq!(canonical.len(), state.items().len());
        assert_eq!(canonical, by_id);
        assert_eq!(canonical, by_slug);
        assert_eq!(state.by_slug.len(), state.items().len());

        for (tag, bucket) in &state.tags {
            let unique: HashSet<ContentId> = bucket.iter().map(|item| item.id).collect();
            assert_eq!(unique.len(), bucket.len(), "duplicate in tag {tag}");
        }

        let visible = state.visible_items();
        for window in visible.windows(2) {
            let newer = &window[0];
            let older = &window[1];
            assert_eq!(state.neighbors(newer.id).next, Some(older.id));
            assert_eq!(state.neighbors(older.id).prev, Some(newer.id));
        }
    }

    #[test]
    fn build_orders_newest_first_and_links_visible_items() {
        let state = build(
            1,
            vec![item(2, &[], None), item(5, &[], None), item(3, &[], None)],
        );

        assert_eq!(ids(state.items()), vec![5, 3, 2]);
        assert_eq!(
            state.neighbors(ContentId(5)),
            Neighbors {
                prev: None,
                next: Some(ContentId(3))
            }
        );
        assert_eq!(
            state.neighbors(ContentId(2)),
            Neighbors {
                prev: Some(ContentId(3)),
                next: None
            }
        );
        assert_consistent(&state);
    }

    #[test]
    fn items_below_threshold_stay_out_of_links_and_buckets() {
        let state = build(
            3,
            vec![
                item(1, &["rust"], Some(1)),
                item(2, &["rust"], Some(1)),
                item(3, &["rust"], Some(1)),
                item(4, &["rust"], Some(1)),
            ],
        );

        assert_eq!(state.len(), 4);
        assert!(state.get_by_slug("post-1").is_some());
        assert_eq!(state.neighbors(ContentId(2)), Neighbors::default());
        assert_eq!(state.neighbors(ContentId(3)).prev, Some(ContentId(4)));
        assert_eq!(state.neighbors(ContentId(3)).next, None);

        assert_eq!(ids(state.tag_items("rust")), vec![4, 3]);
        assert_eq!(
            ids(&state.series_bucket(SeriesId(1)).expect("series").items),
            vec![4, 3]
        );
        let archived: usize = state.archives().values().map(Vec::len).sum();
        assert_eq!(archived, 2);
        assert_consistent(&state);
    }

    #[test]
    fn duplicate_identifier_fails_the_build() {
        let mut twin = item(1, &[], None);
        twin.slug = "other".to_string();

        let err = IndexState::build(
            SiteProfile::default(),
            ContentId(1),
            Vec::new(),
            vec![item(1, &[], None), twin],
        )
        .expect_err("duplicate id");

        assert!(matches!(
            err,
            DomainError::Duplicate {
                entity: "identifier",
                ..
            }
        ));
    }

    #[test]
    fn duplicate_slug_fails_the_build() {
        let mut twin = item(2, &[], None);
        twin.slug = "post-1".to_string();

        let err = IndexState::build(
            SiteProfile::default(),
            ContentId(1),
            Vec::new(),
            vec![item(1, &[], None), twin],
        )
        .expect_err("duplicate slug");

        assert!(matches!(err, DomainError::Duplicate { entity: "slug", .. }));
    }

    #[test]
    fn unknown_series_is_not_indexed() {
        let state = build(1, vec![item(1, &[], Some(9))]);

        assert!(state.series().all(|bucket| bucket.items.is_empty()));
        assert!(state.get_by_id(ContentId(1)).is_some());
    }

    #[test]
    fn tag_buckets_hold_exactly_the_tagged_items() {
        let state = build(
            1,
            vec![
                item(1, &["rust", "async"], None),
                item(2, &["rust"], None),
                item(3, &["go"], None),
                item(4, &[], None),
            ],
        );

        for (tag, _) in state.tag_counts() {
            let expected: Vec<u64> = state
                .visible_items()
                .iter()
                .filter(|item| item.has_tag(tag))
                .map(|item| item.id.get())
                .collect();
            assert_eq!(ids(state.tag_items(tag)), expected, "tag {tag}");
        }
        assert_eq!(ids(state.tag_items("rust")), vec![2, 1]);
        assert_eq!(state.tag_counts().count(), 3);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut state = build(1, vec![item(1, &["rust"], Some(1)), item(2, &["rust"], Some(1))]);
        let target = Arc::clone(state.get_by_id(ContentId(1)).expect("item"));

        let first = state.rebuild(&target, true);
        let second = state.rebuild(&target, true);

        assert_eq!(first, Regeneration::ALL);
        assert_eq!(second, Regeneration::ALL);
        assert_eq!(ids(state.tag_items("rust")), vec![2, 1]);
        assert_eq!(
            ids(&state.series_bucket(SeriesId(1)).expect("series").items),
            vec![2, 1]
        );
        let archived: usize = state.archives().values().map(Vec::len).sum();
        assert_eq!(archived, 2);
        assert_consistent(&state);
    }

    #[test]
    fn bulk_build_scales_linearly_with_one_crowded_bucket() {
        const COUNT: u64 = 40_000;
        let items: Vec<ContentItem> = (1..=COUNT).map(|id| item(id, &["go"], Some(1))).collect();

        let started = std::time::Instant::now();
        let state = build(1, items);
        let elapsed = started.elapsed();

        assert_eq!(state.tag_items("go").len(), COUNT as usize);
        assert_eq!(state.tag_items("go")[0].id, ContentId(COUNT));
        assert_eq!(
            state.series_bucket(SeriesId(1)).expect("series").items.len(),
            COUNT as usize
        );
        assert_eq!(state.archives().len(), 1);
        assert!(
            elapsed < std::time::Duration::from_secs(3),
            "building {COUNT} items in one bucket took {elapsed:?}"
        );
    }

    #[test]
    fn bulk_rebuild_requests_no_regeneration() {
        let mut state = build(1, vec![item(1, &["rust"], Some(1))]);
        let target = Arc::clone(state.get_by_id(ContentId(1)).expect("item"));

        assert!(state.rebuild(&target, false).is_empty());
    }

    #[test]
    fn item_without_series_only_touches_archive() {
        let mut state = build(1, Vec::new());
        let regeneration = state.upsert(item(1, &["rust"], None)).expect("upsert");

        assert_eq!(
            regeneration,
            Regeneration {
                series: false,
                archive: true
            }
        );
    }

    #[test]
    fn upsert_new_item_takes_the_head_and_relinks() {
        let mut state = build(1, vec![item(1, &[], None), item(2, &[], Some(2))]);

        let regeneration = state.upsert(item(3, &["new"], Some(2))).expect("upsert");

        assert_eq!(regeneration, Regeneration::ALL);
        assert_eq!(ids(state.items()), vec![3, 2, 1]);
        assert_eq!(state.neighbors(ContentId(3)).next, Some(ContentId(2)));
        assert_eq!(state.neighbors(ContentId(2)).prev, Some(ContentId(3)));
        assert_eq!(
            ids(&state.series_bucket(SeriesId(2)).expect("series").items),
            vec![3, 2]
        );
        assert_consistent(&state);
    }

    #[test]
    fn upsert_creates_archive_bucket_lazily() {
        let mut state = build(1, vec![item(1, &[], None)]);
        assert_eq!(state.archives().len(), 1);

        state
            .upsert(item_at(2, datetime!(2024-02-01 00:00 UTC), &[], None))
            .expect("upsert");

        let keys: Vec<String> = state.archives().keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["2024-01", "2024-02"]);
    }

    #[test]
    fn edit_moves_item_between_buckets() {
        let mut state = build(1, vec![item(1, &["rust", "async"], Some(1)), item(2, &["rust"], None)]);

        let mut edited = item_at(1, datetime!(2023-12-31 23:00 UTC), &["async", "tokio"], Some(2));
        edited.slug = "renamed".to_string();
        let regeneration = state.upsert(edited).expect("upsert");

        assert_eq!(regeneration, Regeneration::ALL);
        assert_eq!(ids(state.tag_items("rust")), vec![2]);
        assert_eq!(ids(state.tag_items("tokio")), vec![1]);
        assert!(state.series_bucket(SeriesId(1)).expect("series").items.is_empty());
        assert_eq!(
            ids(&state.series_bucket(SeriesId(2)).expect("series").items),
            vec![1]
        );
        assert!(state.get_by_slug("post-1").is_none());
        assert_eq!(
            state.get_by_slug("renamed").map(|item| item.id),
            Some(ContentId(1))
        );
        // The emptied January bucket is kept.
        assert_eq!(state.archives().len(), 2);
        assert_eq!(
            state.archive_items(ArchiveKey::of(datetime!(2024-01-01 00:00 UTC))).len(),
            1
        );
        assert_consistent(&state);
    }

    #[test]
    fn dropping_last_tag_removes_the_bucket() {
        let mut state = build(1, vec![item(1, &["solo"], None)]);

        state.upsert(item(1, &[], None)).expect("upsert");

        assert!(state.tag_items("solo").is_empty());
        assert_eq!(state.tag_counts().count(), 0);
    }

    #[test]
    fn repeated_upsert_leaves_single_entries() {
        let mut state = build(1, vec![item(2, &["rust"], Some(1))]);

        for _ in 0..3 {
            state.upsert(item(1, &["rust"], Some(1))).expect("upsert");
        }

        assert_eq!(state.len(), 2);
        assert_eq!(ids(state.tag_items("rust")), vec![2, 1]);
        assert_eq!(
            ids(&state.series_bucket(SeriesId(1)).expect("series").items),
            vec![2, 1]
        );
        assert_consistent(&state);
    }

    #[test]
    fn slug_conflict_leaves_state_untouched() {
        let mut state = build(1, vec![item(1, &["rust"], None)]);
        let mut intruder = item(2, &["rust"], None);
        intruder.slug = "post-1".to_string();

        let err = state.upsert(intruder).expect_err("slug conflict");

        assert!(matches!(
            err,
            DomainError::Duplicate {
                entity: "slug",
                owner: 1,
                ..
            }
        ));
        assert_eq!(state.len(), 1);
        assert_eq!(ids(state.tag_items("rust")), vec![1]);
    }

    #[test]
    fn invisible_upsert_is_stored_but_not_indexed() {
        let mut state = build(5, vec![item(6, &[], None)]);

        let regeneration = state.upsert(item(2, &["rust"], Some(1))).expect("upsert");

        assert!(regeneration.is_empty());
        assert!(state.get_by_id(ContentId(2)).is_some());
        assert!(state.tag_items("rust").is_empty());
        assert_eq!(state.neighbors(ContentId(2)), Neighbors::default());
        assert_eq!(state.neighbors(ContentId(6)), Neighbors::default());
        assert_consistent(&state);
    }

    #[test]
    fn signals_follow_flags() {
        let signals: Vec<_> = Regeneration {
            series: false,
            archive: true,
        }
        .signals()
        .collect();
        assert_eq!(signals, vec![RegenerationSignal::Archive]);
        assert_eq!(Regeneration::ALL.signals().count(), 2);
    }
}
