//! Page-number pagination over the canonical content sequence.
//!
//! Out-of-range page numbers clamp to the nearest valid page so that stale
//! links degrade to the last page instead of failing.

use std::sync::Arc;

use crate::domain::{entities::ContentItem, types::ContentId};

/// One window over the canonical sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pagination {
    /// Page actually served after clamping; zero when nothing is visible.
    pub page: usize,
    pub prev: Option<usize>,
    pub next: Option<usize>,
    pub items: Vec<Arc<ContentItem>>,
}

impl Pagination {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Number of leading items that take part in pagination.
///
/// Scans from the tail and drops every item below the visibility threshold
/// until a visible one is met.
pub fn effective_len(items: &[Arc<ContentItem>], threshold: ContentId) -> usize {
    items
        .iter()
        .rposition(|item| item.id.is_visible(threshold))
        .map_or(0, |index| index + 1)
}

/// Compute the window for `page` (1-based) of `page_size` items.
pub fn paginate(
    items: &[Arc<ContentItem>],
    threshold: ContentId,
    page: usize,
    page_size: usize,
) -> Pagination {
    let len = effective_len(items, threshold);
    if len == 0 || page_size == 0 {
        return Pagination::empty();
    }

    let pages = len.div_ceil(page_size);
    let page = page.clamp(1, pages);

    let prev = (page > 1).then(|| page - 1);
    let next = (page < pages).then(|| page + 1);

    let start = (page - 1) * page_size;
    let end = (page * page_size).min(len);

    Pagination {
        page,
        prev,
        next,
        items: items[start..end].to_vec(),
    }
}
