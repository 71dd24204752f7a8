//! Domain entities mirrored from persistent storage and their cached forms.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::{ContentId, SeriesId};

/// Content as stored by the persistence port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: ContentId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub body_markdown: String,
    /// Author-provided excerpt; when absent the excerpt is cut from the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt_markdown: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<SeriesId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

/// Content as held by the cache. Shared between buckets as `Arc<ContentItem>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub slug: String,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub series_id: Option<SeriesId>,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub excerpt_html: String,
}

impl ContentItem {
    pub fn from_record(record: ContentRecord, excerpt_html: String) -> Self {
        let ContentRecord {
            id,
            slug,
            title,
            tags,
            series_id,
            created_at,
            updated_at,
            ..
        } = record;

        Self {
            id,
            slug,
            title,
            tags,
            series_id,
            created_at,
            updated_at,
            excerpt_html,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Editorial series a content item can belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub id: SeriesId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Site metadata loaded (or created from defaults) at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub blog_name: String,
    #[serde(default)]
    pub subtitle: String,
    /// Markdown placed above the series listing.
    #[serde(default)]
    pub series_intro: String,
    /// Markdown placed above the archive listing.
    #[serde(default)]
    pub archive_intro: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            blog_name: "Quire".to_string(),
            subtitle: String::new(),
            series_intro: String::new(),
            archive_intro: String::new(),
        }
    }
}

/// Links to the chronologically adjacent visible items.
///
/// `prev` points at the newer neighbour, `next` at the older one, matching
/// the newest-first canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighbors {
    pub prev: Option<ContentId>,
    pub next: Option<ContentId>,
}
