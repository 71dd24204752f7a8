//! Cache configuration.
//!
//! Controls visibility, pagination and composite page layout. Built from the
//! validated `[cache]` settings.

use crate::application::excerpt::ExcerptRules;
use crate::domain::types::ContentId;

// Default values for cache configuration
const DEFAULT_VISIBILITY_THRESHOLD: u64 = 1;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_ARCHIVE_COMPACT_THRESHOLD: usize = 12;
const DEFAULT_EXCERPT_MAX_CHARS: usize = 200;
const DEFAULT_EXCERPT_MARKER: &str = "<!--more-->";

/// Runtime cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lowest identifier that takes part in links, indexes and pagination.
    pub visibility_threshold: u64,
    /// Items per listing page.
    pub page_size: usize,
    /// Archive pages switch to the year-grouped layout above this many months.
    pub archive_compact_threshold: usize,
    /// Fallback excerpt length in characters.
    pub excerpt_max_chars: usize,
    /// Marker separating the excerpt from the rest of a body.
    pub excerpt_marker: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            page_size: DEFAULT_PAGE_SIZE,
            archive_compact_threshold: DEFAULT_ARCHIVE_COMPACT_THRESHOLD,
            excerpt_max_chars: DEFAULT_EXCERPT_MAX_CHARS,
            excerpt_marker: DEFAULT_EXCERPT_MARKER.to_string(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            visibility_threshold: settings.visibility_threshold,
            page_size: settings.page_size.get(),
            archive_compact_threshold: settings.archive_compact_threshold,
            excerpt_max_chars: settings.excerpt_max_chars,
            excerpt_marker: settings.excerpt_marker.clone(),
        }
    }
}

impl CacheConfig {
    pub fn threshold(&self) -> ContentId {
        ContentId(self.visibility_threshold)
    }

    pub fn excerpt_rules(&self) -> ExcerptRules {
        ExcerptRules {
            marker: self.excerpt_marker.clone(),
            max_chars: self.excerpt_max_chars,
        }
    }
}
