//! Identifier newtypes shared across the cache and its persistence port.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Content identifier assigned by the persistence layer.
///
/// Identifiers grow monotonically, so a larger identifier always means newer
/// content. The visibility threshold is expressed as a `ContentId` too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub u64);

impl ContentId {
    pub fn get(self) -> u64 {
        self.0
    }

    /// Returns true when content with this identifier takes part in
    /// navigation links, tag/series/archive indexes and pagination.
    pub fn is_visible(self, threshold: ContentId) -> bool {
        self >= threshold
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(pub u32);

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
