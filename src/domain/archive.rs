//! Monthly archive keys and the date formats used by composite pages.

use std::fmt;

use time::{Month, OffsetDateTime, format_description::FormatItem, macros::format_description};

/// Date shown next to every entry on the series and archive pages.
pub const ENTRY_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:short] [day], [year]");

/// `(year, month)` bucket key. Orders chronologically; `month` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveKey {
    pub year: i32,
    pub month: u8,
}

impl ArchiveKey {
    pub fn new(year: i32, month: Month) -> Self {
        Self {
            year,
            month: month as u8,
        }
    }

    /// Bucket a timestamp by its own calendar month (the offset it was
    /// recorded with, no timezone conversion).
    pub fn of(time: OffsetDateTime) -> Self {
        Self::new(time.year(), time.month())
    }

    /// Human label such as `January 2024`.
    pub fn label(&self) -> String {
        match Month::try_from(self.month) {
            Ok(month) => format!("{month} {}", self.year),
            Err(_) => self.to_string(),
        }
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}
