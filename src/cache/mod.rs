//! Quire content cache.
//!
//! Holds every published item in memory together with its derived indexes:
//!
//! - **Canonical sequence**: newest first, with id and slug lookups
//! - **Links**: previous/next among visible items
//! - **Buckets**: tags, series and monthly archives
//! - **Composite pages**: series and archive pages rendered in the background
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! visibility_threshold = 1
//! page_size = 10
//! archive_compact_threshold = 12
//! # ... see config.rs for all options
//! ```

mod compose;
mod config;
mod events;
mod lock;
mod rebuild;
mod state;
mod store;
mod worker;

pub use compose::{archive_markdown, series_markdown};
pub use config::CacheConfig;
pub use events::{Published, RegenerationSignal, SIGNAL_QUEUE_CAPACITY, SignalQueue, SignalReceiver};
pub use rebuild::Regeneration;
pub use state::{IndexHandle, IndexState, SeriesBucket};
pub use store::{CacheError, ContentCache};
pub use worker::{RegenerationWorker, RenderedPages};
