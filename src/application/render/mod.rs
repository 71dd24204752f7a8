//! Markdown rendering used for excerpts and composite pages.
//!
//! The pipeline is pure: it accepts markdown, returns deterministic HTML, and
//! surfaces structured errors. Callers decide what a failure means (the
//! regeneration worker keeps the previous page, excerpts fall back to empty).

mod service;
mod types;

pub use service::ComrakRenderService;
pub use types::{RenderError, RenderRequest, RenderService, RenderTarget};
