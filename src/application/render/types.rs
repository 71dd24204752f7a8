use std::fmt;

use thiserror::Error;

/// Identifies what is being rendered so failures can be attributed in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// Excerpt of a single content item.
    Excerpt { slug: String },
    /// Composite page listing every series.
    SeriesPage,
    /// Composite page listing every archive month.
    ArchivePage,
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderTarget::Excerpt { slug } => write!(f, "excerpt:{slug}"),
            RenderTarget::SeriesPage => f.write_str("series_page"),
            RenderTarget::ArchivePage => f.write_str("archive_page"),
        }
    }
}

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub target: RenderTarget,
    pub markdown: String,
}

impl RenderRequest {
    pub fn new(target: RenderTarget, markdown: impl Into<String>) -> Self {
        Self {
            target,
            markdown: markdown.into(),
        }
    }
}

/// Structured errors surfaced by the rendering pipeline.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed for {target}: {message}")]
    Markdown { target: String, message: String },
    #[error("renderer unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical HTML or errors.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<String, RenderError>;
}
