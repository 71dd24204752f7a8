//! Excerpt extraction for cached content.

use tracing::warn;

use crate::application::render::{RenderRequest, RenderService, RenderTarget};
use crate::domain::entities::ContentRecord;

/// How excerpts are cut from a body when the author did not write one.
#[derive(Debug, Clone)]
pub struct ExcerptRules {
    /// Everything before this marker is the excerpt.
    pub marker: String,
    /// Fallback cut, in characters, when the body has no marker.
    pub max_chars: usize,
}

impl Default for ExcerptRules {
    fn default() -> Self {
        Self {
            marker: "<!--more-->".to_string(),
            max_chars: 200,
        }
    }
}

/// Markdown source of the excerpt for `record`.
pub fn excerpt_markdown<'a>(record: &'a ContentRecord, rules: &ExcerptRules) -> &'a str {
    if let Some(excerpt) = record.excerpt_markdown.as_deref()
        && !excerpt.trim().is_empty()
    {
        return excerpt.trim();
    }

    let body = record.body_markdown.as_str();
    if !rules.marker.is_empty()
        && let Some(index) = body.find(rules.marker.as_str())
    {
        return body[..index].trim_end();
    }

    match body.char_indices().nth(rules.max_chars) {
        Some((cut, _)) => body[..cut].trim_end(),
        None => body.trim_end(),
    }
}

/// Render the excerpt of `record`, logging and falling back to an empty
/// excerpt when the renderer fails.
pub fn render_excerpt(
    renderer: &dyn RenderService,
    record: &ContentRecord,
    rules: &ExcerptRules,
) -> String {
    let markdown = excerpt_markdown(record, rules);
    if markdown.is_empty() {
        return String::new();
    }

    let request = RenderRequest::new(
        RenderTarget::Excerpt {
            slug: record.slug.clone(),
        },
        markdown,
    );

    match renderer.render(&request) {
        Ok(html) => html,
        Err(err) => {
            warn!(
                target = "quire::excerpt",
                content_id = %record.id,
                slug = %record.slug,
                error = %err,
                "Excerpt rendering failed; serving empty excerpt"
            );
            String::new()
        }
    }
}
