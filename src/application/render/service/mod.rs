mod config;

use comrak::{Arena, format_html, nodes::AstNode, options::Options, parse_document};

use crate::application::render::types::{RenderError, RenderRequest, RenderService};

use config::{build_sanitizer, default_options};

/// Default Comrak-based rendering pipeline with Ammonia sanitisation.
pub struct ComrakRenderService {
    options: Options<'static>,
    sanitizer: ammonia::Builder<'static>,
}

impl ComrakRenderService {
    pub fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: build_sanitizer(),
        }
    }
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);

        let rendered_html = render_html_stage(root, &self.options, request)?;
        Ok(self.sanitizer.clean(&rendered_html).to_string())
    }
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &Options<'static>,
    request: &RenderRequest,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        target: request.target.to_string(),
        message: err.to_string(),
    })?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::RenderTarget;

    #[test]
    fn renders_markdown_lists_with_links() {
        let service = ComrakRenderService::new();
        let request = RenderRequest::new(
            RenderTarget::SeriesPage,
            "* [Hello](/post/hello.html) <span class=\"date\">(Jan 02, 2024)</span>\n",
        );

        let html = service.render(&request).expect("render succeeds");

        assert!(html.contains("<li>"));
        assert!(html.contains("href=\"/post/hello.html\""));
        assert!(html.contains("<span class=\"date\">(Jan 02, 2024)</span>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let service = ComrakRenderService::new();
        let request = RenderRequest::new(
            RenderTarget::Excerpt {
                slug: "intro".to_string(),
            },
            "Some *emphasis* and `code`.",
        );

        let first = service.render(&request).expect("first render");
        let second = service.render(&request).expect("second render");
        assert_eq!(first, second);
        assert!(first.contains("<em>emphasis</em>"));
    }

    #[test]
    fn series_heading_keeps_its_anchor() {
        let service = ComrakRenderService::new();
        let request = RenderRequest::new(
            RenderTarget::SeriesPage,
            "<h3 id=\"toc-3\">Caching</h3>\n\nAbout caching.\n",
        );

        let html = service.render(&request).expect("render succeeds");

        assert!(html.contains(r#"<h3 id="toc-3">Caching</h3>"#));
        assert!(html.contains("<p>About caching.</p>"));
    }
}
