use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::{ListStyleType, Options};

/// Markup that rendered listings and excerpts may contain.
const ALLOWED_TAGS: [&str; 26] = [
    "a", "blockquote", "br", "code", "del", "em", "h1", "h2", "h3", "h4", "hr", "img", "li",
    "ol", "p", "pre", "span", "strong", "sup", "table", "tbody", "td", "th", "thead", "tr", "ul",
];

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Sanitizer shared by excerpts and composite pages.
///
/// Composite pages carry `<span class="date">` markers and `toc-*` anchors, so
/// `class` and `id` stay allowed.
pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    builder.tags(HashSet::from(ALLOWED_TAGS));
    builder.generic_attributes(HashSet::from(["class", "id", "title"]));
    builder.add_tag_attributes("img", &["alt", "width", "height"]);
    builder.add_tag_attributes("td", &["align"]);
    builder.add_tag_attributes("th", &["align"]);
    builder.add_url_schemes(["http", "https", "mailto"]);

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.superscript = true;
    ext.footnotes = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.list_style = ListStyleType::Star;
    render.r#unsafe = true;
    render.sourcepos = false;
}

#[cfg(test)]
mod tests {
    use super::build_sanitizer;

    #[test]
    fn sanitizer_keeps_date_spans_and_anchors() {
        let html = r#"<h3 id="toc-1">Rust</h3><span class="date">(Jan 02, 2024)</span>"#;
        let cleaned = build_sanitizer().clean(html).to_string();

        assert!(cleaned.contains(r#"id="toc-1""#));
        assert!(cleaned.contains(r#"<span class="date">"#));
    }

    #[test]
    fn sanitizer_strips_scripts() {
        let cleaned = build_sanitizer()
            .clean("<p>ok</p><script>alert(1)</script>")
            .to_string();

        assert_eq!(cleaned, "<p>ok</p>");
    }
}
