//! Markdown sources of the series and archive pages.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::domain::archive::{ArchiveKey, ENTRY_DATE_FORMAT};
use crate::domain::entities::ContentItem;

use super::state::IndexState;

/// Escape link-text delimiters so titles cannot break the list syntax.
fn link_text(title: &str) -> String {
    title.replace('[', "\\[").replace(']', "\\]")
}

fn push_entry(out: &mut String, item: &ContentItem, marked: bool) {
    let date = item.created_at.format(ENTRY_DATE_FORMAT).unwrap_or_default();
    let marker = if marked { "*" } else { "" };
    let _ = writeln!(
        out,
        "* {marker}[{title}](/post/{slug}.html) <span class=\"date\">({date})</span>",
        title = link_text(&item.title),
        slug = item.slug,
    );
}

fn push_intro(out: &mut String, intro: &str) {
    let intro = intro.trim();
    if !intro.is_empty() {
        out.push_str(intro);
        out.push_str("\n\n");
    }
}

/// Series page: intro, then every series by identifier with its items.
pub fn series_markdown(state: &IndexState) -> String {
    let mut out = String::new();
    push_intro(&mut out, &state.profile().series_intro);

    for bucket in state.series() {
        let _ = writeln!(
            out,
            "<h3 id=\"toc-{id}\">{name}</h3>\n",
            id = bucket.record.id,
            name = ammonia::clean_text(&bucket.record.name),
        );

        let description = bucket.record.description.trim();
        if !description.is_empty() {
            out.push_str(description);
            out.push_str("\n\n");
        }

        for item in &bucket.items {
            push_entry(&mut out, item, false);
        }
        out.push('\n');
    }

    out
}

/// Archive page: intro, then months newest first.
///
/// More than `compact_threshold` months switches to one header per year with
/// the first entry of every month marked.
pub fn archive_markdown(state: &IndexState, compact_threshold: usize) -> String {
    let months: Vec<(&ArchiveKey, &Vec<Arc<ContentItem>>)> = state
        .archives()
        .iter()
        .rev()
        .filter(|(_, items)| !items.is_empty())
        .collect();
    let compact = months.len() > compact_threshold;

    let mut out = String::new();
    push_intro(&mut out, &state.profile().archive_intro);

    let mut current_year = None;
    for (key, items) in months {
        if compact {
            if current_year != Some(key.year) {
                if current_year.is_some() {
                    out.push('\n');
                }
                current_year = Some(key.year);
                let _ = writeln!(out, "### {}\n", key.year);
            }
        } else {
            let _ = writeln!(out, "### {}\n", key.label());
        }

        for (index, item) in items.iter().enumerate() {
            push_entry(&mut out, item, compact && index == 0);
        }
        if !compact {
            out.push('\n');
        }
    }

    out
}
