use comrak::{Options, markdown_to_html};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::folio::dom::Document;

static DOUBLE_ESCAPED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&amp;(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .expect("double escaped entity regex")
});

/// Markdown to document tree.
///
/// Soft newlines become hard breaks, GFM tables, strikethrough and autolinks
/// are on, and raw HTML is passed through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownConverter;

impl MarkdownConverter {
    pub fn to_html(&self, markdown: &str) -> String {
        let mut options = Options::default();
        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.render.hardbreaks = true;
        options.render.unsafe_ = true;

        let html = markdown_to_html(markdown, &options);
        unescape_entities(&html)
    }

    pub fn convert(&self, markdown: &str) -> Document {
        let html = self.to_html(markdown);
        debug!("converted {} bytes of markdown", markdown.len());
        Document::parse(&html)
    }
}

/// Collapse entities that were escaped twice (`&amp;gt;` back to `&gt;`).
pub fn unescape_entities(html: &str) -> String {
    DOUBLE_ESCAPED_RE.replace_all(html, "&$1;").into_owned()
}
