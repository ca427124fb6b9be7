use anyhow::Result;

use crate::folio::dom::{self, Document};
use crate::folio::plugins::traits::Transformer;

/// Gives every heading a stable `h-<slug>` id so cross references and the
/// table of contents can link to it.
pub struct HeadingAnchors;

impl Transformer for HeadingAnchors {
    fn name(&self) -> &'static str {
        "heading-anchors"
    }

    fn transform(&self, doc: &Document) -> Result<()> {
        for heading in doc.select("h1, h2, h3, h4, h5, h6") {
            let id = anchor_id(&heading.text_contents());
            dom::set_attr(&heading, "id", &id);
        }
        Ok(())
    }
}

pub fn anchor_id(text: &str) -> String {
    format!("h-{}", kebab(&text.to_lowercase()))
}

/// Lowercase words joined by `-`. Apostrophes vanish, any other
/// non-alphanumeric run separates words, and so does a switch between
/// letters and digits.
fn kebab(text: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut last_digit = None;

    for ch in text.chars() {
        if ch == '\'' || ch == '\u{2019}' {
            continue;
        }
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            last_digit = None;
            continue;
        }

        let digit = ch.is_numeric();
        if last_digit.is_some_and(|prev| prev != digit) && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.extend(ch.to_lowercase());
        last_digit = Some(digit);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_follow_kebab_case() {
        assert_eq!(anchor_id("Title"), "h-title");
        assert_eq!(anchor_id("Getting Started!"), "h-getting-started");
        assert_eq!(anchor_id("  Rust's   ownership  "), "h-rusts-ownership");
        assert_eq!(anchor_id("Top 10 tips"), "h-top-10-tips");
        assert_eq!(anchor_id("HTTP2 & TLS"), "h-http-2-tls");
        assert_eq!(anchor_id(""), "h-");
    }

    #[test]
    fn every_heading_level_gets_an_id() {
        let doc = Document::parse("<h1>One</h1><h4>Deep <em>dive</em></h4><p>Body</p>");
        HeadingAnchors.transform(&doc).unwrap();
        assert_eq!(
            doc.to_html(),
            r#"<h1 id="h-one">One</h1><h4 id="h-deep-dive">Deep <em>dive</em></h4><p>Body</p>"#
        );
    }
}
