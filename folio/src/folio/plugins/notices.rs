use anyhow::Result;
use kuchikiki::NodeRef;
use kuchikiki::traits::*;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::folio::dom::{self, Document};
use crate::folio::plugins::traits::Transformer;

static NOTICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*:::(?P<kind>info|warning|success|tip)\b\s*").expect("notice marker regex")
});

const CLOSING_MARKER: &str = ":::";

/// Marker kind to icon name.
const NOTICE_ICONS: &[(&str, &str)] = &[
    ("info", "info"),
    ("warning", "warning"),
    ("success", "check"),
    ("tip", "circle-dot"),
];

pub fn notice_icon(kind: &str) -> Option<&'static str> {
    NOTICE_ICONS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, icon)| *icon)
}

/// Styles `:::kind` paragraphs as notices and drops closing `:::` lines,
/// including a `:::` that ends a later paragraph of the same notice.
pub struct Notices;

impl Transformer for Notices {
    fn name(&self) -> &'static str {
        "notices"
    }

    fn transform(&self, doc: &Document) -> Result<()> {
        let mut open = false;
        for p in doc.select("p") {
            if p.text_contents().trim() == CLOSING_MARKER {
                p.detach();
                open = false;
                continue;
            }

            let Some(first) = p.descendants().text_nodes().next() else {
                continue;
            };
            let opening = first.borrow().clone();
            let Some(caps) = NOTICE_RE.captures(&opening) else {
                if open && strip_closing_marker(&p) {
                    trim_edges(&p);
                    open = false;
                }
                continue;
            };
            let kind = caps["kind"].to_string();
            let Some(icon) = notice_icon(&kind) else {
                continue;
            };

            let marker_end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            first.replace(opening[marker_end..].to_string());
            open = !strip_closing_marker(&p);
            trim_edges(&p);

            dom::add_classes(&p, &[&format!("{kind}-notice")]);
            p.append(dom::new_element(
                "span",
                &[("class", "notice-icon"), ("uk-icon", &format!("icon: {icon}"))],
            ));
        }
        Ok(())
    }
}

/// Remove a trailing `:::` from the paragraph. Returns whether one was found.
fn strip_closing_marker(p: &NodeRef) -> bool {
    let Some(last) = p.descendants().text_nodes().last() else {
        return false;
    };
    let text = last.borrow().clone();
    match text.trim_end().strip_suffix(CLOSING_MARKER) {
        Some(rest) => {
            last.replace(rest.trim_end().to_string());
            true
        }
        None => false,
    }
}

/// Drop empty text nodes and `<br>` elements left at either end of the
/// paragraph once the markers are gone.
fn trim_edges(p: &NodeRef) {
    while let Some(child) = p.first_child() {
        if !is_blank(&child) {
            break;
        }
        child.detach();
    }
    while let Some(child) = p.last_child() {
        if !is_blank(&child) {
            break;
        }
        child.detach();
    }
}

fn is_blank(node: &NodeRef) -> bool {
    if dom::is_tag(node, "br") {
        return true;
    }
    node.as_text()
        .map(|text| text.borrow().trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(html: &str) -> String {
        let doc = Document::parse(html);
        Notices.transform(&doc).unwrap();
        doc.to_html()
    }

    #[test]
    fn tip_marker_becomes_notice_with_badge() {
        assert_eq!(
            run("<p>:::tip Remember this</p>"),
            r#"<p class="tip-notice">Remember this<span class="notice-icon" uk-icon="icon: circle-dot"></span></p>"#
        );
    }

    #[test]
    fn multi_line_notice_loses_both_markers() {
        assert_eq!(
            run("<p>:::success<br>Deployed<br>:::</p>"),
            r#"<p class="success-notice">Deployed<span class="notice-icon" uk-icon="icon: check"></span></p>"#
        );
    }

    #[test]
    fn lone_closing_marker_paragraph_is_removed() {
        assert_eq!(
            run("<p>:::warning Careful</p><p>:::</p><p>after</p>"),
            r#"<p class="warning-notice">Careful<span class="notice-icon" uk-icon="icon: warning"></span></p><p>after</p>"#
        );
    }

    #[test]
    fn notice_spanning_paragraphs_is_closed_in_the_last_one() {
        assert_eq!(
            run("<p>:::info<br>A</p><p>B<br>:::</p><p>after :::</p>"),
            r#"<p class="info-notice">A<span class="notice-icon" uk-icon="icon: info"></span></p><p>B</p><p>after :::</p>"#
        );
    }

    #[test]
    fn unknown_markers_stay_as_text() {
        let html = "<p>:::danger nope</p><p>:::tips nope</p><p>plain ::: text</p>";
        assert_eq!(run(html), html);
    }

    #[test]
    fn running_twice_changes_nothing() {
        let doc = Document::parse("<p>:::info Heads up</p>");
        Notices.transform(&doc).unwrap();
        let once = doc.to_html();
        Notices.transform(&doc).unwrap();
        assert_eq!(doc.to_html(), once);
    }
}
