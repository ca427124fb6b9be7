use anyhow::Result;
use kuchikiki::NodeRef;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::folio::dom::{self, Document};
use crate::folio::plugins::traits::Transformer;

static CODEPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://codepen\.io/(?P<user>[^/]+)/pen/(?P<hash>[A-Za-z0-9]+)/?$")
        .expect("codepen link regex")
});

const EMBED_HEIGHT: &str = "300";

/// Expands paragraphs that contain nothing but a CodePen pen link into the
/// pen's iframe embed.
pub struct CodePenEmbeds;

impl Transformer for CodePenEmbeds {
    fn name(&self) -> &'static str {
        "codepen-embeds"
    }

    fn transform(&self, doc: &Document) -> Result<()> {
        for p in doc.select("p") {
            let Some(link) = sole_link(&p) else {
                continue;
            };
            let Some(href) = dom::attr(&link, "href") else {
                continue;
            };
            let Some(caps) = CODEPEN_RE.captures(&href) else {
                continue;
            };

            let user = &caps["user"];
            let hash = &caps["hash"];
            let title = link.text_contents();
            let title = title.trim();
            let title = if title.is_empty() || title == href {
                format!("Pen {hash} by {user}")
            } else {
                title.to_string()
            };

            let iframe = embed(user, hash, &title);
            dom::replace_with(&p, iframe);
        }
        Ok(())
    }
}

/// The only meaningful child of `p`, when it is a link.
fn sole_link(p: &NodeRef) -> Option<NodeRef> {
    let mut meaningful = p.children().filter(|child| {
        child
            .as_text()
            .map(|text| !text.borrow().trim().is_empty())
            .unwrap_or(true)
    });
    let first = meaningful.next()?;
    if meaningful.next().is_some() || !dom::is_tag(&first, "a") {
        return None;
    }
    Some(first)
}

fn embed(user: &str, hash: &str, title: &str) -> NodeRef {
    let src = format!("https://codepen.io/{user}/embed/{hash}?default-tab=html%2Cresult");
    let pen_url = format!("https://codepen.io/{user}/pen/{hash}");
    let author_url = format!("https://codepen.io/{user}");

    let iframe = dom::new_element(
        "iframe",
        &[
            ("height", EMBED_HEIGHT),
            ("style", "width: 100%;"),
            ("scrolling", "no"),
            ("title", title),
            ("frameborder", "no"),
            ("src", &src),
            ("loading", "lazy"),
            ("allowtransparency", "true"),
            ("allowfullscreen", "true"),
        ],
    );

    let pen = dom::new_element("a", &[("href", &pen_url)]);
    pen.append(NodeRef::new_text(title));
    let author = dom::new_element("a", &[("href", &author_url)]);
    author.append(NodeRef::new_text(format!("@{user}")));

    iframe.append(NodeRef::new_text("See the Pen "));
    iframe.append(pen);
    iframe.append(NodeRef::new_text(" by "));
    iframe.append(author);
    iframe.append(NodeRef::new_text(" on CodePen."));
    iframe
}
