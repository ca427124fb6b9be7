use anyhow::{Context, Result};
use regex::Regex;

use crate::folio::dom::{self, Document};
use crate::folio::plugins::traits::Transformer;

/// Opens every outbound link in a new tab. Same-page `#fragment` links keep
/// their default target.
pub struct ExternalLinks;

impl Transformer for ExternalLinks {
    fn name(&self) -> &'static str {
        "external-links"
    }

    fn transform(&self, doc: &Document) -> Result<()> {
        for link in doc.select("a[href]") {
            let href = dom::attr(&link, "href").unwrap_or_default();
            if href.starts_with('#') {
                continue;
            }
            dom::set_attr(&link, "target", "_blank");
        }
        Ok(())
    }
}

/// Rewrites links into another document on the documentation host so they
/// point at the matching heading anchor on the current page.
pub struct CrossReferences {
    pattern: Regex,
}

impl CrossReferences {
    pub fn new(docs_host: &str) -> Result<Self> {
        let host = docs_host
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let pattern = Regex::new(&format!(
            r"^https://{}/doc[^#]*#(h-.*)$",
            regex::escape(host)
        ))
        .with_context(|| format!("building cross reference pattern for {host}"))?;
        Ok(Self { pattern })
    }
}

impl Transformer for CrossReferences {
    fn name(&self) -> &'static str {
        "cross-references"
    }

    fn transform(&self, doc: &Document) -> Result<()> {
        for link in doc.select("a[href]") {
            let Some(href) = dom::attr(&link, "href") else {
                continue;
            };
            let Some(caps) = self.pattern.captures(&href) else {
                continue;
            };
            dom::set_attr(&link, "href", &format!("#{}", &caps[1]));
            dom::remove_attr(&link, "target");
        }
        Ok(())
    }
}
