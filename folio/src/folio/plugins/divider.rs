use anyhow::Result;

use crate::folio::dom::{self, Document};
use crate::folio::plugins::traits::Transformer;

/// Replaces horizontal rules with the site logo divider.
pub struct LogoDivider {
    logo_src: String,
    logo_alt: String,
}

impl LogoDivider {
    pub fn new(logo_src: impl Into<String>, logo_alt: impl Into<String>) -> Self {
        Self {
            logo_src: logo_src.into(),
            logo_alt: logo_alt.into(),
        }
    }
}

impl Transformer for LogoDivider {
    fn name(&self) -> &'static str {
        "logo-divider"
    }

    fn transform(&self, doc: &Document) -> Result<()> {
        for hr in doc.select("hr") {
            let divider = dom::new_element("div", &[("class", "uk-divider-icon text-center")]);
            divider.append(dom::new_element(
                "img",
                &[
                    ("class", "uk-icon-image w-7 h-7 m-auto"),
                    ("src", &self.logo_src),
                    ("alt", &self.logo_alt),
                ],
            ));
            dom::replace_with(&hr, divider);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_become_logo_dividers() {
        let doc = Document::parse("<p>a</p><hr><p>b</p>");
        LogoDivider::new("/logo.png", "Site logo").transform(&doc).unwrap();
        assert_eq!(
            doc.to_html(),
            r#"<p>a</p><div class="uk-divider-icon text-center"><img class="uk-icon-image w-7 h-7 m-auto" src="/logo.png" alt="Site logo"></div><p>b</p>"#
        );
    }

    #[test]
    fn documents_without_rules_are_unchanged() {
        let html = r#"<p>a</p><div class="uk-divider-icon"></div><p>b</p>"#;
        let doc = Document::parse(html);
        LogoDivider::new("/logo.png", "Site logo").transform(&doc).unwrap();
        assert_eq!(doc.to_html(), html);
    }
}
