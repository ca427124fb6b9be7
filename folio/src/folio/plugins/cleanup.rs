use anyhow::Result;
use kuchikiki::NodeRef;
use kuchikiki::iter::NodeIterator;

use crate::folio::dom::{self, Document};
use crate::folio::plugins::traits::Transformer;

/// Removes paragraphs whose only content is a lone backslash, left behind by
/// editors that escape blank lines.
pub struct StrayBackslashes;

impl Transformer for StrayBackslashes {
    fn name(&self) -> &'static str {
        "stray-backslashes"
    }

    fn transform(&self, doc: &Document) -> Result<()> {
        for p in doc.select("p") {
            if p.text_contents().trim() == "\\" {
                p.detach();
            }
        }
        Ok(())
    }
}

/// Turns literal `\n` sequences in text into `<br>` elements. Code is left
/// alone.
pub struct LiteralLineBreaks;

impl Transformer for LiteralLineBreaks {
    fn name(&self) -> &'static str {
        "literal-line-breaks"
    }

    fn transform(&self, doc: &Document) -> Result<()> {
        let Some(body) = doc.body() else {
            return Ok(());
        };

        let texts: Vec<NodeRef> = body
            .descendants()
            .text_nodes()
            .map(|text| text.as_node().clone())
            .collect();

        for node in texts {
            let content = match node.as_text() {
                Some(text) => text.borrow().clone(),
                None => continue,
            };
            if !content.contains("\\n") || dom::has_ancestor(&node, &["pre", "code"]) {
                continue;
            }

            for (i, part) in content.split("\\n").enumerate() {
                if i > 0 {
                    node.insert_before(dom::new_element("br", &[]));
                }
                if !part.is_empty() {
                    node.insert_before(NodeRef::new_text(part));
                }
            }
            node.detach();
        }
        Ok(())
    }
}
