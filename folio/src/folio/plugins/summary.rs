use crate::folio::dom::Document;

const DESCRIPTION_PARAGRAPHS: usize = 3;

/// Text of the first few paragraphs, one per line.
pub fn describe(doc: &Document) -> String {
    doc.select("p")
        .iter()
        .take(DESCRIPTION_PARAGRAPHS)
        .map(|p| p.text_contents().trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn word_count(doc: &Document) -> usize {
    doc.text().split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_uses_first_three_paragraphs() {
        let doc = Document::parse(
            "<h1>T</h1><p> one </p><p>two <em>2</em></p><pre>x</pre><p>three</p><p>four</p>",
        );
        assert_eq!(describe(&doc), "one\ntwo 2\nthree");
    }

    #[test]
    fn words_are_counted_across_blocks() {
        let doc = Document::parse("<h1>Hello world</h1>\n<p>one <em>two</em> three</p>\n");
        assert_eq!(word_count(&doc), 5);
    }

    #[test]
    fn empty_document_has_empty_description() {
        assert_eq!(describe(&Document::parse("")), "");
    }
}
