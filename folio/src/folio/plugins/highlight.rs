use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::folio::dom::{self, Document};
use crate::folio::plugins::traits::Transformer;

const THEME_NAME: &str = "InspiredGitHub";
const INLINE_CODE_CLASSES: &[&str] = &["bg-gray-500", "px-2", "py-1", "text-white", "rounded"];

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// Highlights fenced code blocks and styles inline code.
pub struct CodeHighlighting;

impl CodeHighlighting {
    fn theme() -> Result<&'static Theme> {
        THEMES
            .themes
            .get(THEME_NAME)
            .with_context(|| format!("missing highlight theme {THEME_NAME}"))
    }
}

impl Transformer for CodeHighlighting {
    fn name(&self) -> &'static str {
        "code-highlighting"
    }

    fn transform(&self, doc: &Document) -> Result<()> {
        let blocks = doc.select("pre > code");
        if !blocks.is_empty() {
            let theme = Self::theme()?;
            for code in blocks {
                let Some(pre) = code.parent() else {
                    continue;
                };
                let language = code_language(&code);
                let source = code.text_contents();
                match highlight(&source, language.as_deref(), theme) {
                    Ok(html) => {
                        for node in dom::parse_fragment(&html) {
                            pre.insert_before(node);
                        }
                        pre.detach();
                    }
                    Err(err) => warn!("leaving code block unhighlighted: {err:#}"),
                }
            }
        }

        for code in doc.select("code") {
            if !dom::has_ancestor(&code, &["pre"]) {
                dom::add_classes(&code, INLINE_CODE_CLASSES);
            }
        }
        Ok(())
    }
}

/// Language token from the first `language-<name>` class.
fn code_language(code: &kuchikiki::NodeRef) -> Option<String> {
    dom::attr(code, "class")?
        .split_whitespace()
        .find_map(|class| class.strip_prefix("language-"))
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

pub fn highlight(source: &str, language: Option<&str>, theme: &Theme) -> Result<String> {
    let syntax = language
        .and_then(|lang| SYNTAXES.find_syntax_by_token(lang))
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text());
    debug!("highlighting code block as {}", syntax.name);
    highlighted_html_for_string(source, &SYNTAXES, syntax, theme)
        .context("rendering highlighted code")
}
