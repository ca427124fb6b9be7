use anyhow::Result;

use crate::folio::dom::{self, Document};
use crate::folio::plugins::traits::Transformer;

pub struct ClassRule {
    pub selector: &'static str,
    pub classes: &'static [&'static str],
}

/// Applied top to bottom.
pub const CLASS_RULES: &[ClassRule] = &[
    ClassRule {
        selector: "h1",
        classes: &["uk-h1", "pt-10"],
    },
    ClassRule {
        selector: "h2",
        classes: &["uk-h2", "pt-8"],
    },
    ClassRule {
        selector: "h3",
        classes: &["uk-h3", "pt-5"],
    },
    ClassRule {
        selector: "p",
        classes: &["uk-paragraph", "mt-1"],
    },
    ClassRule {
        selector: "ul",
        classes: &["uk-list", "uk-list-bullet", "mt-6", "list-disc"],
    },
    ClassRule {
        selector: "ol",
        classes: &["list-decimal"],
    },
    ClassRule {
        selector: "li",
        classes: &["mt-3"],
    },
    ClassRule {
        selector: "img",
        classes: &[
            "rounded-xl",
            "h-auto",
            "w-[350px]",
            "mx-auto",
            "transition-opacity",
            "will-change-opacity",
        ],
    },
    ClassRule {
        selector: "a",
        classes: &["uk-link", "hover:text-gray-400"],
    },
    ClassRule {
        selector: "table",
        classes: &["uk-table", "uk-table-striped"],
    },
    ClassRule {
        selector: "pre",
        classes: &["uk-padding", "rounded-xl", "mt-3"],
    },
    ClassRule {
        selector: "blockquote",
        classes: &["border-l-4", "border-gray-300", "pl-4", "italic"],
    },
    ClassRule {
        selector: "p.info-notice, p.warning-notice, p.success-notice, p.tip-notice",
        classes: &["uk-alert", "rounded-xl", "px-4", "py-3"],
    },
];

/// Adds the classes of every rule to the elements its selector matches.
pub struct ClassInjection {
    rules: &'static [ClassRule],
}

impl ClassInjection {
    pub fn new(rules: &'static [ClassRule]) -> Self {
        Self { rules }
    }
}

impl Default for ClassInjection {
    fn default() -> Self {
        Self::new(CLASS_RULES)
    }
}

impl Transformer for ClassInjection {
    fn name(&self) -> &'static str {
        "class-injection"
    }

    fn transform(&self, doc: &Document) -> Result<()> {
        for rule in self.rules {
            for node in doc.select(rule.selector) {
                dom::add_classes(&node, rule.classes);
            }
        }
        Ok(())
    }
}
