//! Mutable HTML document tree shared by every pipeline stage.
//!
//! Thin helpers over kuchikiki's `NodeRef` so stages can select, create and
//! replace elements without repeating attribute plumbing.

use kuchikiki::traits::*;
use kuchikiki::{Attribute, ExpandedName, NodeRef};
use log::warn;
use markup5ever::{LocalName, QualName, namespace_url, ns};

/// A parsed HTML document. Content produced by the converter lives under
/// `<body>`; [`Document::to_html`] serializes only that part.
pub struct Document {
    root: NodeRef,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            root: kuchikiki::parse_html().one(html).document_node,
        }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn body(&self) -> Option<NodeRef> {
        self.root
            .select_first("body")
            .ok()
            .map(|body| body.as_node().clone())
    }

    /// Collect every element matching `selector`, in document order.
    ///
    /// Results are collected up front so callers can detach or replace nodes
    /// while walking the list.
    pub fn select(&self, selector: &str) -> Vec<NodeRef> {
        match self.root.select(selector) {
            Ok(matches) => matches.map(|el| el.as_node().clone()).collect(),
            Err(()) => {
                warn!("invalid selector {selector:?}");
                Vec::new()
            }
        }
    }

    /// Inner HTML of `<body>`.
    pub fn to_html(&self) -> String {
        let Some(body) = self.body() else {
            return String::new();
        };
        let mut out = Vec::new();
        for child in body.children() {
            child.serialize(&mut out).ok();
        }
        String::from_utf8(out).unwrap_or_default()
    }

    /// Text content of `<body>`.
    pub fn text(&self) -> String {
        self.body()
            .map(|body| body.text_contents())
            .unwrap_or_default()
    }
}

/// Create a detached HTML element.
pub fn new_element(tag: &str, attributes: &[(&str, &str)]) -> NodeRef {
    NodeRef::new_element(
        QualName::new(None, ns!(html), LocalName::from(tag)),
        attributes.iter().map(|(name, value)| {
            (
                ExpandedName::new("", *name),
                Attribute {
                    prefix: None,
                    value: (*value).to_string(),
                },
            )
        }),
    )
}

/// Parse an HTML snippet and return its top-level nodes, detached and ready
/// to be inserted elsewhere.
pub fn parse_fragment(html: &str) -> Vec<NodeRef> {
    let scratch = Document::parse(html);
    let Some(body) = scratch.body() else {
        return Vec::new();
    };
    let nodes: Vec<NodeRef> = body.children().collect();
    for node in &nodes {
        node.detach();
    }
    nodes
}

pub fn is_tag(node: &NodeRef, tag: &str) -> bool {
    node.as_element()
        .map(|el| el.name.local.as_ref() == tag)
        .unwrap_or(false)
}

/// True when any ancestor of `node` is one of `tags`.
pub fn has_ancestor(node: &NodeRef, tags: &[&str]) -> bool {
    node.ancestors()
        .any(|ancestor| tags.iter().any(|tag| is_tag(&ancestor, tag)))
}

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|el| el.attributes.borrow().get(name).map(str::to_string))
}

/// Set an attribute, leaving the element untouched when it already holds
/// the same value.
pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    let Some(el) = node.as_element() else {
        return;
    };
    let mut attrs = el.attributes.borrow_mut();
    if attrs.get(name) == Some(value) {
        return;
    }
    attrs.insert(name, value.to_string());
}

/// Remove an attribute while keeping the order of the remaining ones.
pub fn remove_attr(node: &NodeRef, name: &str) {
    if let Some(el) = node.as_element() {
        el.attributes
            .borrow_mut()
            .map
            .shift_remove(&ExpandedName::new(ns!(), name));
    }
}

pub fn has_class(node: &NodeRef, class: &str) -> bool {
    attr(node, "class")
        .map(|value| value.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// Append each class that is not already present. Existing classes are
/// never removed or reordered. Returns whether the element changed.
pub fn add_classes(node: &NodeRef, classes: &[&str]) -> bool {
    let current = attr(node, "class").unwrap_or_default();
    let mut merged: Vec<&str> = current.split_whitespace().collect();
    let before = merged.len();

    for class in classes {
        if !merged.contains(class) {
            merged.push(*class);
        }
    }

    if merged.len() == before {
        return false;
    }

    let value = merged.join(" ");
    set_attr(node, "class", &value);
    true
}

/// Put `replacement` where `node` was and detach `node`.
pub fn replace_with(node: &NodeRef, replacement: NodeRef) {
    node.insert_before(replacement);
    node.detach();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_classes_is_additive_and_deduplicated() {
        let doc = Document::parse(r#"<p class="lead mt-1">x</p>"#);
        let p = doc.select("p").remove(0);

        assert!(add_classes(&p, &["uk-paragraph", "mt-1"]));
        assert_eq!(attr(&p, "class").as_deref(), Some("lead mt-1 uk-paragraph"));

        assert!(!add_classes(&p, &["uk-paragraph", "mt-1"]));
        assert_eq!(doc.to_html(), r#"<p class="lead mt-1 uk-paragraph">x</p>"#);
    }

    #[test]
    fn fragment_nodes_can_replace_elements() {
        let doc = Document::parse("<hr><p>after</p>");
        let hr = doc.select("hr").remove(0);
        for node in parse_fragment("<div>one</div><div>two</div>") {
            hr.insert_before(node);
        }
        hr.detach();

        assert_eq!(doc.to_html(), "<div>one</div><div>two</div><p>after</p>");
    }

    #[test]
    fn invalid_selector_selects_nothing() {
        let doc = Document::parse("<p>x</p>");
        assert!(doc.select("p[").is_empty());
    }
}
