//! Canonical XML 1.0 (the 2001 C14N recommendation).
//!
//! Canonicalization renders a subtree to the exact byte form both sides of
//! the wire digest: namespace declarations that change the inherited
//! context come first (sorted by prefix), attributes follow sorted by name,
//! empty elements are written as start/end pairs, and the escaping rules
//! differ between text and attribute content.
//!
//! This implements the subset of the recommendation exercised by the fiscal
//! schemas: no DTDs, no processing instructions, no relative namespace
//! URIs. Documents are produced by this crate's own builders, so the subset
//! is closed under everything we sign.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::tree::{Element, Node};

/// Canonicalizes `element` as a document subset rooted at that element,
/// with no inherited namespace context.
#[must_use]
pub fn canonicalize(element: &Element) -> String {
    let mut out = String::new();
    render(element, &BTreeMap::new(), &mut out);
    out
}

fn render(element: &Element, inherited: &BTreeMap<String, String>, out: &mut String) {
    let mut scope = inherited.clone();
    // Prefix -> URI pairs declared on this element that change the
    // rendered context. The apex of the subset has an empty context, so
    // every declaration there renders.
    let mut rendered_decls: Vec<(&str, &str)> = Vec::new();
    let mut attrs: Vec<(&str, &str)> = Vec::new();

    for (name, value) in &element.attributes {
        if let Some(prefix) = namespace_prefix(name) {
            let changes = scope.get(prefix).map(String::as_str) != Some(value.as_str());
            // An empty default declaration only renders when it undeclares
            // an inherited binding.
            let is_vacuous = prefix.is_empty() && value.is_empty() && !scope.contains_key("");
            if changes && !is_vacuous {
                rendered_decls.push((prefix, value));
            }
            scope.insert(prefix.to_string(), value.clone());
        } else {
            attrs.push((name, value));
        }
    }

    rendered_decls.sort_by_key(|(prefix, _)| *prefix);
    attrs.sort_by_key(|(name, _)| *name);

    let _ = write!(out, "<{}", element.name);
    for (prefix, uri) in rendered_decls {
        if prefix.is_empty() {
            let _ = write!(out, " xmlns=\"{}\"", escape_attr(uri));
        } else {
            let _ = write!(out, " xmlns:{prefix}=\"{}\"", escape_attr(uri));
        }
    }
    for (name, value) in attrs {
        let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
    }
    out.push('>');

    for child in &element.children {
        match child {
            Node::Element(el) => render(el, &scope, out),
            Node::Text(text) => out.push_str(&escape_text(text)),
        }
    }

    let _ = write!(out, "</{}>", element.name);
}

/// Returns the declared prefix (`""` for the default namespace) when the
/// attribute is a namespace declaration.
fn namespace_prefix(attr_name: &str) -> Option<&str> {
    if attr_name == "xmlns" {
        Some("")
    } else {
        attr_name.strip_prefix("xmlns:")
    }
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
    out
}
