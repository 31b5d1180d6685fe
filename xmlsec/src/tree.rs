//! Minimal XML element tree.
//!
//! The signature engine needs a DOM it can digest, splice, and re-render
//! deterministically; the event API alone is not enough. This tree keeps
//! exactly what the wire cares about: element names as written, attributes
//! in document order, text, and nothing else. Comments, processing
//! instructions, and the XML declaration are dropped on parse, and
//! whitespace-only text between elements is not preserved.

use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Parse(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("invalid UTF-8 in document")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("document has no root element")]
    NoRoot,
    #[error("content outside the root element")]
    TrailingContent,
}

/// A child of an element: a nested element or a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// One XML element: qualified name as written, attributes in document
/// order, children in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Local part of the element name, with any namespace prefix removed.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name, value));
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn push_element(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Builder-style child append.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.push_element(child);
        self
    }

    /// Builder-style text append.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Concatenated direct text content.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let Node::Text(t) = node {
                out.push_str(t);
            }
        }
        out
    }

    /// First descendant (including `self`) matching the predicate, in
    /// document order.
    pub fn find_descendant<F>(&self, pred: F) -> Option<&Element>
    where
        F: Fn(&Element) -> bool + Copy,
    {
        if pred(self) {
            return Some(self);
        }
        for child in self.child_elements() {
            if let Some(found) = child.find_descendant(pred) {
                return Some(found);
            }
        }
        None
    }

    /// Mutable variant of [`find_descendant`](Self::find_descendant).
    pub fn find_descendant_mut<F>(&mut self, pred: F) -> Option<&mut Element>
    where
        F: Fn(&Element) -> bool + Copy,
    {
        if pred(self) {
            return Some(self);
        }
        for child in &mut self.children {
            if let Node::Element(el) = child
                && let Some(found) = el.find_descendant_mut(pred)
            {
                return Some(found);
            }
        }
        None
    }

    /// Number of descendants (including `self`) matching the predicate.
    #[must_use]
    pub fn count_descendants<F>(&self, pred: F) -> usize
    where
        F: Fn(&Element) -> bool + Copy,
    {
        let mut count = usize::from(pred(self));
        for child in self.child_elements() {
            count += child.count_descendants(pred);
        }
        count
    }

    /// Removes `xmlns=""` declarations from this element and every
    /// descendant. The signing step can introduce them when an unqualified
    /// fragment is re-serialized, and the receiving service rejects them.
    pub fn strip_empty_namespace_decls(&mut self) {
        self.attributes
            .retain(|(name, value)| !(name == "xmlns" && value.is_empty()));
        for child in &mut self.children {
            if let Node::Element(el) = child {
                el.strip_empty_namespace_decls();
            }
        }
    }

    /// Parses a document and returns its root element.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let mut element =
                        Element::new(std::str::from_utf8(start.name().as_ref())?.to_string());
                    for attr in start.attributes() {
                        let attr = attr?;
                        element.attributes.push((
                            std::str::from_utf8(attr.key.as_ref())?.to_string(),
                            attr.unescape_value()?.into_owned(),
                        ));
                    }
                    stack.push(element);
                }
                Event::Empty(empty) => {
                    let mut element =
                        Element::new(std::str::from_utf8(empty.name().as_ref())?.to_string());
                    for attr in empty.attributes() {
                        let attr = attr?;
                        element.attributes.push((
                            std::str::from_utf8(attr.key.as_ref())?.to_string(),
                            attr.unescape_value()?.into_owned(),
                        ));
                    }
                    attach(element, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or(XmlError::NoRoot)?;
                    attach(element, &mut stack, &mut root)?;
                }
                Event::Text(text) => {
                    let content = text.unescape()?;
                    if content.trim().is_empty() {
                        continue;
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.push_text(content.into_owned()),
                        None => return Err(XmlError::TrailingContent),
                    }
                }
                Event::CData(cdata) => {
                    let content = std::str::from_utf8(&cdata)?.to_string();
                    match stack.last_mut() {
                        Some(parent) => parent.push_text(content),
                        None => return Err(XmlError::TrailingContent),
                    }
                }
                Event::Eof => break,
                // Declaration, comments, and processing instructions carry
                // no signable content.
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }

        root.ok_or(XmlError::NoRoot)
    }

    /// Parses a byte buffer as UTF-8 XML.
    pub fn parse_bytes(xml: &[u8]) -> Result<Self, XmlError> {
        Self::parse(std::str::from_utf8(xml)?)
    }

    /// Renders the element without an XML declaration.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }

    fn render(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.name);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(el) => el.render(out),
                Node::Text(text) => out.push_str(&escape_text(text)),
            }
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

fn attach(
    element: Element,
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_element(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError::TrailingContent),
    }
}

pub(crate) fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

pub(crate) fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
