//! A small mutable XML tree built on quick-xml events
//!
//! Worksheet, workbook and drawing parts are edited in place: the tree keeps
//! every element and attribute it does not understand, so parts written back
//! out carry the template's formatting untouched.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};

/// Standard declaration written at the top of every generated part
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// A child of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

/// An XML element with qualified name, ordered attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Qualified name as written (e.g. `xdr:pic`)
    pub name: String,
    /// Attributes in document order, values unescaped
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child appender
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    /// Builder-style text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Name without namespace prefix
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Namespace prefix, if any
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Attribute value by qualified name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value by local name, ignoring any prefix
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| local_part(key) == local && !key.starts_with("xmlns"))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Overwrite the attribute with local name `local`, keeping its prefix.
    /// Returns false when there is no such attribute.
    pub fn set_attr_local(&mut self, local: &str, value: impl Into<String>) -> bool {
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| local_part(key) == local && !key.starts_with("xmlns"))
        {
            Some((_, existing)) => {
                *existing = value.into();
                true
            }
            None => false,
        }
    }

    /// Remove every attribute whose local name matches, whatever its prefix
    pub fn remove_attr_local(&mut self, local: &str) {
        self.attributes
            .retain(|(key, _)| key.starts_with("xmlns") || local_part(key) != local);
    }

    /// Prefix bound to `namespace` by an `xmlns:*` declaration on this element
    pub fn namespace_prefix(&self, namespace: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, value)| key.starts_with("xmlns:") && value == namespace)
            .map(|(key, _)| &key["xmlns:".len()..])
    }

    /// Element children
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with the given local name
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|el| el.local_name() == local)
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|el| el.local_name() == local)
    }

    /// Index into `children` of the first element with the given local name
    pub fn position(&self, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, Node::Element(el) if el.local_name() == local))
    }

    /// Depth-first search for the first descendant with the given local name
    pub fn descendant(&self, local: &str) -> Option<&Element> {
        for el in self.elements() {
            if el.local_name() == local {
                return Some(el);
            }
            if let Some(found) = el.descendant(local) {
                return Some(found);
            }
        }
        None
    }

    pub fn descendant_mut(&mut self, local: &str) -> Option<&mut Element> {
        for el in self.elements_mut() {
            if el.local_name() == local {
                return Some(el);
            }
            if let Some(found) = el.descendant_mut(local) {
                return Some(found);
            }
        }
        None
    }

    /// Child element at `index` of `children`.
    ///
    /// Panics if that node is not an element; indices come from
    /// [`Element::position`] or from the caller's own insertions.
    pub fn child_at_mut(&mut self, index: usize) -> &mut Element {
        match &mut self.children[index] {
            Node::Element(el) => el,
            _ => panic!("child {index} of <{}> is not an element", self.name),
        }
    }

    /// First child with the given local name, inserting `make()` at the
    /// index chosen by `insert_at` when there is none
    pub fn ensure_child(
        &mut self,
        local: &str,
        insert_at: impl FnOnce(&Element) -> usize,
        make: impl FnOnce() -> Element,
    ) -> &mut Element {
        let index = match self.position(local) {
            Some(index) => index,
            None => {
                let index = insert_at(self).min(self.children.len());
                self.insert(index, make());
                index
            }
        };
        self.child_at_mut(index)
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn insert(&mut self, index: usize, child: Element) {
        self.children.insert(index, Node::Element(child));
    }

    /// Keep only the element children matching `keep`; text nodes survive
    pub fn retain_elements(&mut self, mut keep: impl FnMut(&Element) -> bool) {
        self.children.retain(|node| match node {
            Node::Element(el) => keep(el),
            _ => true,
        });
    }

    /// Whether any child is an element
    pub fn has_elements(&self) -> bool {
        self.elements().next().is_some()
    }

    /// Concatenated text content of this element and its descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Replace all children with a single text node
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Serialize this element (without declaration)
    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_xml(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(el) => el.write_to(out),
                Node::Text(text) => out.push_str(&escape_text(text)),
                Node::CData(data) => {
                    out.push_str("<![CDATA[");
                    out.push_str(data);
                    out.push_str("]]>");
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

/// A parsed XML part
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub root: Element,
}

impl XmlDocument {
    /// Parse a complete part into a tree
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => stack.push(element_from_start(e)?),
                Event::Empty(ref e) => {
                    let el = element_from_start(e)?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::End(_) => {
                    let el = stack.pop().ok_or_else(|| {
                        OoxmlError::InvalidStructure("unbalanced closing tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::Text(ref t) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = t
                            .unescape()
                            .map_err(|e| OoxmlError::XmlContent(e.to_string()))?;
                        if !text.is_empty() {
                            parent.children.push(Node::Text(text.into_owned()));
                        }
                    }
                }
                Event::CData(ref c) => {
                    if let Some(parent) = stack.last_mut() {
                        let data = String::from_utf8_lossy(c).into_owned();
                        parent.children.push(Node::CData(data));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(OoxmlError::InvalidStructure(format!(
                "unclosed element <{}>",
                stack[stack.len() - 1].name
            )));
        }

        root.map(|root| Self { root })
            .ok_or_else(|| OoxmlError::InvalidStructure("document has no root element".to_string()))
    }

    /// Serialize with the standard declaration
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(XML_DECLARATION);
        out.push('\n');
        self.root.write_to(&mut out);
        out
    }
}

fn element_from_start(e: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| OoxmlError::XmlContent(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| OoxmlError::XmlContent(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.push(el),
        None if root.is_none() => *root = Some(el),
        None => {
            return Err(OoxmlError::InvalidStructure(
                "multiple root elements".to_string(),
            ))
        }
    }
    Ok(())
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Element(inner) => collect_text(inner, out),
            Node::Text(text) | Node::CData(text) => out.push_str(text),
        }
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Escape special XML characters in attribute values
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
