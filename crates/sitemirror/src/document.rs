//! Parsed page with addressable nodes
//!
//! The tree is parsed once with `scraper`. Attribute rewrites and element
//! removals are recorded per node and applied when the tree is serialized,
//! so the parsed tree itself is never mutated after construction.

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

/// Elements that never have an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are written verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

/// The root page of a mirror job
pub struct DocumentTree {
    html: Html,
    rewrites: HashMap<NodeId, Vec<(String, String)>>,
    removed: HashSet<NodeId>,
}

impl DocumentTree {
    /// Parse a full HTML document
    pub fn parse(text: &str) -> Self {
        Self {
            html: Html::parse_document(text),
            rewrites: HashMap::new(),
            removed: HashSet::new(),
        }
    }

    /// The underlying parsed document
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Current value of an element attribute, including rewrites
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        if let Some(value) = self.rewritten(node, name) {
            return Some(value);
        }
        let node = self.html.tree.get(node)?;
        node.value().as_element()?.attr(name)
    }

    /// Replace the value of an existing attribute on one element
    ///
    /// Returns false (and changes nothing) when the node is not an element
    /// or does not carry the attribute.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl Into<String>) -> bool {
        let has_attr = self
            .html
            .tree
            .get(node)
            .and_then(|n| n.value().as_element().and_then(|e| e.attr(name)))
            .is_some();
        if !has_attr {
            return false;
        }

        let entries = self.rewrites.entry(node).or_default();
        let value = value.into();
        match entries.iter_mut().find(|(attr, _)| attr == name) {
            Some(entry) => entry.1 = value,
            None => entries.push((name.to_string(), value)),
        }
        true
    }

    /// Leave an element and its subtree out of the serialized output
    ///
    /// Returns false when the node is not an element of this document.
    pub fn remove_element(&mut self, node: NodeId) -> bool {
        let is_element = self
            .html
            .tree
            .get(node)
            .is_some_and(|n| n.value().is_element());
        if is_element {
            self.removed.insert(node);
        }
        is_element
    }

    /// Serialize the document, rewrites included
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.serialize_node(self.html.tree.root(), &mut out);
        out
    }

    fn rewritten(&self, node: NodeId, name: &str) -> Option<&str> {
        self.rewrites
            .get(&node)?
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    fn serialize_node(&self, node: NodeRef<'_, Node>, out: &mut String) {
        if self.removed.contains(&node.id()) {
            return;
        }
        match node.value() {
            Node::Document | Node::Fragment => {
                for child in node.children() {
                    self.serialize_node(child, out);
                }
            }
            Node::Doctype(doctype) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(doctype.name());
                out.push('>');
            }
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::Text(text) => {
                let raw = node
                    .parent()
                    .and_then(|p| p.value().as_element().map(|e| e.name()))
                    .is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name));
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&html_escape::encode_text(&**text));
                }
            }
            Node::Element(element) => {
                let name = element.name();
                out.push('<');
                out.push_str(name);
                for (qual, value) in element.attrs.iter() {
                    let attr = attribute_name(qual.prefix.as_deref(), &qual.local);
                    let value = self.rewritten(node.id(), &attr).unwrap_or(&**value);
                    out.push(' ');
                    out.push_str(&attr);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&name) {
                    return;
                }
                for child in node.children() {
                    self.serialize_node(child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            _ => {}
        }
    }
}

/// Serialized attribute name, `prefix:local` for namespaced attributes
/// such as `xlink:href` and `xmlns:xlink`
fn attribute_name<'a>(prefix: Option<&str>, local: &'a str) -> Cow<'a, str> {
    match prefix {
        Some(prefix) => Cow::Owned(format!("{prefix}:{local}")),
        None => Cow::Borrowed(local),
    }
}

/// Iterate all elements in document order
pub(crate) fn elements(document: &DocumentTree) -> impl Iterator<Item = ElementRef<'_>> {
    document
        .html
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
}
