//! The document model: elements, attributes, and text.
//!
//! Documents are plain owned value trees. Evaluation never mutates a tree in
//! place; every rewrite builds a new tree, so a [`Document`] can be shared
//! and re-evaluated freely. The "mutation" helpers on [`AttrList`] and
//! [`Element`] are whole-value rebuilds for the same reason.

use std::fmt;
use std::fmt::Write;

/// A tag or attribute name with an optional namespace prefix.
///
/// `QName` converts from `&str`, splitting on the first `:`, which keeps
/// construction terse:
///
/// ```
/// use weft::QName;
///
/// assert_eq!(QName::from("w:ignore"), QName::scoped("w", "ignore"));
/// assert_eq!(QName::from("div"), QName::new("div"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QName {
    namespace: Option<String>,
    local: String,
}

/// A single attribute: a [`QName`] key and a string value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attr {
    name: QName,
    value: String,
}

/// An ordered attribute sequence.
///
/// Lookups by local name return the first match regardless of namespace.
/// [`with`][AttrList::with] and [`without`][AttrList::without] rebuild the
/// whole list rather than editing in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttrList {
    attrs: Vec<Attr>,
}

/// A node in a document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Node {
    /// An element with a tag name, attributes, and children.
    Element(Element),
    /// A text leaf.
    Text(String),
}

/// An element node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Element {
    name: QName,
    attrs: AttrList,
    children: Vec<Node>,
}

/// A parsed document: an owned sequence of root nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    nodes: Vec<Node>,
}

impl QName {
    /// Construct an unqualified name.
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Construct a namespace-qualified name.
    pub fn scoped(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// The namespace prefix, if any.
    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The local part of the name.
    #[inline]
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Returns `true` if this name carries the given namespace prefix.
    #[inline]
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }
}

impl From<&str> for QName {
    fn from(s: &str) -> Self {
        match s.split_once(':') {
            Some((ns, local)) => Self::scoped(ns, local),
            None => Self::new(s),
        }
    }
}

impl From<String> for QName {
    fn from(s: String) -> Self {
        QName::from(s.as_str())
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

impl Attr {
    /// Construct an attribute.
    pub fn new(name: impl Into<QName>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The attribute key.
    #[inline]
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// The attribute value.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns a copy of this attribute with a different value.
    pub fn with_value(&self, value: impl Into<String>) -> Attr {
        Attr {
            name: self.name.clone(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=\"", self.name)?;
        escape(f, &self.value, true)?;
        f.write_char('"')
    }
}

impl AttrList {
    /// Construct an empty attribute list.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of attributes in the list.
    #[inline]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Returns `true` if the list has no attributes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Iterate over the attributes in order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Attr> {
        self.attrs.iter()
    }

    /// The first attribute with the given local name, any namespace.
    pub fn get(&self, local: &str) -> Option<&Attr> {
        self.attrs.iter().find(|a| a.name.local() == local)
    }

    /// The value of the first attribute with the given local name.
    pub fn value(&self, local: &str) -> Option<&str> {
        self.get(local).map(Attr::value)
    }

    /// Rebuild the list with the given attribute.
    ///
    /// An existing attribute with the same qualified name is replaced in
    /// position; otherwise the attribute is appended.
    pub fn with(&self, attr: Attr) -> AttrList {
        let mut attrs = self.attrs.clone();
        match attrs.iter().position(|a| a.name == attr.name) {
            Some(i) => attrs[i] = attr,
            None => attrs.push(attr),
        }
        AttrList { attrs }
    }

    /// Rebuild the list without any attribute of the given local name.
    pub fn without(&self, local: &str) -> AttrList {
        AttrList {
            attrs: self
                .attrs
                .iter()
                .filter(|a| a.name.local() != local)
                .cloned()
                .collect(),
        }
    }

    pub(crate) fn push(&mut self, attr: Attr) {
        self.attrs.push(attr);
    }
}

impl From<Vec<Attr>> for AttrList {
    fn from(attrs: Vec<Attr>) -> Self {
        Self { attrs }
    }
}

impl FromIterator<Attr> for AttrList {
    fn from_iter<I: IntoIterator<Item = Attr>>(iter: I) -> Self {
        Self {
            attrs: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a AttrList {
    type Item = &'a Attr;
    type IntoIter = std::slice::Iter<'a, Attr>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}

impl IntoIterator for AttrList {
    type Item = Attr;
    type IntoIter = std::vec::IntoIter<Attr>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.into_iter()
    }
}

impl Node {
    /// Construct a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Borrow this node as an element, if it is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Borrow this node as text, if it is a text leaf.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Element(_) => None,
            Node::Text(text) => Some(text),
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_owned())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(el) => fmt::Display::fmt(el, f),
            Node::Text(text) => escape(f, text, false),
        }
    }
}

impl Element {
    /// Construct an element with no attributes or children.
    pub fn new(name: impl Into<QName>) -> Self {
        Self {
            name: name.into(),
            attrs: AttrList::new(),
            children: Vec::new(),
        }
    }

    /// Append an attribute.
    pub fn with_attr(mut self, name: impl Into<QName>, value: impl Into<String>) -> Self {
        self.attrs.push(Attr::new(name, value));
        self
    }

    /// Append a child node.
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append a sequence of child nodes.
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Append a text child.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::text(text))
    }

    /// The tag name.
    #[inline]
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// The attribute list.
    #[inline]
    pub fn attrs(&self) -> &AttrList {
        &self.attrs
    }

    /// The child nodes.
    #[inline]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// The value of the first attribute with the given local name.
    #[inline]
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs.value(local)
    }

    /// Returns a new element with the same tag name but the given attributes
    /// and children.
    pub fn rebuild(&self, attrs: AttrList, children: Vec<Node>) -> Element {
        Element {
            name: self.name.clone(),
            attrs,
            children,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for attr in &self.attrs {
            write!(f, " {attr}")?;
        }
        if self.children.is_empty() {
            return f.write_str("/>");
        }
        f.write_char('>')?;
        for child in &self.children {
            fmt::Display::fmt(child, f)?;
        }
        write!(f, "</{}>", self.name)
    }
}

impl Document {
    /// Construct a document from a sequence of root nodes.
    pub fn new(nodes: impl Into<Vec<Node>>) -> Self {
        Self {
            nodes: nodes.into(),
        }
    }

    /// The root nodes.
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Consume the document, returning its root nodes.
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

impl From<Element> for Document {
    fn from(el: Element) -> Self {
        Self {
            nodes: vec![Node::Element(el)],
        }
    }
}

impl From<Vec<Node>> for Document {
    fn from(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}

impl FromIterator<Node> for Document {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            fmt::Display::fmt(node, f)?;
        }
        Ok(())
    }
}

/// Writes `s` with markup metacharacters escaped. Quotes are only escaped
/// inside attribute values.
fn escape(f: &mut fmt::Formatter<'_>, s: &str, in_attr: bool) -> fmt::Result {
    for c in s.chars() {
        match c {
            '&' => f.write_str("&amp;")?,
            '<' => f.write_str("&lt;")?,
            '>' => f.write_str("&gt;")?,
            '"' if in_attr => f.write_str("&quot;")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_from_str() {
        assert_eq!(QName::from("w:bind"), QName::scoped("w", "bind"));
        assert_eq!(QName::from("div"), QName::new("div"));
        assert!(QName::from("w:bind").in_namespace("w"));
        assert!(!QName::from("bind").in_namespace("w"));
    }

    #[test]
    fn attr_list_lookup_and_rebuild() {
        let attrs: AttrList = vec![
            Attr::new("id", "a"),
            Attr::new("w:x", "payload"),
            Attr::new("class", "b"),
        ]
        .into();

        assert_eq!(attrs.value("x"), Some("payload"));
        assert_eq!(attrs.value("missing"), None);

        let replaced = attrs.with(Attr::new("id", "z"));
        assert_eq!(replaced.value("id"), Some("z"));
        assert_eq!(replaced.len(), 3);
        assert_eq!(replaced.iter().next().unwrap().name().local(), "id");

        let removed = attrs.without("x");
        assert_eq!(removed.len(), 2);
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn element_builder() {
        let el = Element::new("div")
            .with_attr("class", "box")
            .with_child(Element::new("span").with_text("hi"))
            .with_text("there");
        assert_eq!(el.name().local(), "div");
        assert_eq!(el.attr("class"), Some("box"));
        assert_eq!(el.children().len(), 2);
    }

    #[test]
    fn display_escapes() {
        let el = Element::new("p")
            .with_attr("title", "a \"b\" & c")
            .with_text("1 < 2 & 3 > 2");
        assert_eq!(
            el.to_string(),
            r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp; 3 &gt; 2</p>"#
        );
    }

    #[test]
    fn display_self_closing() {
        let el = Element::new("w:bind").with_attr("name", "slot");
        assert_eq!(el.to_string(), r#"<w:bind name="slot"/>"#);
    }

    #[test]
    fn document_from_nodes() {
        let doc: Document = vec![Node::text("a"), Element::new("b").into()]
            .into_iter()
            .collect();
        assert_eq!(doc.nodes().len(), 2);
        assert_eq!(doc.to_string(), "a<b/>");
    }
}
