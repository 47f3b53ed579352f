//! Declarative structural node replacement.
//!
//! A convenience for handler authors: [`replace`] walks a node sequence
//! depth-first and substitutes every sub-node matching a [`Rule`], at any
//! depth, in a single pass. Replacement output is not re-matched, and the
//! handler registry is never consulted.
//!
//! ```
//! use weft::replace::{replace, Pattern, Rule};
//! use weft::{Element, Node};
//!
//! let input = vec![Node::Element(
//!     Element::new("div").with_child(Element::new("placeholder").with_text("old")),
//! )];
//! let rules = [Rule::new(Pattern::element("placeholder"), vec![Node::text("new")])];
//!
//! let out = replace(&input, &rules);
//! assert_eq!(out[0].to_string(), "<div>new</div>");
//! ```

use crate::node::Node;

/// A structural match condition for a single node.
#[derive(Debug, Clone)]
pub struct Pattern {
    kind: PatternKind,
}

#[derive(Debug, Clone)]
enum PatternKind {
    Element {
        namespace: Option<String>,
        local: String,
        attrs: Vec<(String, Option<String>)>,
    },
    Text(String),
}

/// A pattern paired with its replacement node sequence.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Pattern,
    replacement: Vec<Node>,
}

impl Pattern {
    /// Match an element by local name, any namespace.
    pub fn element(local: impl Into<String>) -> Self {
        Self {
            kind: PatternKind::Element {
                namespace: None,
                local: local.into(),
                attrs: Vec::new(),
            },
        }
    }

    /// Match an element by namespace and local name.
    pub fn scoped_element(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            kind: PatternKind::Element {
                namespace: Some(namespace.into()),
                local: local.into(),
                attrs: Vec::new(),
            },
        }
    }

    /// Match a text node by exact content.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: PatternKind::Text(content.into()),
        }
    }

    /// Additionally require an attribute with the given local name to be
    /// present. Element patterns only; a no-op on text patterns.
    pub fn with_attr(mut self, local: impl Into<String>) -> Self {
        if let PatternKind::Element { attrs, .. } = &mut self.kind {
            attrs.push((local.into(), None));
        }
        self
    }

    /// Additionally require an attribute with the given local name and
    /// exact value. Element patterns only; a no-op on text patterns.
    pub fn with_attr_value(mut self, local: impl Into<String>, value: impl Into<String>) -> Self {
        if let PatternKind::Element { attrs, .. } = &mut self.kind {
            attrs.push((local.into(), Some(value.into())));
        }
        self
    }

    fn matches(&self, node: &Node) -> bool {
        match (&self.kind, node) {
            (PatternKind::Element { namespace, local, attrs }, Node::Element(el)) => {
                if el.name().local() != local {
                    return false;
                }
                if let Some(ns) = namespace {
                    if !el.name().in_namespace(ns) {
                        return false;
                    }
                }
                attrs.iter().all(|(name, value)| match el.attr(name) {
                    Some(found) => value.as_deref().map(|v| v == found).unwrap_or(true),
                    None => false,
                })
            }
            (PatternKind::Text(content), Node::Text(text)) => content == text,
            _ => false,
        }
    }
}

impl Rule {
    /// Construct a rule replacing matches of `pattern` with `replacement`.
    pub fn new(pattern: Pattern, replacement: Vec<Node>) -> Self {
        Self {
            pattern,
            replacement,
        }
    }
}

/// Replace every sub-node matching a rule, at any depth.
///
/// The first matching rule wins. Unmatched elements are kept with their
/// children rewritten; replacement output is spliced in verbatim and not
/// re-matched.
pub fn replace(nodes: &[Node], rules: &[Rule]) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match rules.iter().find(|rule| rule.pattern.matches(node)) {
            Some(rule) => out.extend(rule.replacement.iter().cloned()),
            None => match node {
                Node::Element(el) => {
                    let children = replace(el.children(), rules);
                    out.push(Node::Element(el.rebuild(el.attrs().clone(), children)));
                }
                Node::Text(_) => out.push(node.clone()),
            },
        }
    }
    out
}
