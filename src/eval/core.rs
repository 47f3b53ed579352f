//! The recursive rewrite walk.

use std::collections::HashMap;

use crate::eval::{scan_slots, SlotMap};
use crate::handler::{AttributeHandler, ElementHandler, HandlerEntry, HandlerResult};
use crate::node::{Attr, AttrList, Document, Element, Node};
use crate::{Engine, Result};

/// One tree evaluation in progress.
///
/// The bind-table and slot-scope stacks and the session receiver cache are
/// all plain fields here, scoped to exactly one call graph: concurrent
/// evaluations on the same engine never share them, and unwinding a scope
/// restores the previous value on every exit path.
pub(crate) struct EvalImpl<'engine> {
    engine: &'engine Engine,
    session: Option<Session>,
    /// Active bind-at tables, innermost `surround` last.
    binds: Vec<SlotMap>,
    /// Slot maps of the documents currently being evaluated, innermost last.
    slots: Vec<SlotMap>,
    depth: usize,
}

/// Receiver cache for one top-level evaluation.
#[derive(Default)]
pub(crate) struct Session {
    receivers: HashMap<String, Receiver>,
}

enum Receiver {
    Element(Box<dyn ElementHandler>),
    Attribute(Box<dyn AttributeHandler>),
}

impl<'engine> EvalImpl<'engine> {
    pub(crate) fn with_session(engine: &'engine Engine) -> Self {
        Self::new(engine, Some(Session::default()))
    }

    pub(crate) fn sessionless(engine: &'engine Engine) -> Self {
        Self::new(engine, None)
    }

    fn new(engine: &'engine Engine, session: Option<Session>) -> Self {
        Self {
            engine,
            session,
            binds: Vec::new(),
            slots: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn engine(&self) -> &'engine Engine {
        self.engine
    }

    pub(crate) fn bind_table(&self) -> Option<&SlotMap> {
        self.binds.last()
    }

    pub(crate) fn current_slots(&self) -> Option<&SlotMap> {
        self.slots.last()
    }

    /// Evaluate a sub-document with a bind table in scope, restoring the
    /// previous table on exit, error included.
    pub(crate) fn surround_scoped(&mut self, doc: &Document, table: SlotMap) -> Result<Vec<Node>> {
        self.binds.push(table);
        let result = self.document(doc);
        self.binds.pop();
        result
    }

    /// Evaluate a whole document, scanning it for `bind-at` slots first.
    pub(crate) fn document(&mut self, doc: &Document) -> Result<Vec<Node>> {
        let slots = scan_slots(self.engine.namespace(), doc.nodes());
        self.document_scoped(doc, slots)
    }

    /// Evaluate a whole document with a precomputed slot map in scope.
    pub(crate) fn document_scoped(&mut self, doc: &Document, slots: SlotMap) -> Result<Vec<Node>> {
        if self.depth >= self.engine.max_include_depth() {
            let message = "maximum include depth exceeded";
            self.engine.debug(format_args!("{message}"));
            return Ok(self.engine.render_element_error(message, None, None));
        }
        self.depth += 1;
        self.slots.push(slots);
        let result = self.nodes(doc.nodes());
        self.slots.pop();
        self.depth -= 1;
        result
    }

    /// Evaluate a node sequence, producing the rewritten sequence.
    pub(crate) fn nodes(&mut self, nodes: &[Node]) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Element(el) => out.extend(self.element(el)?),
                Node::Text(_) => out.push(node.clone()),
            }
        }
        Ok(out)
    }

    fn element(&mut self, el: &Element) -> Result<Vec<Node>> {
        // Built-ins are checked first and can never be shadowed.
        if let Some(out) = self.builtin(el)? {
            return Ok(out);
        }
        if (self.engine.is_element())(el) {
            return self.dispatch_element(el);
        }
        // Not handled: rebuild with independently evaluated attributes and
        // children, tag name and namespace untouched.
        let attrs = self.attributes(el);
        let children = self.nodes(el.children())?;
        Ok(vec![Node::Element(el.rebuild(attrs, children))])
    }

    fn dispatch_element(&mut self, el: &Element) -> Result<Vec<Node>> {
        let children = if is_eager(el) {
            self.nodes(el.children())?
        } else {
            el.children().to_vec()
        };

        // A custom finder takes precedence over the registry. Receivers it
        // returns are per-call; session caching only applies to registry
        // resolution, where the qualified name gives the receiver identity.
        let engine = self.engine;
        if let Some(find) = engine.element_finder() {
            return match find(el) {
                Some(mut handler) => {
                    let outcome = handler.handle(&children, el.attrs());
                    self.finish_element(el, outcome)
                }
                None => Ok(self.element_not_found(el)),
            };
        }

        let name = el.name().local().to_owned();
        let Some(mut handler) = self.element_receiver(&name) else {
            return Ok(self.element_not_found(el));
        };
        let outcome = handler.handle(&children, el.attrs());
        if let Some(session) = &mut self.session {
            session.receivers.insert(name, Receiver::Element(handler));
        }
        self.finish_element(el, outcome)
    }

    /// Handler output is itself subject to rewriting.
    fn finish_element(&mut self, el: &Element, outcome: HandlerResult<Vec<Node>>) -> Result<Vec<Node>> {
        match outcome {
            Ok(output) => self.nodes(&output),
            Err(fault) => {
                let message = format!("element handler for <{}> failed", el.name());
                self.engine.debug(format_args!("{message}: {fault}"));
                Ok(self.engine.render_element_error(&message, Some(&fault), Some(el)))
            }
        }
    }

    fn element_not_found(&self, el: &Element) -> Vec<Node> {
        let message = format!("no element handler found for <{}>", el.name());
        self.engine.debug(format_args!("{message}"));
        self.engine.render_element_error(&message, None, Some(el))
    }

    /// Looks the receiver up in the session cache, else constructs one from
    /// the registry. The caller stores it back into the session after use.
    fn element_receiver(&mut self, name: &str) -> Option<Box<dyn ElementHandler>> {
        if let Some(session) = &mut self.session {
            if let Some(receiver) = session.receivers.remove(name) {
                match receiver {
                    Receiver::Element(handler) => return Some(handler),
                    other => {
                        session.receivers.insert(name.to_owned(), other);
                    }
                }
            }
        }
        match self.engine.handler_entry(name) {
            Some(HandlerEntry::Element(ctor)) => Some(ctor()),
            _ => None,
        }
    }

    /// Evaluate an element's attribute list. Failures are contained per
    /// attribute, so this never errors.
    pub(crate) fn attributes(&mut self, el: &Element) -> AttrList {
        let mut out = Vec::with_capacity(el.attrs().len());
        for attr in el.attrs() {
            if (self.engine.is_attribute())(attr, el) {
                out.push(self.dispatch_attribute(attr, el));
            } else {
                out.push(attr.clone());
            }
        }
        out.into()
    }

    fn dispatch_attribute(&mut self, attr: &Attr, parent: &Element) -> Attr {
        let engine = self.engine;

        let outcome = if let Some(find) = engine.attribute_finder() {
            match find(attr, parent) {
                Some(mut handler) => handler.handle(attr),
                None => return self.attribute_not_found(attr, parent),
            }
        } else {
            let name = attr.name().local().to_owned();
            match self.attribute_receiver(&name) {
                Some(mut handler) => {
                    let outcome = handler.handle(attr);
                    if let Some(session) = &mut self.session {
                        session.receivers.insert(name, Receiver::Attribute(handler));
                    }
                    outcome
                }
                None => return self.attribute_not_found(attr, parent),
            }
        };

        match outcome {
            Ok(replacement) => replacement,
            Err(fault) => {
                let message = format!("attribute handler for `{}` failed", attr.name());
                engine.debug(format_args!("{message}: {fault}"));
                engine.render_attribute_error(&message, Some(&fault), attr, parent)
            }
        }
    }

    fn attribute_not_found(&self, attr: &Attr, parent: &Element) -> Attr {
        let message = format!("no attribute handler found for `{}`", attr.name());
        self.engine.debug(format_args!("{message}"));
        self.engine.render_attribute_error(&message, None, attr, parent)
    }

    fn attribute_receiver(&mut self, name: &str) -> Option<Box<dyn AttributeHandler>> {
        if let Some(session) = &mut self.session {
            if let Some(receiver) = session.receivers.remove(name) {
                match receiver {
                    Receiver::Attribute(handler) => return Some(handler),
                    other => {
                        session.receivers.insert(name.to_owned(), other);
                    }
                }
            }
        }
        match self.engine.handler_entry(name) {
            Some(HandlerEntry::Attribute(ctor)) => Some(ctor()),
            _ => None,
        }
    }
}

fn is_eager(el: &Element) -> bool {
    el.attr("eager").map(|v| v == "true").unwrap_or(false)
}
