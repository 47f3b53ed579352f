//! Handler function shapes and registry entries.
//!
//! A handler is referenced from a document by a qualified name of the form
//! `<container>.<member>` and registered on the engine ahead of time. Two
//! shapes exist: *element* handlers map `(children, attributes)` to a
//! replacement node sequence, and *attribute* handlers map an attribute to a
//! replacement attribute. Both shapes share one registry namespace; a name
//! registered with the other shape counts as not found for the requested
//! one.

use std::sync::Arc;

use crate::node::{Attr, AttrList, Node};

/// An error raised by a handler.
///
/// Faults are contained at the node or attribute where they occur and
/// rendered as substitute markup; they never abort the surrounding
/// evaluation.
pub type Fault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The result type returned by handler functions.
pub type HandlerResult<T> = std::result::Result<T, Fault>;

/// An element handler receiver.
///
/// Receivers may be stateful: within one top-level evaluation the engine
/// constructs a receiver lazily on first dispatch and reuses it for every
/// later dispatch of the same qualified name, so state accumulates for the
/// duration of that evaluation and no longer.
///
/// Any `FnMut(&[Node], &AttrList) -> HandlerResult<Vec<Node>>` closure is an
/// element handler.
pub trait ElementHandler {
    /// Produce the replacement node sequence for a dispatched element.
    fn handle(&mut self, children: &[Node], attrs: &AttrList) -> HandlerResult<Vec<Node>>;
}

/// An attribute handler receiver.
///
/// Any `FnMut(&Attr) -> HandlerResult<Attr>` closure is an attribute
/// handler. Receiver lifetime follows the same session rules as
/// [`ElementHandler`].
pub trait AttributeHandler {
    /// Produce the replacement for a dispatched attribute.
    fn handle(&mut self, attr: &Attr) -> HandlerResult<Attr>;
}

impl<F> ElementHandler for F
where
    F: FnMut(&[Node], &AttrList) -> HandlerResult<Vec<Node>>,
{
    fn handle(&mut self, children: &[Node], attrs: &AttrList) -> HandlerResult<Vec<Node>> {
        self(children, attrs)
    }
}

impl<F> AttributeHandler for F
where
    F: FnMut(&Attr) -> HandlerResult<Attr>,
{
    fn handle(&mut self, attr: &Attr) -> HandlerResult<Attr> {
        self(attr)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Registry entries
////////////////////////////////////////////////////////////////////////////////

/// A registered handler: a receiver constructor tagged with its shape.
pub(crate) enum HandlerEntry {
    Element(ElementCtor),
    Attribute(AttributeCtor),
}

pub(crate) type ElementCtor = Box<dyn Fn() -> Box<dyn ElementHandler> + Send + Sync + 'static>;
pub(crate) type AttributeCtor = Box<dyn Fn() -> Box<dyn AttributeHandler> + Send + Sync + 'static>;

/// Wraps a stateless element function so each "receiver" is a shared handle
/// to the same closure.
struct SharedElementFn<F>(Arc<F>);

impl<F> ElementHandler for SharedElementFn<F>
where
    F: Fn(&[Node], &AttrList) -> HandlerResult<Vec<Node>>,
{
    fn handle(&mut self, children: &[Node], attrs: &AttrList) -> HandlerResult<Vec<Node>> {
        (self.0)(children, attrs)
    }
}

struct SharedAttributeFn<F>(Arc<F>);

impl<F> AttributeHandler for SharedAttributeFn<F>
where
    F: Fn(&Attr) -> HandlerResult<Attr>,
{
    fn handle(&mut self, attr: &Attr) -> HandlerResult<Attr> {
        (self.0)(attr)
    }
}

pub(crate) fn element_fn<F>(f: F) -> HandlerEntry
where
    F: Fn(&[Node], &AttrList) -> HandlerResult<Vec<Node>> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    HandlerEntry::Element(Box::new(move || Box::new(SharedElementFn(Arc::clone(&f)))))
}

pub(crate) fn element_receiver<H, C>(ctor: C) -> HandlerEntry
where
    H: ElementHandler + 'static,
    C: Fn() -> H + Send + Sync + 'static,
{
    HandlerEntry::Element(Box::new(move || Box::new(ctor())))
}

pub(crate) fn attribute_fn<F>(f: F) -> HandlerEntry
where
    F: Fn(&Attr) -> HandlerResult<Attr> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    HandlerEntry::Attribute(Box::new(move || {
        Box::new(SharedAttributeFn(Arc::clone(&f)))
    }))
}

pub(crate) fn attribute_receiver<H, C>(ctor: C) -> HandlerEntry
where
    H: AttributeHandler + 'static,
    C: Fn() -> H + Send + Sync + 'static,
{
    HandlerEntry::Attribute(Box::new(move || Box::new(ctor())))
}

/// A group of handlers registered together under one container prefix.
///
/// The qualified name of every member becomes `<container>.<member>` when
/// the set is added to the engine with
/// [`add_handlers`][crate::Engine::add_handlers].
///
/// ```
/// use weft::{AttrList, Engine, HandlerSet, Node};
///
/// let mut engine = Engine::new();
/// engine.add_handlers(
///     "tags",
///     HandlerSet::new()
///         .element("hello", |_: &[Node], _: &AttrList| {
///             Ok(vec![Node::text("hello")])
///         })
///         .element("world", |_: &[Node], _: &AttrList| {
///             Ok(vec![Node::text("world")])
///         }),
/// );
/// ```
#[derive(Default)]
pub struct HandlerSet {
    pub(crate) entries: Vec<(String, HandlerEntry)>,
}

impl HandlerSet {
    /// Construct an empty handler set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stateless element handler member.
    pub fn element<F>(mut self, member: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Node], &AttrList) -> HandlerResult<Vec<Node>> + Send + Sync + 'static,
    {
        self.entries.push((member.into(), element_fn(f)));
        self
    }

    /// Add an element handler member constructed per evaluation session.
    pub fn element_receiver<H, C>(mut self, member: impl Into<String>, ctor: C) -> Self
    where
        H: ElementHandler + 'static,
        C: Fn() -> H + Send + Sync + 'static,
    {
        self.entries.push((member.into(), element_receiver(ctor)));
        self
    }

    /// Add a stateless attribute handler member.
    pub fn attribute<F>(mut self, member: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Attr) -> HandlerResult<Attr> + Send + Sync + 'static,
    {
        self.entries.push((member.into(), attribute_fn(f)));
        self
    }

    /// Add an attribute handler member constructed per evaluation session.
    pub fn attribute_receiver<H, C>(mut self, member: impl Into<String>, ctor: C) -> Self
    where
        H: AttributeHandler + 'static,
        C: Fn() -> H + Send + Sync + 'static,
    {
        self.entries.push((member.into(), attribute_receiver(ctor)));
        self
    }
}
