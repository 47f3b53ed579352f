//! A tag-dispatching markup rewriting engine.
//!
//! # Overview
//!
//! `weft` takes a parsed XML-like document tree and recursively rewrites it:
//! every element or attribute in the engine's reserved namespace is
//! dispatched to a handler function registered under its qualified name, and
//! the handler's output is spliced into a new tree. Handler failures are
//! rendered inline as substitute markup, so a partially broken document
//! still evaluates to well-formed output.
//!
//! ### Features
//!
//! - Explicit handler registry with a builder-style registration API
//! - Stateful handler receivers scoped to one evaluation session
//! - Eager or lazy evaluation of a dispatched element's children
//! - Built-in control tags: `ignore`, `children`, `include`, `bind`,
//!   `bind-at`, `surround`
//! - Two-phase layout composition via `surround`/`bind-at` slot binding
//! - Pluggable document source, dispatch predicates, and error rendering
//! - Per-node fault containment: one failing tag never aborts its siblings
//!
//! # Getting started
//!
//! Your entry point is the [`Engine`] struct. The engine stores the reserved
//! namespace, the handler registry, named documents, and the strategy slots
//! controlling dispatch and error rendering. Generally, you only need to
//! construct one engine during the lifetime of a program.
//!
//! ```
//! let engine = weft::Engine::new();
//! ```
//!
//! Handlers are registered under a qualified `<container>.<member>` name and
//! dispatched for elements carrying that name inside the reserved namespace
//! (`w` by default).
//!
//! ```
//! use weft::{AttrList, Element, Engine, Node};
//!
//! let mut engine = Engine::new();
//! engine.add_element_handler("app.greet", |_: &[Node], attrs: &AttrList| {
//!     let name = attrs.value("name").unwrap_or("world").to_owned();
//!     Ok(vec![Node::text(format!("Hello, {name}!"))])
//! });
//!
//! engine.add_document(
//!     "page",
//!     Element::new("p").with_child(Element::new("w:app.greet").with_attr("name", "Ferris")),
//! );
//!
//! let out = engine.evaluate("page")?;
//! assert_eq!(out[0].to_string(), "<p>Hello, Ferris!</p>");
//! # Ok::<(), weft::Error>(())
//! ```
//!
//! # Examples
//!
//! ### Layout composition
//!
//! A document can wrap itself in a named layout with `surround`; the
//! layout's `bind` elements pull content from the calling document's
//! `bind-at` fragments.
//!
//! ```
//! use weft::{Element, Engine};
//!
//! let mut engine = Engine::new();
//! engine.add_document(
//!     "layout",
//!     Element::new("html").with_child(Element::new("w:bind").with_attr("name", "content")),
//! );
//! engine.add_document(
//!     "page",
//!     Element::new("w:surround").with_attr("with", "layout").with_child(
//!         Element::new("w:bind-at").with_attr("name", "content").with_text("Hi!"),
//!     ),
//! );
//!
//! assert_eq!(engine.evaluate("page")?[0].to_string(), "<html>Hi!</html>");
//! # Ok::<(), weft::Error>(())
//! ```
//!
//! ### Stateful handlers
//!
//! A handler registered with a receiver constructor gets one receiver
//! instance per top-level evaluation, so state accumulates within a single
//! `evaluate` call and resets across calls.
//!
//! ```
//! use weft::{AttrList, Element, ElementHandler, Engine, HandlerResult, Node};
//!
//! #[derive(Default)]
//! struct Counter {
//!     n: usize,
//! }
//!
//! impl ElementHandler for Counter {
//!     fn handle(&mut self, _: &[Node], _: &AttrList) -> HandlerResult<Vec<Node>> {
//!         self.n += 1;
//!         Ok(vec![Node::text(self.n.to_string())])
//!     }
//! }
//!
//! let mut engine = Engine::new();
//! engine.add_element_receiver("app.count", Counter::default);
//! engine.add_document(
//!     "page",
//!     vec![
//!         Node::from(Element::new("w:app.count")),
//!         Node::from(Element::new("w:app.count")),
//!     ],
//! );
//!
//! let out = engine.evaluate("page")?;
//! assert_eq!(out, vec![Node::text("1"), Node::text("2")]);
//! # Ok::<(), weft::Error>(())
//! ```
//!
//! ### Documents from a dynamic source
//!
//! Stored documents cover the common case; a host that loads templates from
//! disk or a cache injects a source callback instead.
//!
//! ```
//! use weft::{Document, Element, Engine};
//!
//! let mut engine = Engine::new();
//! engine.set_document_source(|name| {
//!     if name == "generated" {
//!         Ok(Some(Document::from(Element::new("p").with_text("made up"))))
//!     } else {
//!         Ok(None)
//!     }
//! });
//!
//! assert_eq!(engine.evaluate("generated")?[0].to_string(), "<p>made up</p>");
//! # Ok::<(), weft::Error>(())
//! ```

mod error;
mod eval;
mod handler;
mod node;
pub mod replace;

use std::collections::BTreeMap;
use std::fmt;

pub use crate::error::{Error, Result, ERROR_CLASS};
pub use crate::handler::{
    AttributeHandler, ElementHandler, Fault, HandlerResult, HandlerSet,
};
pub use crate::node::{Attr, AttrList, Document, Element, Node, QName};

use crate::eval::SlotMap;
use crate::handler::HandlerEntry;

/// The reserved namespace prefix used by [`Engine::new`].
pub const DEFAULT_NAMESPACE: &str = "w";

const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

type IsElementFn = dyn Fn(&Element) -> bool + Send + Sync + 'static;
type IsAttributeFn = dyn Fn(&Attr, &Element) -> bool + Send + Sync + 'static;
type FindElementFn = dyn Fn(&Element) -> Option<Box<dyn ElementHandler>> + Send + Sync + 'static;
type FindAttributeFn =
    dyn Fn(&Attr, &Element) -> Option<Box<dyn AttributeHandler>> + Send + Sync + 'static;
type ElementErrorFn =
    dyn Fn(&str, Option<&Fault>, Option<&Element>) -> Vec<Node> + Send + Sync + 'static;
type AttributeErrorFn =
    dyn Fn(&str, Option<&Fault>, &Attr, &Element) -> Attr + Send + Sync + 'static;
type DocumentErrorFn = dyn Fn(&str) -> Vec<Node> + Send + Sync + 'static;
type DocumentFn =
    dyn Fn(&str) -> std::result::Result<Option<Document>, Fault> + Send + Sync + 'static;
type DebugFn = dyn Fn(fmt::Arguments<'_>) + Send + Sync + 'static;

fn debug_to_tracing(args: fmt::Arguments<'_>) {
    tracing::debug!(target: "weft", "{}", args);
}

/// The document evaluation engine.
///
/// Holds the reserved namespace, the handler registry, named documents, and
/// the strategy slots. Every slot is independently replaceable at runtime
/// through its `set_*` method; the defaults are documented on each. The
/// engine is `Send + Sync`: concurrent [`evaluate`][Engine::evaluate] calls
/// each run with their own independent session.
pub struct Engine {
    namespace: String,
    handlers: BTreeMap<String, HandlerEntry>,
    documents: BTreeMap<String, Document>,
    document_fn: Option<Box<DocumentFn>>,
    is_element_fn: Box<IsElementFn>,
    is_attribute_fn: Box<IsAttributeFn>,
    element_finder_fn: Option<Box<FindElementFn>>,
    attribute_finder_fn: Option<Box<FindAttributeFn>>,
    element_error_fn: Box<ElementErrorFn>,
    attribute_error_fn: Box<AttributeErrorFn>,
    document_error_fn: Box<DocumentErrorFn>,
    debug_fn: Box<DebugFn>,
    max_include_depth: usize,
}

/// A document paired with its precomputed `bind-at` slot map.
///
/// Constructed with [`Engine::template`]. The slot map is collected once by
/// scanning the document and is immutable afterwards, so a template is
/// stateless and safe to evaluate repeatedly, including concurrently.
pub struct Template<'engine> {
    engine: &'engine Engine,
    document: Document,
    slots: SlotMap,
}

impl Default for Engine {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Construct a new engine using the [`DEFAULT_NAMESPACE`].
    #[inline]
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    /// Construct a new engine with a custom reserved namespace.
    ///
    /// The namespace gates dispatch: the default predicates hand an element
    /// or attribute to a handler only when its name carries this prefix,
    /// and the built-in control tags live inside it.
    ///
    /// # Examples
    ///
    /// ```
    /// use weft::Engine;
    ///
    /// let engine = Engine::with_namespace("site");
    /// assert_eq!(engine.namespace(), "site");
    /// ```
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let ns = namespace.clone();
        let is_element_fn: Box<IsElementFn> =
            Box::new(move |el: &Element| el.name().in_namespace(&ns));
        let ns = namespace.clone();
        let is_attribute_fn: Box<IsAttributeFn> =
            Box::new(move |attr: &Attr, _: &Element| attr.name().in_namespace(&ns));
        Self {
            namespace,
            handlers: BTreeMap::new(),
            documents: BTreeMap::new(),
            document_fn: None,
            is_element_fn,
            is_attribute_fn,
            element_finder_fn: None,
            attribute_finder_fn: None,
            element_error_fn: Box::new(error::element_error),
            attribute_error_fn: Box::new(error::attribute_error),
            document_error_fn: Box::new(error::document_error),
            debug_fn: Box::new(debug_to_tracing),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// The reserved namespace prefix.
    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Add a stateless element handler under a qualified name.
    ///
    /// **Note:** element and attribute handlers share the same namespace; a
    /// name registered here resolves as "not found" when dispatched as an
    /// attribute handler.
    pub fn add_element_handler<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Node], &AttrList) -> HandlerResult<Vec<Node>> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), handler::element_fn(f));
    }

    /// Add an element handler constructed from `ctor` once per evaluation
    /// session.
    ///
    /// Within one [`evaluate`][Engine::evaluate] call every dispatch of
    /// `name` reuses the same receiver, so the receiver can accumulate
    /// session-scoped state. Outside a session a fresh receiver is
    /// constructed per dispatch.
    pub fn add_element_receiver<H, C>(&mut self, name: impl Into<String>, ctor: C)
    where
        H: ElementHandler + 'static,
        C: Fn() -> H + Send + Sync + 'static,
    {
        self.handlers
            .insert(name.into(), handler::element_receiver(ctor));
    }

    /// Add a stateless attribute handler under a qualified name.
    pub fn add_attribute_handler<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Attr) -> HandlerResult<Attr> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), handler::attribute_fn(f));
    }

    /// Add an attribute handler constructed from `ctor` once per evaluation
    /// session.
    pub fn add_attribute_receiver<H, C>(&mut self, name: impl Into<String>, ctor: C)
    where
        H: AttributeHandler + 'static,
        C: Fn() -> H + Send + Sync + 'static,
    {
        self.handlers
            .insert(name.into(), handler::attribute_receiver(ctor));
    }

    /// Add a whole [`HandlerSet`] under a container prefix.
    ///
    /// Each member `m` of the set is registered as `<container>.m`.
    pub fn add_handlers(&mut self, container: impl Into<String>, set: HandlerSet) {
        let container = container.into();
        for (member, entry) in set.entries {
            self.handlers.insert(format!("{container}.{member}"), entry);
        }
    }

    /// Add a named document to the engine's store.
    pub fn add_document(&mut self, name: impl Into<String>, document: impl Into<Document>) {
        self.documents.insert(name.into(), document.into());
    }

    /// Lookup a stored document by name.
    #[inline]
    pub fn get_document(&self, name: &str) -> Option<&Document> {
        self.documents.get(name)
    }

    /// Set the dynamic document source.
    ///
    /// The source is consulted for any name not present in the engine's own
    /// store. It is a trusted collaborator: an `Err` from it aborts the
    /// surrounding evaluation with [`Error::Source`]. Caching and staleness
    /// are entirely the source's concern. The default source resolves
    /// nothing.
    pub fn set_document_source<F>(&mut self, f: F)
    where
        F: Fn(&str) -> std::result::Result<Option<Document>, Fault> + Send + Sync + 'static,
    {
        self.document_fn = Some(Box::new(f));
    }

    /// Set the predicate deciding whether an element is dispatched at all.
    ///
    /// Default: the element's name is in the reserved namespace.
    pub fn set_is_handled_element<F>(&mut self, f: F)
    where
        F: Fn(&Element) -> bool + Send + Sync + 'static,
    {
        self.is_element_fn = Box::new(f);
    }

    /// Set the predicate deciding whether an attribute is dispatched.
    ///
    /// Default: the attribute's name is in the reserved namespace.
    pub fn set_is_handled_attribute<F>(&mut self, f: F)
    where
        F: Fn(&Attr, &Element) -> bool + Send + Sync + 'static,
    {
        self.is_attribute_fn = Box::new(f);
    }

    /// Replace the element handler resolution strategy.
    ///
    /// When set, the finder is consulted instead of the registry for every
    /// handled element (built-ins still win). Receivers it returns are
    /// per-dispatch; session receiver caching only applies to registry
    /// resolution. The default (no finder) resolves the element's local
    /// name against the registry.
    pub fn set_element_finder<F>(&mut self, f: F)
    where
        F: Fn(&Element) -> Option<Box<dyn ElementHandler>> + Send + Sync + 'static,
    {
        self.element_finder_fn = Some(Box::new(f));
    }

    /// Replace the attribute handler resolution strategy.
    ///
    /// Same contract as [`set_element_finder`][Engine::set_element_finder].
    pub fn set_attribute_finder<F>(&mut self, f: F)
    where
        F: Fn(&Attr, &Element) -> Option<Box<dyn AttributeHandler>> + Send + Sync + 'static,
    {
        self.attribute_finder_fn = Some(Box::new(f));
    }

    /// Replace the element error formatter.
    ///
    /// Receives the message, the captured fault, if any, and the failing
    /// element, when one is at hand, and produces the substitute markup.
    /// The default renders a `div` block carrying the [`ERROR_CLASS`]
    /// marker, a heading, and the fault's cause chain as a list.
    pub fn set_element_error<F>(&mut self, f: F)
    where
        F: Fn(&str, Option<&Fault>, Option<&Element>) -> Vec<Node> + Send + Sync + 'static,
    {
        self.element_error_fn = Box::new(f);
    }

    /// Replace the attribute error formatter.
    ///
    /// Receives the message, the captured fault, if any, the failing
    /// attribute, and its parent element. The default keeps the original
    /// attribute key and replaces the value with the message plus a
    /// truncated cause summary.
    pub fn set_attribute_error<F>(&mut self, f: F)
    where
        F: Fn(&str, Option<&Fault>, &Attr, &Element) -> Attr + Send + Sync + 'static,
    {
        self.attribute_error_fn = Box::new(f);
    }

    /// Replace the document-not-found formatter.
    pub fn set_document_error<F>(&mut self, f: F)
    where
        F: Fn(&str) -> Vec<Node> + Send + Sync + 'static,
    {
        self.document_error_fn = Box::new(f);
    }

    /// Replace the diagnostic hook.
    ///
    /// The engine reports contained failures (handler faults, resolution
    /// misses) through this hook. The default forwards to
    /// [`tracing::debug!`] under the `weft` target.
    pub fn set_debug_log<F>(&mut self, f: F)
    where
        F: Fn(fmt::Arguments<'_>) + Send + Sync + 'static,
    {
        self.debug_fn = Box::new(f);
    }

    /// Set the maximum depth of nested document evaluations.
    ///
    /// This bounds `include`/`surround` chains as counted from the root
    /// document. Exceeding it renders inline error markup in place of the
    /// offending sub-document rather than failing the evaluation. Defaults
    /// to 64.
    pub fn set_max_include_depth(&mut self, depth: usize) {
        self.max_include_depth = depth;
    }

    /// Evaluate a named document.
    ///
    /// Resolves the document through the store and the document source,
    /// opens a fresh evaluation session, and rewrites the document's tree.
    /// An unresolved name evaluates to the document-not-found error markup;
    /// the only `Err` is a failure of the injected document source.
    pub fn evaluate(&self, name: &str) -> Result<Vec<Node>> {
        match self.find_document(name)? {
            Some(doc) => {
                let slots = eval::scan_slots(&self.namespace, doc.nodes());
                eval::document(self, &doc, slots)
            }
            None => {
                self.debug(format_args!("document \"{name}\" not found"));
                Ok(self.render_document_error(name))
            }
        }
    }

    /// Evaluate a bare node sequence.
    ///
    /// No session is opened: stateful handlers get a fresh receiver on
    /// every dispatch. Use [`template`][Engine::template] or
    /// [`evaluate`][Engine::evaluate] for session semantics.
    pub fn evaluate_nodes(&self, nodes: &[Node]) -> Result<Vec<Node>> {
        eval::nodes(self, nodes)
    }

    /// Wrap a document in a [`Template`], precomputing its slot map.
    pub fn template(&self, document: impl Into<Document>) -> Template<'_> {
        Template::new(self, document.into())
    }

    ////////////////////////////////////////////////////////////////////////
    // Crate-internal accessors used by the evaluator.
    ////////////////////////////////////////////////////////////////////////

    pub(crate) fn find_document(&self, name: &str) -> Result<Option<Document>> {
        if let Some(doc) = self.documents.get(name) {
            return Ok(Some(doc.clone()));
        }
        match &self.document_fn {
            Some(f) => f(name).map_err(|source| Error::Source {
                name: name.to_owned(),
                source,
            }),
            None => Ok(None),
        }
    }

    pub(crate) fn handler_entry(&self, name: &str) -> Option<&HandlerEntry> {
        self.handlers.get(name)
    }

    pub(crate) fn is_element(&self) -> &IsElementFn {
        &*self.is_element_fn
    }

    pub(crate) fn is_attribute(&self) -> &IsAttributeFn {
        &*self.is_attribute_fn
    }

    pub(crate) fn element_finder(&self) -> Option<&FindElementFn> {
        self.element_finder_fn.as_deref()
    }

    pub(crate) fn attribute_finder(&self) -> Option<&FindAttributeFn> {
        self.attribute_finder_fn.as_deref()
    }

    pub(crate) fn render_element_error(
        &self,
        message: &str,
        fault: Option<&Fault>,
        node: Option<&Element>,
    ) -> Vec<Node> {
        (self.element_error_fn)(message, fault, node)
    }

    pub(crate) fn render_attribute_error(
        &self,
        message: &str,
        fault: Option<&Fault>,
        attr: &Attr,
        parent: &Element,
    ) -> Attr {
        (self.attribute_error_fn)(message, fault, attr, parent)
    }

    pub(crate) fn render_document_error(&self, name: &str) -> Vec<Node> {
        (self.document_error_fn)(name)
    }

    pub(crate) fn debug(&self, args: fmt::Arguments<'_>) {
        (self.debug_fn)(args)
    }

    pub(crate) fn max_include_depth(&self) -> usize {
        self.max_include_depth
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("namespace", &self.namespace)
            .field("handlers", &self.handlers.keys())
            .field("documents", &self.documents.keys())
            .field("max_include_depth", &self.max_include_depth)
            .finish_non_exhaustive()
    }
}

impl<'engine> Template<'engine> {
    fn new(engine: &'engine Engine, document: Document) -> Self {
        let slots = eval::scan_slots(engine.namespace(), document.nodes());
        Self {
            engine,
            document,
            slots,
        }
    }

    /// Evaluate the template inside a fresh session.
    pub fn evaluate(&self) -> Result<Vec<Node>> {
        eval::document(self.engine, &self.document, self.slots.clone())
    }

    /// The wrapped document.
    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The precomputed content fragment for a slot name, if the document
    /// contains a `bind-at` for it.
    pub fn slot(&self, name: &str) -> Option<&[Node]> {
        self.slots.get(name).map(Vec::as_slice)
    }
}

impl fmt::Debug for Template<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("slots", &self.slots.keys())
            .finish_non_exhaustive()
    }
}
