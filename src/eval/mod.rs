//! Evaluates a document tree against the engine's handler registry.

mod builtins;
mod core;

use std::collections::BTreeMap;

use crate::eval::core::EvalImpl;
use crate::node::{Document, Node};
use crate::{Engine, Result};

pub(crate) use crate::eval::builtins::scan_slots;

/// Slot name to content fragment, as collected from `bind-at` elements.
pub(crate) type SlotMap = BTreeMap<String, Vec<Node>>;

/// Evaluate a named document's tree inside a fresh session, with the
/// document's precomputed slot map in scope.
pub(crate) fn document(engine: &Engine, document: &Document, slots: SlotMap) -> Result<Vec<Node>> {
    EvalImpl::with_session(engine).document_scoped(document, slots)
}

/// Evaluate a bare node sequence. No session is opened: stateful handlers
/// get a fresh receiver on every dispatch.
pub(crate) fn nodes(engine: &Engine, nodes: &[Node]) -> Result<Vec<Node>> {
    EvalImpl::sessionless(engine).nodes(nodes)
}
