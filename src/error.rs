//! Error types and the default error markup.
//!
//! Handler faults and resolution misses never escape an evaluation; they are
//! rendered inline as substitute markup by the formatters below (all of them
//! replaceable on the engine). The only error that propagates out of
//! [`evaluate`][crate::Engine::evaluate] is a failure of the injected
//! document source, a trusted collaborator.

use thiserror::Error;

use crate::handler::Fault;
use crate::node::{Attr, Element, Node};

/// A type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur during evaluation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The injected document source failed while resolving a name.
    #[error("document source failed for \"{name}\"")]
    Source {
        /// The document name being resolved.
        name: String,
        /// The underlying source failure.
        #[source]
        source: Fault,
    },
}

/// Class marker carried by every error fragment the default formatters
/// produce.
pub const ERROR_CLASS: &str = "weft-error";

const ATTR_SUMMARY_LEN: usize = 120;

/// Default element error markup: a `div` block with a heading and, when a
/// fault was captured, a list of its cause chain. The failing node itself
/// is not re-rendered.
pub(crate) fn element_error(
    message: &str,
    fault: Option<&Fault>,
    _node: Option<&Element>,
) -> Vec<Node> {
    let mut block = Element::new("div")
        .with_attr("class", ERROR_CLASS)
        .with_child(Element::new("h2").with_text(message));
    if let Some(fault) = fault {
        let mut list = Element::new("ul");
        let mut cause: Option<&dyn std::error::Error> = Some(fault.as_ref());
        while let Some(err) = cause {
            list = list.with_child(Element::new("li").with_text(err.to_string()));
            cause = err.source();
        }
        block = block.with_child(list);
    }
    vec![Node::Element(block)]
}

/// Default attribute error: the original key is kept and the value replaced
/// with the message plus a truncated cause summary.
pub(crate) fn attribute_error(
    message: &str,
    fault: Option<&Fault>,
    attr: &Attr,
    _parent: &Element,
) -> Attr {
    let mut value = match fault {
        Some(fault) => format!("[{message}: {fault}]"),
        None => format!("[{message}]"),
    };
    if value.len() > ATTR_SUMMARY_LEN {
        let mut end = ATTR_SUMMARY_LEN;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
        value.push_str("...]");
    }
    attr.with_value(value)
}

/// Default document-not-found markup.
pub(crate) fn document_error(name: &str) -> Vec<Node> {
    element_error(&format!("document \"{name}\" not found"), None, None)
}
