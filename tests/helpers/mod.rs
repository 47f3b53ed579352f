#![allow(dead_code)]

use weft::{Fault, Node, ERROR_CLASS};

/// A handler fault with the given message.
pub fn fault(msg: &str) -> Fault {
    Fault::from(msg.to_owned())
}

/// Returns `true` if the tree contains an error block produced by the
/// default formatters, at any depth.
pub fn contains_error_block(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::Element(el) => {
            el.attr("class") == Some(ERROR_CLASS) || contains_error_block(el.children())
        }
        Node::Text(_) => false,
    })
}

/// Collects the text content of a tree in document order.
pub fn text_of(nodes: &[Node]) -> String {
    let mut out = String::new();
    collect_text(nodes, &mut out);
    out
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Element(el) => collect_text(el.children(), out),
            Node::Text(text) => out.push_str(text),
        }
    }
}
