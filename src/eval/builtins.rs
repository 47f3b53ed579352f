//! Built-in control handlers.
//!
//! These are keyed by reserved tag names inside the engine's namespace and
//! are checked before any registered handler, so they can never be
//! shadowed. Each defines its own evaluation order for children; the
//! `eager` attribute only affects registered handlers.

use crate::eval::core::EvalImpl;
use crate::eval::SlotMap;
use crate::node::{Element, Node};
use crate::Result;

impl EvalImpl<'_> {
    /// Dispatch a built-in control element. Returns `None` when the element
    /// is not a built-in.
    pub(crate) fn builtin(&mut self, el: &Element) -> Result<Option<Vec<Node>>> {
        if !el.name().in_namespace(self.engine().namespace()) {
            return Ok(None);
        }
        let out = match el.name().local() {
            // Discards children entirely, whatever they contain.
            "ignore" => Vec::new(),
            // A syntactically required but semantically inert container.
            "children" => self.nodes(el.children())?,
            "include" => self.include(el)?,
            "bind" => self.bind(el)?,
            // Slot content is collected structurally at template
            // construction; in place it contributes nothing.
            "bind-at" => Vec::new(),
            "surround" => self.surround(el)?,
            _ => return Ok(None),
        };
        Ok(Some(out))
    }

    fn include(&mut self, el: &Element) -> Result<Vec<Node>> {
        let engine = self.engine();
        let Some(name) = el.attr("name") else {
            return Ok(engine.render_element_error(
                "include is missing the name attribute",
                None,
                Some(el),
            ));
        };
        match engine.find_document(name)? {
            Some(doc) => self.document(&doc),
            None => {
                engine.debug(format_args!("included document \"{name}\" not found"));
                Ok(engine.render_document_error(name))
            }
        }
    }

    fn bind(&mut self, el: &Element) -> Result<Vec<Node>> {
        let Some(name) = el.attr("name") else {
            return Ok(Vec::new());
        };
        match self.bind_table().and_then(|table| table.get(name)).cloned() {
            Some(fragment) => self.nodes(&fragment),
            None => Ok(Vec::new()),
        }
    }

    fn surround(&mut self, el: &Element) -> Result<Vec<Node>> {
        let engine = self.engine();
        let Some(name) = el.attr("with").or_else(|| el.attr("name")) else {
            return Ok(engine.render_element_error(
                "surround is missing the with attribute",
                None,
                Some(el),
            ));
        };
        let doc = match engine.find_document(name)? {
            Some(doc) => doc,
            None => {
                engine.debug(format_args!("surrounding document \"{name}\" not found"));
                return Ok(engine.render_document_error(name));
            }
        };
        // The surrounding layout's `bind` elements see the calling
        // document's slot map. Outside any document scope, the surround
        // element's own children are scanned instead.
        let table = match self.current_slots() {
            Some(slots) => slots.clone(),
            None => scan_slots(engine.namespace(), el.children()),
        };
        self.surround_scoped(&doc, table)
    }
}

/// Collects `bind-at` slot fragments from a tree. The last occurrence of a
/// name wins.
pub(crate) fn scan_slots(namespace: &str, nodes: &[Node]) -> SlotMap {
    let mut slots = SlotMap::new();
    collect(namespace, nodes, &mut slots);
    slots
}

fn collect(namespace: &str, nodes: &[Node], slots: &mut SlotMap) {
    for node in nodes {
        let Some(el) = node.as_element() else {
            continue;
        };
        if el.name().in_namespace(namespace) && el.name().local() == "bind-at" {
            if let Some(name) = el.attr("name") {
                slots.insert(name.to_owned(), el.children().to_vec());
            }
        }
        collect(namespace, el.children(), slots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_collects_nested_slots() {
        let nodes = vec![Node::Element(
            Element::new("div")
                .with_child(
                    Element::new("w:bind-at")
                        .with_attr("name", "title")
                        .with_text("Hello"),
                )
                .with_child(Element::new("section").with_child(
                    Element::new("w:bind-at").with_attr("name", "body").with_text("World"),
                )),
        )];
        let slots = scan_slots("w", &nodes);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots["title"], vec![Node::text("Hello")]);
        assert_eq!(slots["body"], vec![Node::text("World")]);
    }

    #[test]
    fn scan_last_occurrence_wins() {
        let nodes = vec![
            Node::Element(Element::new("w:bind-at").with_attr("name", "x").with_text("first")),
            Node::Element(Element::new("w:bind-at").with_attr("name", "x").with_text("second")),
        ];
        let slots = scan_slots("w", &nodes);
        assert_eq!(slots["x"], vec![Node::text("second")]);
    }

    #[test]
    fn scan_ignores_other_namespaces() {
        let nodes = vec![Node::Element(
            Element::new("other:bind-at").with_attr("name", "x").with_text("nope"),
        )];
        assert!(scan_slots("w", &nodes).is_empty());
    }
}
