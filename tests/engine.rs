mod helpers;

use std::sync::{Arc, Mutex};
use std::thread;

use weft::{
    AttrList, Document, Element, Engine, Error, HandlerSet, Node, ERROR_CLASS,
};

#[test]
fn engine_debug() {
    format!("{:?}", Engine::new());
}

#[test]
fn engine_default() {
    let engine = Engine::default();
    assert_eq!(engine.namespace(), "w");
}

#[test]
fn engine_send_and_sync() {
    let mut engine = Engine::new();
    engine.add_element_handler("app.hi", |_: &[Node], _: &AttrList| {
        Ok(vec![Node::text("hi")])
    });
    thread::spawn(move || {
        let nodes = vec![Node::from(Element::new("w:app.hi"))];
        let result = engine.evaluate_nodes(&nodes).unwrap();
        assert_eq!(result, vec![Node::text("hi")]);
    })
    .join()
    .unwrap();
}

#[test]
fn engine_shared_across_threads() {
    let mut engine = Engine::new();
    engine.add_element_handler("app.hi", |_: &[Node], _: &AttrList| {
        Ok(vec![Node::text("hi")])
    });
    engine.add_document("page", Element::new("w:app.hi"));

    let engine = Arc::new(engine);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.evaluate("page").unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![Node::text("hi")]);
    }
}

#[test]
fn document_store_lookup() {
    let mut engine = Engine::new();
    assert!(engine.get_document("page").is_none());
    engine.add_document("page", Element::new("p").with_text("hello"));
    assert_eq!(
        engine.get_document("page").unwrap().to_string(),
        "<p>hello</p>"
    );
}

#[test]
fn document_store_takes_precedence_over_source() {
    let mut engine = Engine::new();
    engine.add_document("page", Element::new("p").with_text("stored"));
    engine.set_document_source(|_| {
        Ok(Some(Document::from(Element::new("p").with_text("dynamic"))))
    });
    let out = engine.evaluate("page").unwrap();
    assert_eq!(out[0].to_string(), "<p>stored</p>");
}

#[test]
fn document_source_consulted_for_missing_names() {
    let mut engine = Engine::new();
    engine.set_document_source(|name| {
        if name == "dynamic" {
            Ok(Some(Document::from(Element::new("p").with_text("dynamic"))))
        } else {
            Ok(None)
        }
    });
    let out = engine.evaluate("dynamic").unwrap();
    assert_eq!(out[0].to_string(), "<p>dynamic</p>");
}

#[test]
fn document_source_failure_propagates() {
    let mut engine = Engine::new();
    engine.set_document_source(|_| Err("disk on fire".into()));
    let err = engine.evaluate("anything").unwrap_err();
    assert_eq!(err.to_string(), "document source failed for \"anything\"");
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "disk on fire");
}

#[test]
fn unknown_document_renders_error_markup() {
    let engine = Engine::new();
    let out = engine.evaluate("missing").unwrap();
    assert!(helpers::contains_error_block(&out));
    assert!(out[0].to_string().contains("missing"));
}

#[test]
fn document_error_slot_is_replaceable() {
    let mut engine = Engine::new();
    engine.set_document_error(|name| vec![Node::text(format!("<<{name}>>"))]);
    let out = engine.evaluate("gone").unwrap();
    assert_eq!(out, vec![Node::text("<<gone>>")]);
}

#[test]
fn error_markup_carries_marker_class() {
    let engine = Engine::new();
    let out = engine.evaluate("missing").unwrap();
    let block = out[0].as_element().unwrap();
    assert_eq!(block.attr("class"), Some(ERROR_CLASS));
    let heading = block.children()[0].as_element().unwrap();
    assert_eq!(heading.name().local(), "h2");
}

#[test]
fn debug_hook_reports_contained_failures() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);

    let mut engine = Engine::new();
    engine.set_debug_log(move |args| sink.lock().unwrap().push(args.to_string()));
    engine.evaluate("missing").unwrap();

    let log = log.lock().unwrap();
    assert!(log.iter().any(|line| line.contains("missing")));
}

#[test]
fn custom_namespace_moves_the_builtins() {
    let mut engine = Engine::with_namespace("site");
    engine.add_document(
        "page",
        Element::new("div")
            .with_child(Element::new("site:ignore").with_text("dropped"))
            // Not in the reserved namespace any more, and unhandled.
            .with_child(Element::new("w:ignore").with_text("kept")),
    );
    let out = engine.evaluate("page").unwrap();
    assert_eq!(out[0].to_string(), "<div><w:ignore>kept</w:ignore></div>");
}

#[test]
fn handler_set_registers_under_container_prefix() {
    let mut engine = Engine::new();
    engine.add_handlers(
        "tags",
        HandlerSet::new()
            .element("hello", |_: &[Node], _: &AttrList| {
                Ok(vec![Node::text("hello")])
            })
            .element("world", |_: &[Node], _: &AttrList| {
                Ok(vec![Node::text("world")])
            }),
    );
    let nodes = vec![
        Node::from(Element::new("w:tags.hello")),
        Node::from(Element::new("w:tags.world")),
    ];
    let out = engine.evaluate_nodes(&nodes).unwrap();
    assert_eq!(out, vec![Node::text("hello"), Node::text("world")]);
}

#[test]
fn template_precomputes_slots() {
    let mut engine = Engine::new();
    engine.add_document("page", Element::new("p"));
    let doc = Document::from(
        Element::new("div").with_child(
            Element::new("w:bind-at")
                .with_attr("name", "title")
                .with_text("Hello"),
        ),
    );
    let template = engine.template(doc);
    assert_eq!(template.slot("title"), Some(&[Node::text("Hello")][..]));
    assert_eq!(template.slot("absent"), None);
}

#[test]
fn template_evaluates_repeatedly() {
    let mut engine = Engine::new();
    engine.add_element_handler("app.hi", |_: &[Node], _: &AttrList| {
        Ok(vec![Node::text("hi")])
    });
    let template = engine.template(Element::new("w:app.hi"));
    assert_eq!(template.evaluate().unwrap(), vec![Node::text("hi")]);
    assert_eq!(template.evaluate().unwrap(), vec![Node::text("hi")]);
    assert_eq!(template.document().to_string(), "<w:app.hi/>");
}

#[test]
fn evaluate_returns_err_only_for_source_faults() {
    // Handler faults and missing handlers are contained; the result is
    // always Ok for a resolvable document.
    let mut engine = Engine::new();
    engine.add_element_handler("app.boom", |_: &[Node], _: &AttrList| {
        Err("kaboom".into())
    });
    engine.add_document(
        "page",
        vec![
            Node::from(Element::new("w:app.boom")),
            Node::from(Element::new("w:app.unregistered")),
        ],
    );
    let result: Result<Vec<Node>, Error> = engine.evaluate("page");
    assert!(result.is_ok());
}
