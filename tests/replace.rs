use weft::replace::{replace, Pattern, Rule};
use weft::{Element, Node};

fn page() -> Vec<Node> {
    vec![Node::from(
        Element::new("html")
            .with_child(
                Element::new("head").with_child(Element::new("title").with_text("placeholder")),
            )
            .with_child(
                Element::new("body")
                    .with_child(Element::new("slot").with_attr("name", "content"))
                    .with_child(Element::new("slot").with_attr("name", "footer")),
            ),
    )]
}

#[test]
fn replaces_matches_at_every_depth() {
    let rules = [
        Rule::new(
            Pattern::element("slot").with_attr_value("name", "content"),
            vec![Node::text("CONTENT")],
        ),
        Rule::new(
            Pattern::element("slot").with_attr_value("name", "footer"),
            vec![Node::from(Element::new("footer").with_text("fin"))],
        ),
    ];
    let out = replace(&page(), &rules);
    assert_eq!(
        out[0].to_string(),
        "<html><head><title>placeholder</title></head>\
         <body>CONTENT<footer>fin</footer></body></html>"
    );
}

#[test]
fn unmatched_nodes_are_kept() {
    let rules = [Rule::new(Pattern::element("nomatch"), vec![])];
    assert_eq!(replace(&page(), &rules), page());
}

#[test]
fn scoped_pattern_requires_the_namespace() {
    let input = vec![
        Node::from(Element::new("w:slot")),
        Node::from(Element::new("slot")),
    ];
    let rules = [Rule::new(
        Pattern::scoped_element("w", "slot"),
        vec![Node::text("X")],
    )];
    let out = replace(&input, &rules);
    assert_eq!(out[0], Node::text("X"));
    assert_eq!(out[1], Node::from(Element::new("slot")));
}

#[test]
fn attr_presence_is_enough_without_a_value() {
    let input = vec![
        Node::from(Element::new("slot").with_attr("name", "anything")),
        Node::from(Element::new("slot")),
    ];
    let rules = [Rule::new(
        Pattern::element("slot").with_attr("name"),
        vec![Node::text("X")],
    )];
    let out = replace(&input, &rules);
    assert_eq!(out[0], Node::text("X"));
    assert_eq!(out[1], Node::from(Element::new("slot")));
}

#[test]
fn one_rule_can_expand_to_several_nodes() {
    let input = vec![Node::from(Element::new("gap"))];
    let rules = [Rule::new(
        Pattern::element("gap"),
        vec![Node::text("a"), Node::text("b")],
    )];
    assert_eq!(
        replace(&input, &rules),
        vec![Node::text("a"), Node::text("b")]
    );
}

#[test]
fn replacement_output_is_never_rematched() {
    let input = vec![Node::from(Element::new("seed"))];
    let rules = [
        Rule::new(
            Pattern::element("seed"),
            vec![Node::from(Element::new("seed").with_attr("generation", "2"))],
        ),
    ];
    // A naive fixed-point rewrite would loop forever here.
    let out = replace(&input, &rules);
    assert_eq!(
        out,
        vec![Node::from(Element::new("seed").with_attr("generation", "2"))]
    );
}

#[test]
fn text_rules_match_exact_content_only() {
    let input = vec![Node::text("old"), Node::text("older")];
    let rules = [Rule::new(Pattern::text("old"), vec![Node::text("new")])];
    assert_eq!(
        replace(&input, &rules),
        vec![Node::text("new"), Node::text("older")]
    );
}
