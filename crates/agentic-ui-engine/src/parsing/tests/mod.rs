//! Integration tests for the parsing module.
//!
//! Fixtures (.md) and snapshots (.snap) are co-located in `fixtures/`.

mod invariants;
mod roundtrip;

use crate::parsing::{parse, rules::MAX_NESTING, snapshot};
use crate::schema::{ElementKind, Node, TextRun};

// Fixture-based snapshot tests

#[test]
fn fixture_chat_reply() {
    assert_fixture("chat_reply");
}

#[test]
fn fixture_table_alignment() {
    assert_fixture("table_alignment");
}

#[test]
fn fixture_nested_quote() {
    assert_fixture("nested_quote");
}

#[test]
fn fixture_frontmatter_math() {
    assert_fixture("frontmatter_math");
}

fn assert_fixture(name: &str) {
    let fixtures_dir = format!("{}/src/parsing/tests/fixtures", env!("CARGO_MANIFEST_DIR"));
    let md = std::fs::read_to_string(format!("{fixtures_dir}/{name}.md")).unwrap();

    let schema = parse(&md).schema;
    snapshot::invariants(&schema);

    let tree = snapshot::normalize(&schema);
    insta::with_settings!({
        snapshot_path => fixtures_dir.as_str(),
        prepend_module_to_snapshot => false,
    }, {
        insta::assert_snapshot!(name, tree.trim_end());
    });
}

#[test]
fn empty_document() {
    assert!(parse("").schema.is_empty());
}

#[test]
fn blank_lines_only() {
    assert!(parse("\n\n  \n").schema.is_empty());
}

#[test]
fn parse_is_deterministic() {
    let md = "# a\n\n- [x] b\n\n> c";
    assert_eq!(parse(md), parse(md));
}

#[test]
fn bold_italic_is_single_run() {
    let schema = parse("***bold italic***").schema;
    assert_eq!(
        schema,
        vec![Node::paragraph(vec![Node::Text(TextRun {
            text: "bold italic".into(),
            bold: true,
            italic: true,
            ..TextRun::default()
        })])]
    );
}

#[test]
fn unclosed_constructs_become_text() {
    let schema = parse("**unclosed and `also unclosed").schema;
    assert_eq!(
        schema,
        vec![Node::paragraph(vec![Node::text(
            "**unclosed and `also unclosed"
        )])]
    );
}

#[test]
fn unclosed_fence_is_partial_code() {
    let schema = parse("```py\nprint(1)").schema;
    assert_eq!(schema, vec![Node::code(Some("py".into()), "print(1)", false)]);
}

#[test]
fn code_spans_are_raw_zones() {
    let schema = parse("`**not bold**`").schema;
    let run = schema[0].children()[0].as_text().unwrap();
    assert!(run.code);
    assert!(!run.bold);
    assert_eq!(run.text, "**not bold**");
}

#[test]
fn fenced_code_ignores_markdown() {
    let schema = parse("```\n# not a heading\n- nor a list\n```").schema;
    assert_eq!(schema.len(), 1);
    assert_eq!(schema[0].text_content(), "# not a heading\n- nor a list");
}

#[test]
fn heading_levels_are_preserved() {
    for level in 1..=6u8 {
        let md = format!("{} h", "#".repeat(usize::from(level)));
        let schema = parse(&md).schema;
        assert_eq!(schema[0].kind(), Some(&ElementKind::Head { level }));
    }
}

#[test]
fn crlf_line_endings() {
    assert_eq!(parse("# a\r\n\r\nb\r\n"), parse("# a\n\nb\n"));
}

fn quote_depth(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|n| match n.kind() {
            Some(ElementKind::Blockquote) => 1 + quote_depth(n.children()),
            _ => 0,
        })
        .max()
        .unwrap_or(0)
}

#[test]
fn shallow_quotes_nest() {
    assert_eq!(quote_depth(&parse("> > x").schema), 2);
}

#[test]
fn deep_quote_nesting_is_capped() {
    let schema = parse(&format!("{}x", "> ".repeat(1000))).schema;
    let depth = quote_depth(&schema);
    assert!(depth > 1 && depth <= MAX_NESTING, "depth {depth}");
    assert!(schema[0].text_content().ends_with('x'));
}

#[test]
fn deep_list_nesting_is_capped() {
    let schema = parse(&format!("{}x", "- ".repeat(1000))).schema;
    assert_eq!(schema[0].kind(), Some(&ElementKind::List { ordered: false, start: None }));
    assert!(schema[0].text_content().ends_with('x'));
}

#[test]
fn deep_inline_nesting_is_capped() {
    let links = format!("{}x{}", "[".repeat(2000), "](u)".repeat(2000));
    let marks = format!("{}x{}", "**_".repeat(500), "_**".repeat(500));
    for md in [links, marks] {
        let schema = parse(&md).schema;
        assert!(schema[0].text_content().contains('x'));
    }
}
