//! Serialising a parsed schema back to markdown and reparsing yields the
//! same schema.

use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::parsing::parse;
use crate::schema::to_markdown;

#[rstest]
#[case("# Title\n\nBody with **bold**, *italic*, ~~gone~~ and `code`.")]
#[case("1. one\n2. two\n\n- a\n  - nested\n- [x] done")]
#[case("> quoted\n>\n> > deeper")]
#[case("| a | b |\n| :-- | --: |\n| 1 | 2 |\n| 3 | 4 |")]
#[case("```rust\nfn main() {}\n```")]
#[case("$$\nx^2\n$$")]
#[case("---\ntitle: x\n---\n\ntext")]
#[case("***\n\nafter break")]
#[case("![alt](pic.png)\n\n[link](https://x.io \"T\")")]
#[case("escaped \\*stars\\* and \\[brackets\\]")]
#[case("\\# not a heading")]
#[case("\\- not a list")]
#[case("\\> not a quote")]
#[case("1\\. not ordered")]
#[case("\\---")]
#[case("\\| not | a table |")]
#[case("- \\# item text\n- \\> item text")]
#[case("> \\- quoted text")]
#[case("line one\n\\## line two")]
fn markdown_roundtrip_is_idempotent(#[case] md: &str) {
    let first = parse(md).schema;
    let again = parse(&to_markdown(&first)).schema;
    assert_eq!(first, again);
}
