//! Structural invariants over awkward inputs, including every prefix of a
//! document (what a streaming view shows mid-answer).

use rstest::rstest;

use crate::parsing::{parse, snapshot};

#[rstest]
#[case("")]
#[case("- ")]
#[case("> ")]
#[case("#")]
#[case("| a |\n| - |")]
#[case("| a | b |\n| - | - |\n| 1 |")]
#[case("- [ ]")]
#[case("> - a\n>   - b")]
#[case("***\n---\n___")]
#[case("**a *b* c**")]
#[case("[x](")]
#[case("```")]
#[case("$$")]
#[case("---")]
#[case("1. a\n\n   ```\n   code\n   ```\n2. b")]
fn awkward_inputs_keep_invariants(#[case] md: &str) {
    snapshot::invariants(&parse(md).schema);
}

#[test]
fn every_prefix_keeps_invariants() {
    let md = "---\nt: 1\n---\n# Title\n\n| a | b |\n| :- | -: |\n| 1 | 2 |\n\n\
              > quote **bold**\n\n- [x] task\n  - sub\n\n```js\nx\n```\n";
    for end in 0..=md.len() {
        if md.is_char_boundary(end) {
            snapshot::invariants(&parse(&md[..end]).schema);
        }
    }
}
