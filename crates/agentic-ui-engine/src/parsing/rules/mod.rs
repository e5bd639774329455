//! # Rule Engine
//!
//! An explicit, immutable table of markdown constructs. Each [`Rule`] pairs a
//! matcher with a builder (`run`) that turns matched text into schema nodes.
//!
//! ## Rule scopes
//!
//! - **Block rules** (`table`, `code`, `hr`, `frontmatter`) have no trigger
//!   key. The line classifier uses them to spot openers; the block builder
//!   then hands the whole delimited block to `run`.
//! - **Text-match rules** carry a `match_key`, the character whose typing
//!   can complete the construct. Line rules (`head`, `task`, `list`,
//!   `blockquote`) trigger on space; inline rules trigger on their closing
//!   delimiter.
//!
//! ## Precedence
//!
//! Rules are tried in table order. `boldAndItalic` sits before `bold` and
//! `bold` before `italic`, so `***x***` yields one bold+italic run.
//!
//! A [`RuleSet`] is built once and passed by reference into the parser, so
//! tests and hosts can run custom rule sets side by side.

pub mod builders;
pub mod patterns;

use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use xi_rope::Rope;

use crate::schema::{ElementKind, Node};

/// Nodes produced by one rule application.
pub type Fragment = Vec<Node>;

/// Builds nodes for a match.
pub type RunFn = fn(&RuleMatch<'_>, &RuleContext<'_>) -> Fragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Frontmatter,
    Code,
    Hr,
    Table,
    Head,
    Task,
    List,
    Blockquote,
    InlineCode,
    BoldAndItalic,
    Bold,
    Italic,
    Strikethrough,
    Img,
    Link,
}

impl RuleKind {
    pub fn name(self) -> &'static str {
        match self {
            RuleKind::Frontmatter => "frontmatter",
            RuleKind::Code => "code",
            RuleKind::Hr => "hr",
            RuleKind::Table => "table",
            RuleKind::Head => "head",
            RuleKind::Task => "task",
            RuleKind::List => "list",
            RuleKind::Blockquote => "blockquote",
            RuleKind::InlineCode => "inlineCode",
            RuleKind::BoldAndItalic => "boldAndItalic",
            RuleKind::Bold => "bold",
            RuleKind::Italic => "italic",
            RuleKind::Strikethrough => "strikethrough",
            RuleKind::Img => "img",
            RuleKind::Link => "link",
        }
    }

    /// Constructs matched inside running text rather than per line.
    pub fn is_inline(self) -> bool {
        matches!(
            self,
            RuleKind::InlineCode
                | RuleKind::BoldAndItalic
                | RuleKind::Bold
                | RuleKind::Italic
                | RuleKind::Strikethrough
                | RuleKind::Img
                | RuleKind::Link
        )
    }

    /// Mark rules whose delimiter is repeated characters.
    fn is_mark(self) -> bool {
        matches!(
            self,
            RuleKind::InlineCode
                | RuleKind::BoldAndItalic
                | RuleKind::Bold
                | RuleKind::Italic
                | RuleKind::Strikethrough
        )
    }

    /// Capture group holding a line construct's content.
    pub fn content_group(self) -> Option<usize> {
        match self {
            RuleKind::Head => Some(2),
            RuleKind::Task => Some(4),
            RuleKind::List => Some(3),
            RuleKind::Blockquote => Some(1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    Block,
    TextMatch,
}

/// The text a rule matched plus what `run` needs to build from it.
pub struct RuleMatch<'t> {
    pub caps: Captures<'t>,
    /// Construct body: the whole block for block rules, the content for line
    /// rules, the matched text for inline rules.
    pub source: &'t str,
    /// False when a delimited block ran into end of input.
    pub finished: bool,
}

/// Containers and inline marks nested deeper than this are kept as plain
/// text, which bounds recursion on hostile input such as `> > > ...`.
pub const MAX_NESTING: usize = 32;

/// Lets builders recurse into inline and block parsing with the same rules.
pub struct RuleContext<'r> {
    pub rules: &'r RuleSet,
    depth: usize,
}

impl<'r> RuleContext<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules, depth: 0 }
    }

    /// How many `inline`/`blocks` calls enclose this context.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn nested(&self) -> Option<Self> {
        (self.depth < MAX_NESTING).then(|| Self {
            rules: self.rules,
            depth: self.depth + 1,
        })
    }

    /// Inline nodes for `text`; never empty so every container has a caret
    /// position.
    pub fn inline(&self, text: &str) -> Vec<Node> {
        let Some(ctx) = self.nested() else {
            return vec![Node::text(text)];
        };
        let nodes = crate::parsing::inline::parse_inline(text, &ctx);
        if nodes.is_empty() {
            vec![Node::text("")]
        } else {
            nodes
        }
    }

    /// Block nodes for a nested document (blockquote or list item body).
    pub fn blocks(&self, text: &str) -> Vec<Node> {
        match self.nested() {
            Some(ctx) => crate::parsing::build_segments(&Rope::from(text), &ctx, None),
            None => {
                log::debug!("nesting limit reached; keeping {} bytes as text", text.len());
                vec![Node::paragraph(vec![Node::text(text.trim())])]
            }
        }
    }
}

pub struct Rule {
    pub kind: RuleKind,
    pub match_key: Option<char>,
    /// Start-anchored matcher used while scanning source.
    pub reg: Regex,
    /// End-anchored matcher used against text before the caret.
    typed: Option<Regex>,
    pub run: RunFn,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("kind", &self.kind)
            .field("match_key", &self.match_key)
            .field("reg", &self.reg.as_str())
            .finish()
    }
}

impl Rule {
    pub fn new(
        kind: RuleKind,
        match_key: Option<char>,
        pattern: &str,
        run: RunFn,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            kind,
            match_key,
            reg: Regex::new(pattern)?,
            typed: None,
            run,
        })
    }

    pub fn with_typed(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.typed = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn scope(&self) -> RuleScope {
        if self.match_key.is_some() {
            RuleScope::TextMatch
        } else {
            RuleScope::Block
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.reg.is_match(text)
    }

    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.reg.captures(text)
    }

    fn typed_captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.typed.as_ref().unwrap_or(&self.reg).captures(text)
    }
}

/// Outcome of matching freshly typed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub kind: RuleKind,
    /// Byte range of the matched text within the input.
    pub start: usize,
    pub end: usize,
    pub nodes: Fragment,
}

#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

static SHARED: LazyLock<Arc<RuleSet>> = LazyLock::new(|| Arc::new(RuleSet::standard()));

impl RuleSet {
    /// Rules in precedence order.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The shipped rule table.
    ///
    /// A pattern that fails to compile drops its rule, and that construct
    /// then parses as plain text.
    pub fn standard() -> Self {
        use builders::*;
        use patterns::*;

        let table: [(RuleKind, Option<char>, &str, Option<&str>, RunFn); 15] = [
            (RuleKind::Frontmatter, None, FRONTMATTER, None, run_frontmatter),
            (RuleKind::Code, None, CODE, None, run_code),
            (RuleKind::Hr, None, HR, None, run_hr),
            (RuleKind::Table, None, TABLE, None, run_table),
            (RuleKind::Head, Some(' '), HEAD, None, run_head),
            (RuleKind::Task, Some(' '), TASK, None, run_task),
            (RuleKind::List, Some(' '), LIST, None, run_list),
            (RuleKind::Blockquote, Some(' '), BLOCKQUOTE, None, run_blockquote),
            (
                RuleKind::InlineCode,
                Some('`'),
                INLINE_CODE,
                Some(INLINE_CODE_TYPED),
                run_inline_code,
            ),
            (
                RuleKind::BoldAndItalic,
                Some('*'),
                BOLD_AND_ITALIC,
                Some(BOLD_AND_ITALIC_TYPED),
                run_bold_and_italic,
            ),
            (RuleKind::Bold, Some('*'), BOLD, Some(BOLD_TYPED), run_bold),
            (RuleKind::Italic, Some('*'), ITALIC, Some(ITALIC_TYPED), run_italic),
            (
                RuleKind::Strikethrough,
                Some('~'),
                STRIKETHROUGH,
                Some(STRIKETHROUGH_TYPED),
                run_strikethrough,
            ),
            (RuleKind::Img, Some(')'), IMG, Some(IMG_TYPED), run_img),
            (RuleKind::Link, Some(')'), LINK, Some(LINK_TYPED), run_link),
        ];

        let rules = table
            .into_iter()
            .filter_map(|(kind, key, pattern, typed, run)| {
                let rule = Rule::new(kind, key, pattern, run).and_then(|r| match typed {
                    Some(t) => r.with_typed(t),
                    None => Ok(r),
                });
                match rule {
                    Ok(rule) => Some(rule),
                    Err(e) => {
                        log::error!("dropping rule {}: {e}", kind.name());
                        None
                    }
                }
            })
            .collect();
        Self::new(rules)
    }

    /// Process-wide instance of [`RuleSet::standard`].
    pub fn shared() -> Arc<RuleSet> {
        Arc::clone(&SHARED)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, kind: RuleKind) -> Option<&Rule> {
        self.rules.iter().find(|r| r.kind == kind)
    }

    pub fn block_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .filter(|r| r.scope() == RuleScope::Block)
    }

    /// Text-match rules triggered by `key`, in precedence order.
    pub fn text_match(&self, key: char) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .filter(move |r| r.match_key == Some(key))
    }

    pub fn inline_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.kind.is_inline())
    }

    /// True when `kind` is present and matches `text`.
    pub fn matches(&self, kind: RuleKind, text: &str) -> bool {
        self.get(kind).is_some_and(|r| r.is_match(text))
    }

    /// Tries only the rules keyed on the character just typed against the
    /// text before the caret.
    pub fn match_typed(&self, before_caret: &str, key: char) -> Option<TextMatch> {
        let ctx = RuleContext::new(self);
        for rule in self.text_match(key) {
            let Some(caps) = rule.typed_captures(before_caret) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let (start, end) = (whole.start(), whole.end());
            if rule.kind.is_mark()
                && let Some(first) = before_caret[start..].chars().next()
                && before_caret[..start].ends_with(first)
            {
                // Part of a longer delimiter still being typed.
                continue;
            }
            let source = rule
                .kind
                .content_group()
                .map(|g| caps.get(g).map_or("", |m| m.as_str()))
                .unwrap_or(whole.as_str());
            let list_kind = list_kind_of(rule.kind, &caps);
            let built = (rule.run)(
                &RuleMatch {
                    caps,
                    source,
                    finished: true,
                },
                &ctx,
            );
            let nodes = match list_kind {
                Some(kind) => vec![Node::element(kind, built)],
                None => built,
            };
            log::debug!("typed {key:?} completed {}", rule.kind.name());
            return Some(TextMatch {
                kind: rule.kind,
                start,
                end,
                nodes,
            });
        }
        None
    }
}

/// Typed list items arrive without their list; this is the wrapper.
fn list_kind_of(kind: RuleKind, caps: &Captures<'_>) -> Option<ElementKind> {
    match kind {
        RuleKind::Task => Some(ElementKind::List {
            ordered: false,
            start: None,
        }),
        RuleKind::List => {
            let marker = caps.get(2).map_or("", |m| m.as_str());
            let number = marker
                .trim_end_matches(['.', ')'])
                .parse::<u64>()
                .ok();
            Some(ElementKind::List {
                ordered: number.is_some(),
                start: number,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TextRun;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn standard_table_compiles_every_rule() {
        assert_eq!(RuleSet::standard().rules().len(), 15);
    }

    #[rstest]
    #[case(' ', vec!["head", "task", "list", "blockquote"])]
    #[case(')', vec!["img", "link"])]
    #[case('*', vec!["boldAndItalic", "bold", "italic"])]
    #[case('`', vec!["inlineCode"])]
    #[case('~', vec!["strikethrough"])]
    fn match_keys_group_rules(#[case] key: char, #[case] expected: Vec<&str>) {
        let rules = RuleSet::standard();
        let names: Vec<_> = rules.text_match(key).map(|r| r.kind.name()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn block_rules_have_no_key() {
        let rules = RuleSet::standard();
        let names: Vec<_> = rules.block_rules().map(|r| r.kind.name()).collect();
        assert_eq!(names, vec!["frontmatter", "code", "hr", "table"]);
    }

    #[test]
    fn typed_star_prefers_bold_and_italic() {
        let rules = RuleSet::standard();
        let m = rules.match_typed("say ***hi***", '*').unwrap();
        assert_eq!(m.kind, RuleKind::BoldAndItalic);
        assert_eq!(m.start, 4);
        assert_eq!(
            m.nodes,
            vec![Node::Text(TextRun {
                text: "hi".into(),
                bold: true,
                italic: true,
                ..TextRun::default()
            })]
        );
    }

    #[test]
    fn typed_star_waits_for_full_bold_delimiter() {
        let rules = RuleSet::standard();
        assert_eq!(rules.match_typed("**bold*", '*'), None);
        let m = rules.match_typed("**bold**", '*').unwrap();
        assert_eq!(m.kind, RuleKind::Bold);
    }

    #[test]
    fn typed_space_opens_empty_heading() {
        let rules = RuleSet::standard();
        let m = rules.match_typed("## ", ' ').unwrap();
        assert_eq!(m.kind, RuleKind::Head);
        assert_eq!(
            m.nodes,
            vec![Node::element(
                ElementKind::Head { level: 2 },
                vec![Node::text("")]
            )]
        );
    }

    #[test]
    fn typed_list_marker_wraps_item_in_list() {
        let rules = RuleSet::standard();
        let m = rules.match_typed("3. ", ' ').unwrap();
        assert_eq!(m.kind, RuleKind::List);
        assert_eq!(
            m.nodes[0].kind(),
            Some(&ElementKind::List {
                ordered: true,
                start: Some(3)
            })
        );
    }

    #[test]
    fn typed_paren_completes_image_before_link() {
        let rules = RuleSet::standard();
        let m = rules.match_typed("see ![cat](c.png)", ')').unwrap();
        assert_eq!(m.kind, RuleKind::Img);
        assert_eq!(m.start, 4);
    }

    #[test]
    fn unrelated_key_matches_nothing() {
        let rules = RuleSet::standard();
        assert_eq!(rules.match_typed("**bold**", 'x'), None);
    }

    #[test]
    fn custom_rule_set_omits_constructs() {
        let standard = RuleSet::standard();
        let only_bold: Vec<Rule> = standard
            .rules()
            .iter()
            .filter(|r| r.kind == RuleKind::Bold)
            .map(|r| Rule::new(r.kind, r.match_key, r.reg.as_str(), r.run).unwrap())
            .collect();
        let custom = RuleSet::new(only_bold);
        let schema = crate::parsing::parse_with_rules("# not a heading *x*", &custom).schema;
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].type_name(), Some("paragraph"));
        assert_eq!(schema[0].text_content(), "# not a heading *x*");
    }
}
