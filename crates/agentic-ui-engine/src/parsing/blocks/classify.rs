use crate::parsing::rope::{lines::LineRef, span::Span};
use crate::parsing::rules::{RuleKind, RuleSet};

use super::kinds::{CodeFence, Frontmatter, ListMarker};
use super::types::LineOpener;

/// Classification of a single line containing only local facts.
///
/// This is phase 1 of block parsing: each line is classified independently
/// without reference to surrounding context.
#[derive(Debug, Clone)]
pub struct LineClass {
    pub index: usize,
    /// Full byte span of this line in the rope.
    pub line: Span,
    /// Line text without its terminator.
    pub text: String,
    pub is_blank: bool,
    /// Leading whitespace width in columns.
    pub indent: usize,
    pub opener: Option<LineOpener>,
    /// Exactly `---`; may open frontmatter on the first line.
    pub frontmatter_fence: bool,
}

/// Classifies lines using the block and line rules of a [`RuleSet`].
pub struct MarkdownLineClassifier<'r> {
    rules: &'r RuleSet,
}

impl<'r> MarkdownLineClassifier<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    pub fn classify(&self, lr: &LineRef) -> LineClass {
        let text = lr.content();
        let is_blank = text.trim().is_empty();

        LineClass {
            index: lr.index,
            line: lr.span,
            text: text.to_string(),
            is_blank,
            indent: ListMarker::indent_width(text),
            opener: if is_blank { None } else { self.opener(text) },
            frontmatter_fence: self.rules.get(RuleKind::Frontmatter).is_some()
                && Frontmatter::is_delimiter(text),
        }
    }

    /// Whether `text` on a line of its own would start something other than
    /// a paragraph.
    pub fn opens_block(&self, text: &str) -> bool {
        !text.trim().is_empty()
            && (self.opener(text).is_some() || Frontmatter::is_delimiter(text))
    }

    // Precedence: fence, heading, thematic break (so `- - -` is not a list),
    // quote, list item, table row.
    fn opener(&self, text: &str) -> Option<LineOpener> {
        if self.rules.matches(RuleKind::Code, text)
            && let Some(sig) = CodeFence::sig(text)
        {
            return Some(LineOpener::Fence(sig));
        }
        if self.rules.matches(RuleKind::Head, text) {
            return Some(LineOpener::Heading);
        }
        if self.rules.matches(RuleKind::Hr, text) {
            return Some(LineOpener::ThematicBreak);
        }
        if self.rules.matches(RuleKind::Blockquote, text) {
            return Some(LineOpener::Quote);
        }
        if self.rules.matches(RuleKind::Task, text) || self.rules.matches(RuleKind::List, text) {
            return Some(LineOpener::ListItem);
        }
        if self.rules.matches(RuleKind::Table, text) {
            return Some(LineOpener::TableRow);
        }
        None
    }
}
