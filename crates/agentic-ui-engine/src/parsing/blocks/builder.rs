use crate::parsing::rope::span::Span;

use super::{
    classify::LineClass,
    kinds::{CodeFence, FenceSig, Table},
    types::{LineOpener, Segment, SegmentKind},
};

#[derive(Debug, Clone, Copy)]
enum LeafState {
    None,
    Paragraph { first: usize, last: usize },
    Fence { sig: FenceSig, first: usize, last: usize },
    Frontmatter { first: usize, last: usize },
    /// A pipe row waiting to see whether a delimiter row follows.
    TableHead { first: usize },
    Table { first: usize, last: usize },
    Quote { first: usize, last: usize },
    List {
        first: usize,
        last: usize,
        blank_pending: bool,
    },
}

/// Groups classified lines into top-level [`Segment`]s.
pub struct BlockBuilder {
    lines: Vec<LineClass>,
    leaf: LeafState,
    out: Vec<Segment>,
}

/// Builder output: segments plus the lines they index into.
#[derive(Debug)]
pub struct Blocks {
    pub segments: Vec<Segment>,
    pub lines: Vec<LineClass>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self {
            lines: vec![],
            leaf: LeafState::None,
            out: vec![],
        }
    }

    pub fn push(&mut self, c: &LineClass) {
        let i = self.lines.len();
        self.lines.push(c.clone());
        self.step(i);
    }

    pub fn finish(mut self) -> Blocks {
        // An unclosed frontmatter opener is just a thematic break.
        if let LeafState::Frontmatter { first, last } = self.leaf {
            self.leaf = LeafState::None;
            self.emit(SegmentKind::ThematicBreak, first, first, true);
            for i in first + 1..=last {
                self.step(i);
            }
        }
        if let LeafState::Fence { first, last, .. } = self.leaf {
            self.leaf = LeafState::None;
            self.emit(SegmentKind::Code, first, last, false);
        }
        self.flush();
        Blocks {
            segments: self.out,
            lines: self.lines,
        }
    }

    fn step(&mut self, i: usize) {
        let is_blank = self.lines[i].is_blank;
        let opener = self.lines[i].opener;

        match self.leaf {
            LeafState::Fence { sig, first, .. } => {
                if CodeFence::closes(sig, &self.lines[i].text) {
                    self.leaf = LeafState::None;
                    self.emit(SegmentKind::Code, first, i, true);
                } else {
                    self.leaf = LeafState::Fence { sig, first, last: i };
                }
                return;
            }
            LeafState::Frontmatter { first, .. } => {
                if self.lines[i].frontmatter_fence {
                    self.leaf = LeafState::None;
                    self.emit(SegmentKind::Frontmatter, first, i, true);
                } else {
                    self.leaf = LeafState::Frontmatter { first, last: i };
                }
                return;
            }
            LeafState::TableHead { first } => {
                let width = Table::split_cells(&self.lines[first].text).len();
                if Table::parse_delimiter(&self.lines[i].text).is_some_and(|a| a.len() == width) {
                    self.leaf = LeafState::Table { first, last: i };
                    return;
                }
                self.leaf = LeafState::Paragraph { first, last: first };
            }
            LeafState::Table { first, .. } => {
                if opener == Some(LineOpener::TableRow) {
                    self.leaf = LeafState::Table { first, last: i };
                    return;
                }
                self.flush();
            }
            LeafState::Quote { first, .. } => {
                // Lazy continuation: plain text keeps the quote open.
                if opener == Some(LineOpener::Quote) || (!is_blank && opener.is_none()) {
                    self.leaf = LeafState::Quote { first, last: i };
                    return;
                }
                self.flush();
            }
            LeafState::List {
                first,
                last,
                blank_pending,
            } => {
                if is_blank {
                    self.leaf = LeafState::List {
                        first,
                        last,
                        blank_pending: true,
                    };
                    return;
                }
                let nested = self.lines[i].indent >= super::kinds::ListMarker::NEST_INDENT;
                let lazy = !blank_pending && opener.is_none();
                if nested || lazy || opener == Some(LineOpener::ListItem) {
                    self.leaf = LeafState::List {
                        first,
                        last: i,
                        blank_pending: false,
                    };
                    return;
                }
                self.flush();
            }
            LeafState::None | LeafState::Paragraph { .. } => {}
        }

        if is_blank {
            self.flush();
            return;
        }

        if i == 0 && self.lines[i].frontmatter_fence {
            self.leaf = LeafState::Frontmatter { first: i, last: i };
            return;
        }

        match opener {
            Some(LineOpener::Fence(sig)) => {
                self.flush();
                self.leaf = LeafState::Fence {
                    sig,
                    first: i,
                    last: i,
                };
            }
            Some(LineOpener::Heading) => {
                self.flush();
                self.emit(SegmentKind::Heading, i, i, true);
            }
            Some(LineOpener::ThematicBreak) => {
                self.flush();
                self.emit(SegmentKind::ThematicBreak, i, i, true);
            }
            Some(LineOpener::Quote) => {
                self.flush();
                self.leaf = LeafState::Quote { first: i, last: i };
            }
            Some(LineOpener::ListItem) => {
                self.flush();
                self.leaf = LeafState::List {
                    first: i,
                    last: i,
                    blank_pending: false,
                };
            }
            // A pipe row cannot interrupt a paragraph.
            Some(LineOpener::TableRow) if matches!(self.leaf, LeafState::None) => {
                self.leaf = LeafState::TableHead { first: i };
            }
            Some(LineOpener::TableRow) | None => self.extend_paragraph(i),
        }
    }

    fn extend_paragraph(&mut self, i: usize) {
        self.leaf = match self.leaf {
            LeafState::Paragraph { first, .. } => LeafState::Paragraph { first, last: i },
            _ => LeafState::Paragraph { first: i, last: i },
        };
    }

    fn flush(&mut self) {
        let prev = std::mem::replace(&mut self.leaf, LeafState::None);
        match prev {
            LeafState::None => {}
            LeafState::Paragraph { first, last } => {
                self.emit(SegmentKind::Paragraph, first, last, true)
            }
            LeafState::TableHead { first } => {
                self.emit(SegmentKind::Paragraph, first, first, true)
            }
            LeafState::Table { first, last } => self.emit(SegmentKind::Table, first, last, true),
            LeafState::Quote { first, last } => self.emit(SegmentKind::Quote, first, last, true),
            LeafState::List { first, last, .. } => {
                self.emit(SegmentKind::List, first, last, true)
            }
            LeafState::Fence { first, last, .. } => {
                self.emit(SegmentKind::Code, first, last, false)
            }
            LeafState::Frontmatter { first, last } => {
                self.emit(SegmentKind::Frontmatter, first, last, false)
            }
        }
    }

    fn emit(&mut self, kind: SegmentKind, first: usize, last: usize, finished: bool) {
        self.out.push(Segment {
            kind,
            span: Span {
                start: self.lines[first].line.start,
                end: self.lines[last].line.end,
            },
            lines: first..last + 1,
            finished,
        });
    }
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::blocks::classify::MarkdownLineClassifier;
    use crate::parsing::rope::lines_with_spans;
    use crate::parsing::rules::RuleSet;
    use pretty_assertions::assert_eq;
    use xi_rope::Rope;

    fn segments(md: &str) -> Vec<(SegmentKind, std::ops::Range<usize>, bool)> {
        let rules = RuleSet::standard();
        let classifier = MarkdownLineClassifier::new(&rules);
        let rope = Rope::from(md);
        let mut builder = BlockBuilder::new();
        for lr in lines_with_spans(&rope) {
            builder.push(&classifier.classify(&lr));
        }
        builder
            .finish()
            .segments
            .into_iter()
            .map(|s| (s.kind, s.lines, s.finished))
            .collect()
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        assert_eq!(
            segments("a\nb\n\nc"),
            vec![
                (SegmentKind::Paragraph, 0..2, true),
                (SegmentKind::Paragraph, 3..4, true)
            ]
        );
    }

    #[test]
    fn unterminated_fence_is_unfinished() {
        assert_eq!(
            segments("```rust\nfn a() {}\n"),
            vec![(SegmentKind::Code, 0..2, false)]
        );
    }

    #[test]
    fn fence_swallows_openers() {
        assert_eq!(
            segments("~~~\n# not heading\n~~~\nafter"),
            vec![
                (SegmentKind::Code, 0..3, true),
                (SegmentKind::Paragraph, 3..4, true)
            ]
        );
    }

    #[test]
    fn frontmatter_only_at_start() {
        assert_eq!(
            segments("---\na: 1\n---\ntext"),
            vec![
                (SegmentKind::Frontmatter, 0..3, true),
                (SegmentKind::Paragraph, 3..4, true)
            ]
        );
    }

    #[test]
    fn unclosed_frontmatter_replays_as_break() {
        assert_eq!(
            segments("---\n# Title\nbody"),
            vec![
                (SegmentKind::ThematicBreak, 0..1, true),
                (SegmentKind::Heading, 1..2, true),
                (SegmentKind::Paragraph, 2..3, true)
            ]
        );
    }

    #[test]
    fn table_needs_matching_delimiter() {
        assert_eq!(
            segments("| a | b |\n| - | - |\n| 1 | 2 |"),
            vec![(SegmentKind::Table, 0..3, true)]
        );
        assert_eq!(
            segments("| a | b |\n| - |"),
            vec![(SegmentKind::Paragraph, 0..2, true)]
        );
    }

    #[test]
    fn list_keeps_indented_content_after_blank() {
        assert_eq!(
            segments("- a\n\n  more\n- b\n\nafter"),
            vec![
                (SegmentKind::List, 0..4, true),
                (SegmentKind::Paragraph, 5..6, true)
            ]
        );
    }

    #[test]
    fn quote_takes_lazy_lines() {
        assert_eq!(
            segments("> a\nb\n\nc"),
            vec![
                (SegmentKind::Quote, 0..2, true),
                (SegmentKind::Paragraph, 3..4, true)
            ]
        );
    }

    #[test]
    fn heading_interrupts_paragraph() {
        assert_eq!(
            segments("text\n## h"),
            vec![
                (SegmentKind::Paragraph, 0..1, true),
                (SegmentKind::Heading, 1..2, true)
            ]
        );
    }
}
