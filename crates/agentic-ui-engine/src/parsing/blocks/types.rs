use std::ops::Range;

use crate::parsing::rope::span::Span;

use super::kinds::FenceSig;

/// What a line could open, judged from the line alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOpener {
    Fence(FenceSig),
    Heading,
    ThematicBreak,
    Quote,
    ListItem,
    TableRow,
}

/// The construct a run of lines forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Paragraph,
    Heading,
    ThematicBreak,
    Code,
    Frontmatter,
    Table,
    Quote,
    List,
}

/// A top-level block: a contiguous run of lines of one construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Byte span in the source, line terminators included.
    pub span: Span,
    /// Line indices covered.
    pub lines: Range<usize>,
    /// False when a delimited block (fence, frontmatter) hit end of input.
    pub finished: bool,
}
