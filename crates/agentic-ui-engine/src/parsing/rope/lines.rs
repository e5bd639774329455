use xi_rope::Rope;

use super::span::Span;

/// A single physical line of the rope.
#[derive(Debug, Clone)]
pub struct LineRef {
    /// Zero-based line number.
    pub index: usize,
    /// Byte span including the line terminator, if any.
    pub span: Span,
    pub text: String,
}

impl LineRef {
    /// Line text without its `\n` / `\r\n` terminator.
    pub fn content(&self) -> &str {
        self.text.trim_end_matches(['\r', '\n'])
    }
}

/// Iterates lines with their byte spans, keeping terminators so spans tile
/// the rope exactly.
pub fn lines_with_spans(rope: &Rope) -> impl Iterator<Item = LineRef> + '_ {
    let mut offset = 0usize;
    rope.lines_raw(..).enumerate().map(move |(index, line)| {
        let start = offset;
        offset += line.len();
        LineRef {
            index,
            span: Span { start, end: offset },
            text: line.into_owned(),
        }
    })
}
