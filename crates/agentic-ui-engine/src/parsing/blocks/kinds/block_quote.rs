/// Blockquote delimiter knowledge.
pub struct BlockQuote;

impl BlockQuote {
    pub const PREFIX: char = '>';

    /// Strips blockquote prefixes from a line, returning (depth, byte_offset).
    ///
    /// Handles `> text`, `>> nested` and `> > spaced nested`.
    pub fn strip_prefixes(s: &str) -> (u8, usize) {
        let b = s.as_bytes();
        let mut i = 0usize;
        let mut depth = 0u8;

        loop {
            while i < b.len() && b[i] == b' ' {
                i += 1;
            }
            if i < b.len() && b[i] == (Self::PREFIX as u8) {
                depth = depth.saturating_add(1);
                i += 1;
                if i < b.len() && b[i] == b' ' {
                    i += 1;
                }
            } else {
                break;
            }
        }
        (depth, i)
    }

    /// Removes exactly one quote level, leaving nested `>` for the recursive
    /// parse. `None` for lazy continuation lines.
    pub fn strip_one(s: &str) -> Option<&str> {
        let t = s.trim_start_matches(' ');
        if s.len() - t.len() > 3 {
            return None;
        }
        let rest = t.strip_prefix(Self::PREFIX)?;
        Some(rest.strip_prefix([' ', '\t']).unwrap_or(rest))
    }
}
