/// List item marker knowledge.
pub struct ListMarker;

impl ListMarker {
    pub const BULLETS: [char; 3] = ['-', '*', '+'];
    pub const ORDERED_DELIMITERS: [char; 2] = ['.', ')'];
    /// Columns a continuation line needs to belong to the item above.
    pub const NEST_INDENT: usize = 2;
    const TAB_WIDTH: usize = 4;

    /// Leading whitespace width in columns.
    pub fn indent_width(line: &str) -> usize {
        line.chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .map(|c| if c == '\t' { Self::TAB_WIDTH } else { 1 })
            .sum()
    }

    /// Removes up to `cols` columns of leading whitespace.
    pub fn strip_indent(line: &str, cols: usize) -> &str {
        let mut taken = 0;
        for (i, c) in line.char_indices() {
            let w = match c {
                ' ' => 1,
                '\t' => Self::TAB_WIDTH,
                _ => return &line[i..],
            };
            if taken + w > cols {
                return &line[i..];
            }
            taken += w;
        }
        ""
    }

    /// Start number of an ordered marker such as `3.`; `None` for bullets.
    pub fn number(marker: &str) -> Option<u64> {
        marker
            .strip_suffix(Self::ORDERED_DELIMITERS)
            .and_then(|n| n.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indent_counts_tabs() {
        assert_eq!(ListMarker::indent_width("  - a"), 2);
        assert_eq!(ListMarker::indent_width("\t- a"), 4);
    }

    #[test]
    fn strip_indent_is_bounded() {
        assert_eq!(ListMarker::strip_indent("    code", 2), "  code");
        assert_eq!(ListMarker::strip_indent(" x", 2), "x");
        assert_eq!(ListMarker::strip_indent("   ", 2), " ");
    }

    #[test]
    fn ordered_numbers() {
        assert_eq!(ListMarker::number("12."), Some(12));
        assert_eq!(ListMarker::number("3)"), Some(3));
        assert_eq!(ListMarker::number("-"), None);
    }
}
