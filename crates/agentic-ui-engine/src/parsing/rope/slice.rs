use xi_rope::Rope;

use super::span::Span;

pub fn slice_to_string(rope: &Rope, sp: Span) -> String {
    let end = sp.end.min(rope.len());
    let start = sp.start.min(end);
    rope.slice_to_cow(start..end).into_owned()
}

/// Span text cut to at most `max` chars, with a trailing `...` when cut.
pub fn preview(rope: &Rope, sp: Span, max: usize) -> String {
    let s = slice_to_string(rope, sp);
    if s.chars().count() <= max {
        return s;
    }
    let mut cut: String = s.chars().take(max).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_clamps_out_of_range() {
        let rope = Rope::from("hello");
        assert_eq!(slice_to_string(&rope, Span::new(3, 99)), "lo");
    }

    #[test]
    fn preview_cuts_on_char_boundaries() {
        let rope = Rope::from("héllo wörld");
        assert_eq!(preview(&rope, Span::new(0, rope.len()), 4), "héll...");
        assert_eq!(preview(&rope, Span::new(0, 6), 10), "héllo");
    }
}
