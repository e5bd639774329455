#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FenceKind {
    Backticks,
    Tildes,
    /// `$$` block math.
    Math,
}

/// Opening fence signature: closing fences must match kind and be at least
/// as long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceSig {
    pub kind: FenceKind,
    pub len: usize,
}

pub struct CodeFence;

impl CodeFence {
    pub const BACKTICK: char = '`';
    pub const TILDE: char = '~';
    pub const MATH_DELIMITER: &'static str = "$$";
    pub const MIN_LEN: usize = 3;
    const MAX_INDENT: usize = 3;

    fn strip_indent(line: &str) -> Option<&str> {
        let t = line.trim_start_matches(' ');
        (line.len() - t.len() <= Self::MAX_INDENT).then_some(t)
    }

    /// Signature of an opening fence line, if it is one.
    pub fn sig(line: &str) -> Option<FenceSig> {
        let t = Self::strip_indent(line.trim_end_matches(['\r', '\n']))?;
        if t.trim_end() == Self::MATH_DELIMITER {
            return Some(FenceSig {
                kind: FenceKind::Math,
                len: 2,
            });
        }
        let first = t.chars().next()?;
        let kind = match first {
            Self::BACKTICK => FenceKind::Backticks,
            Self::TILDE => FenceKind::Tildes,
            _ => return None,
        };
        let len = t.chars().take_while(|c| *c == first).count();
        if len < Self::MIN_LEN {
            return None;
        }
        // Backtick info strings cannot hold backticks.
        if kind == FenceKind::Backticks && t[len..].contains(Self::BACKTICK) {
            return None;
        }
        Some(FenceSig { kind, len })
    }

    pub fn closes(open: FenceSig, line: &str) -> bool {
        let Some(t) = Self::strip_indent(line.trim_end()) else {
            return false;
        };
        match open.kind {
            FenceKind::Math => t == Self::MATH_DELIMITER,
            FenceKind::Backticks | FenceKind::Tildes => {
                let ch = if open.kind == FenceKind::Backticks {
                    Self::BACKTICK
                } else {
                    Self::TILDE
                };
                !t.is_empty() && t.chars().all(|c| c == ch) && t.chars().count() >= open.len
            }
        }
    }

    /// The first word of an info string.
    pub fn language(info: &str) -> Option<String> {
        info.split_whitespace().next().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_backtick_fence() {
        assert_eq!(
            CodeFence::sig("```rust"),
            Some(FenceSig {
                kind: FenceKind::Backticks,
                len: 3
            })
        );
    }

    #[test]
    fn detect_tilde_fence() {
        assert_eq!(CodeFence::sig("~~~~").map(|s| s.len), Some(4));
    }

    #[test]
    fn detect_math_fence() {
        assert_eq!(
            CodeFence::sig("$$").map(|s| s.kind),
            Some(FenceKind::Math)
        );
        assert_eq!(CodeFence::sig("$$x$$"), None);
    }

    #[test]
    fn no_fence() {
        assert_eq!(CodeFence::sig("hello"), None);
        assert_eq!(CodeFence::sig("``"), None);
        assert_eq!(CodeFence::sig("``` a`b"), None);
        assert_eq!(CodeFence::sig("    ```"), None);
    }

    #[test]
    fn closes_matching_fence() {
        let open = CodeFence::sig("````").unwrap();
        assert!(CodeFence::closes(open, "`````"));
        assert!(!CodeFence::closes(open, "```"));
        assert!(!CodeFence::closes(open, "~~~~"));
        assert!(!CodeFence::closes(open, "```` x"));
    }

    #[test]
    fn language_is_first_word() {
        assert_eq!(CodeFence::language("rust title=x"), Some("rust".into()));
        assert_eq!(CodeFence::language("  "), None);
    }
}
