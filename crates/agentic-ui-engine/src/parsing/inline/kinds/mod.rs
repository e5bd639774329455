use crate::parsing::rules::RuleKind;

/// Backslash escapes of ASCII punctuation.
pub struct Escape;

impl Escape {
    pub const BACKSLASH: u8 = b'\\';

    pub fn is_escapable(b: u8) -> bool {
        b.is_ascii_punctuation()
    }
}

/// Which byte can start each inline construct.
pub struct Delimiters;

impl Delimiters {
    pub const STAR: u8 = b'*';
    pub const TICK: u8 = b'`';
    pub const TILDE: u8 = b'~';
    pub const BANG: u8 = b'!';
    pub const BRACKET: u8 = b'[';

    pub fn opener(kind: RuleKind) -> Option<u8> {
        match kind {
            RuleKind::InlineCode => Some(Self::TICK),
            RuleKind::BoldAndItalic | RuleKind::Bold | RuleKind::Italic => Some(Self::STAR),
            RuleKind::Strikethrough => Some(Self::TILDE),
            RuleKind::Img => Some(Self::BANG),
            RuleKind::Link => Some(Self::BRACKET),
            _ => None,
        }
    }
}
