//! Regular expressions behind the standard rule table.
//!
//! Scan patterns are anchored at the start because the parser applies them
//! at the current position. `*_TYPED` variants are anchored at the end so
//! they can be run against the text before the caret.

pub const FRONTMATTER: &str = r"^---[ \t]*$";
pub const CODE: &str = r"^[ \t]{0,3}(`{3,}|~{3,}|\$\$)[ \t]*(.*?)[ \t]*$";
pub const HR: &str = r"^[ \t]{0,3}(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:_[ \t]*){3,})$";
pub const TABLE: &str = r"^[ \t]{0,3}\|.*\|[ \t]*$";

pub const HEAD: &str = r"^[ \t]{0,3}(#{1,6})(?:[ \t]+(.*?))?[ \t]*$";
pub const TASK: &str = r"^([ \t]*)([-*+])[ \t]+\[([ xX])\](?:[ \t]+(.*))?$";
pub const LIST: &str = r"^([ \t]*)([-*+]|\d{1,9}[.)])[ \t]+(.*)$";
pub const BLOCKQUOTE: &str = r"^[ \t]{0,3}>[ \t]?(.*)$";

pub const INLINE_CODE: &str = r"^`([^`]+)`";
pub const INLINE_CODE_TYPED: &str = r"`([^`]+)`$";

pub const BOLD_AND_ITALIC: &str = r"^\*\*\*([^*\s](?:[^*]*[^*\s])?)\*\*\*";
pub const BOLD_AND_ITALIC_TYPED: &str = r"\*\*\*([^*\s](?:[^*]*[^*\s])?)\*\*\*$";

// Bold may wrap italic (`**a *b* c**`), so its body is not star-free.
pub const BOLD: &str = r"^\*\*([^*\s](?:.*?[^*\s])?)\*\*";
pub const BOLD_TYPED: &str = r"\*\*([^*\s](?:[^*]*[^*\s])?)\*\*$";

pub const ITALIC: &str = r"^\*([^*\s](?:[^*]*[^*\s])?)\*";
pub const ITALIC_TYPED: &str = r"\*([^*\s](?:[^*]*[^*\s])?)\*$";

pub const STRIKETHROUGH: &str = r"^~~([^~\s](?:[^~]*[^~\s])?)~~";
pub const STRIKETHROUGH_TYPED: &str = r"~~([^~\s](?:[^~]*[^~\s])?)~~$";

pub const IMG: &str = r#"^!\[([^\]]*)\]\(([^)\s]*)(?:[ \t]+"([^"]*)")?\)"#;
pub const IMG_TYPED: &str = r#"!\[([^\]]*)\]\(([^)\s]*)(?:[ \t]+"([^"]*)")?\)$"#;

pub const LINK: &str = r#"^\[([^\]]+)\]\(([^)\s]*)(?:[ \t]+"([^"]*)")?\)"#;
pub const LINK_TYPED: &str = r#"\[([^\]]+)\]\(([^)\s]*)(?:[ \t]+"([^"]*)")?\)$"#;
