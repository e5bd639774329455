/// YAML frontmatter: only recognised when the delimiter is the first line.
pub struct Frontmatter;

impl Frontmatter {
    pub const DELIMITER: &'static str = "---";

    pub fn is_delimiter(line: &str) -> bool {
        line.trim_end() == Self::DELIMITER
    }
}
