/// User-originated edits. All act at the store's current selection unless
/// they say otherwise, and are rejected in readonly mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Inserts at the caret. A single typed character may complete a
    /// markdown construct (`**bold**`, `## `), which is converted in place.
    InsertText { text: String },
    DeleteBackward,
    /// `None` turns a heading back into a paragraph.
    SetHeading { level: Option<u8> },
    /// Paragraph → h4, hN → hN-1, h1 → paragraph.
    IncreaseHeadingLevel,
    /// Paragraph → h1, hN → hN+1, h4 → paragraph.
    DecreaseHeadingLevel,
    ToggleQuote,
    InsertHorizontalRule,
    InsertCodeBlock { language: Option<String> },
    InsertTable { rows: usize, cols: usize },
    InsertTableRow,
    DeleteTableRow,
    /// Inserts to the right of the caret's column.
    InsertTableColumn,
    DeleteTableColumn,
    ReplaceText {
        search: String,
        replace: String,
        options: ReplaceOptions,
    },
}

impl Cmd {
    pub fn name(&self) -> &'static str {
        match self {
            Cmd::InsertText { .. } => "insert-text",
            Cmd::DeleteBackward => "delete-backward",
            Cmd::SetHeading { .. } => "set-heading",
            Cmd::IncreaseHeadingLevel => "increase-heading-level",
            Cmd::DecreaseHeadingLevel => "decrease-heading-level",
            Cmd::ToggleQuote => "toggle-quote",
            Cmd::InsertHorizontalRule => "insert-horizontal-rule",
            Cmd::InsertCodeBlock { .. } => "insert-code-block",
            Cmd::InsertTable { .. } => "insert-table",
            Cmd::InsertTableRow => "insert-table-row",
            Cmd::DeleteTableRow => "delete-table-row",
            Cmd::InsertTableColumn => "insert-table-column",
            Cmd::DeleteTableColumn => "delete-table-column",
            Cmd::ReplaceText { .. } => "replace-text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub replace_all: bool,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            whole_word: false,
            replace_all: true,
        }
    }
}
