//! # Schema
//!
//! The parsed document representation: an ordered forest of [`Node`]s.
//!
//! A node is either an [`Element`] (carrying a discriminated [`ElementKind`]
//! and an ordered `children` list) or a leaf [`TextRun`]. Text runs never have
//! a type; they only carry marks.
//!
//! Every element owns its children exclusively. Elements that have no natural
//! inline content (`code`, `image`, `hr`, `frontmatter`) still hold a single
//! text child so that every element has a caret position.

pub mod html;
pub mod markdown;
pub mod outline;
pub mod path;

pub use html::to_html;
pub use markdown::to_markdown;
pub use outline::{TocEntry, outline};
pub use path::{NodePath, first_leaf_path, node_at, node_at_mut, siblings_mut, type_chain};

/// The full ordered forest returned by a single parse call.
pub type Schema = Vec<Node>;

/// A leaf text run with its inline marks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// True when both runs carry exactly the same marks.
    pub fn same_marks(&self, other: &TextRun) -> bool {
        self.bold == other.bold
            && self.italic == other.italic
            && self.strikethrough == other.strikethrough
            && self.code == other.code
    }

    pub fn is_plain(&self) -> bool {
        !(self.bold || self.italic || self.strikethrough || self.code)
    }
}

/// Column alignment declared by a table delimiter row (or inferred).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    pub fn as_str(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

/// The discriminant and per-type metadata of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Paragraph,
    Head {
        level: u8,
    },
    List {
        ordered: bool,
        start: Option<u64>,
    },
    ListItem,
    Task {
        checked: bool,
    },
    Table {
        aligns: Vec<Option<Align>>,
    },
    TableRow {
        header: bool,
    },
    TableCell,
    Code {
        language: Option<String>,
        value: String,
        /// Rendered as a formula rather than highlighted source.
        katex: bool,
        /// Whether the closing fence has been seen.
        finished: bool,
    },
    Blockquote,
    Image {
        url: String,
        alt: String,
    },
    Link {
        url: String,
        title: Option<String>,
    },
    Hr,
    Frontmatter {
        value: String,
    },
}

impl ElementKind {
    /// The `type` discriminator as it appears in the wire shape.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Paragraph => "paragraph",
            ElementKind::Head { .. } => "head",
            ElementKind::List { .. } => "list",
            ElementKind::ListItem => "list-item",
            ElementKind::Task { .. } => "task",
            ElementKind::Table { .. } => "table",
            ElementKind::TableRow { .. } => "table-row",
            ElementKind::TableCell => "table-cell",
            ElementKind::Code { .. } => "code",
            ElementKind::Blockquote => "blockquote",
            ElementKind::Image { .. } => "image",
            ElementKind::Link { .. } => "link",
            ElementKind::Hr => "hr",
            ElementKind::Frontmatter { .. } => "frontmatter",
        }
    }

    /// Inline elements live among text runs inside a block.
    pub fn is_inline(&self) -> bool {
        matches!(self, ElementKind::Link { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    pub children: Vec<Node>,
}

/// A single node of the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(TextRun),
}

impl Node {
    pub fn element(kind: ElementKind, children: Vec<Node>) -> Self {
        Node::Element(Element { kind, children })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextRun::plain(text))
    }

    /// An element with a single empty text child.
    pub fn void(kind: ElementKind) -> Self {
        Node::element(kind, vec![Node::text("")])
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::element(ElementKind::Paragraph, children)
    }

    pub fn code(language: Option<String>, value: impl Into<String>, finished: bool) -> Self {
        let value = value.into();
        let katex = matches!(language.as_deref(), Some("katex") | Some("math"));
        Node::element(
            ElementKind::Code {
                language,
                value: value.clone(),
                katex,
                finished,
            },
            vec![Node::text(value)],
        )
    }

    /// `None` for text runs, which never carry a type.
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Node::Element(e) => Some(e.kind.type_name()),
            Node::Text(_) => None,
        }
    }

    pub fn kind(&self) -> Option<&ElementKind> {
        match self {
            Node::Element(e) => Some(&e.kind),
            Node::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(e) => &e.children,
            Node::Text(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Element(e) => Some(&mut e.children),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    /// Concatenated text of every leaf below this node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Length in chars of the leaf text, 0 for elements.
    pub fn text_len(&self) -> usize {
        match self {
            Node::Text(t) => t.text.chars().count(),
            Node::Element(_) => 0,
        }
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => out.push_str(&t.text),
        Node::Element(e) => {
            for child in &e.children {
                collect_text(child, out);
            }
        }
    }
}

/// Number of nodes in the forest, counting every element and text run.
pub fn count_nodes(schema: &[Node]) -> usize {
    schema
        .iter()
        .map(|n| 1 + count_nodes(n.children()))
        .sum()
}

/// Merges adjacent text runs carrying identical marks.
pub fn merge_text_runs(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let (Some(Node::Text(prev)), Node::Text(run)) = (out.last_mut(), &node)
            && prev.same_marks(run)
        {
            prev.text.push_str(&run.text);
            continue;
        }
        out.push(node);
    }
    out
}
