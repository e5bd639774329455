use super::{ElementKind, Node, NodePath};

/// Deepest heading level shown in a table of contents.
pub const MAX_TOC_LEVEL: u8 = 4;

/// One table-of-contents line derived from a top-level heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: u8,
    pub title: String,
    pub path: NodePath,
}

/// Builds the table of contents for a schema.
///
/// Headings deeper than [`MAX_TOC_LEVEL`] and headings whose text is blank
/// exist in the schema but are left out here.
pub fn outline(schema: &[Node]) -> Vec<TocEntry> {
    schema
        .iter()
        .enumerate()
        .filter_map(|(i, node)| match node.kind() {
            Some(ElementKind::Head { level }) if *level <= MAX_TOC_LEVEL => {
                let title = node.text_content().trim().to_string();
                (!title.is_empty()).then(|| TocEntry {
                    level: *level,
                    title,
                    path: vec![i],
                })
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse;

    #[test]
    fn filters_deep_and_empty_headings() {
        let md = "# One\n\n## Two\n\n### Three\n\n#### Four\n\n##### Five\n\n###### Six\n\n## \n";
        let schema = parse(md).schema;
        let heads = schema
            .iter()
            .filter(|n| n.type_name() == Some("head"))
            .count();
        assert_eq!(heads, 7);

        let toc = outline(&schema);
        let titles: Vec<_> = toc.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three", "Four"]);
        assert!(toc.iter().all(|e| e.level <= 4));
    }

    #[test]
    fn paths_point_at_headings() {
        let schema = parse("intro\n\n# Title").schema;
        assert_eq!(outline(&schema)[0].path, vec![1]);
    }
}
