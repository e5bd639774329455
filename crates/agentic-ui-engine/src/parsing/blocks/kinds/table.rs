use crate::schema::Align;

/// Pipe table delimiter knowledge.
pub struct Table;

impl Table {
    pub const PIPE: char = '|';
    pub const ALIGN_MARK: char = ':';

    /// Cell texts of a row, outer pipes removed and `\|` unescaped.
    pub fn split_cells(line: &str) -> Vec<String> {
        let t = line.trim();
        let t = t.strip_prefix(Self::PIPE).unwrap_or(t);
        let t = match t.strip_suffix(Self::PIPE) {
            Some(rest) if !rest.ends_with('\\') => rest,
            _ => t,
        };

        let mut cells = Vec::new();
        let mut cell = String::new();
        let mut chars = t.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&Self::PIPE) => {
                    cell.push(Self::PIPE);
                    chars.next();
                }
                Self::PIPE => cells.push(std::mem::take(&mut cell).trim().to_string()),
                _ => cell.push(c),
            }
        }
        cells.push(cell.trim().to_string());
        cells
    }

    /// Column alignments of a delimiter row such as `| :-- | --: |`.
    pub fn parse_delimiter(line: &str) -> Option<Vec<Option<Align>>> {
        if !line.contains(Self::PIPE) {
            return None;
        }
        Self::split_cells(line)
            .iter()
            .map(|cell| {
                let left = cell.starts_with(Self::ALIGN_MARK);
                let right = cell.len() > 1 && cell.ends_with(Self::ALIGN_MARK);
                let dashes = cell.trim_matches(Self::ALIGN_MARK);
                if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
                    return None;
                }
                Some(match (left, right) {
                    (true, true) => Some(Align::Center),
                    (true, false) => Some(Align::Left),
                    (false, true) => Some(Align::Right),
                    (false, false) => None,
                })
            })
            .collect()
    }

    /// Pads short rows with empty cells and drops cells past `width`.
    pub fn normalize_row(mut cells: Vec<String>, width: usize) -> Vec<String> {
        cells.resize(width, String::new());
        cells
    }

    /// Right-aligns undeclared columns whose body values are all numeric.
    ///
    /// The last row is ignored: while streaming it is usually incomplete.
    pub fn infer_numeric_alignment(aligns: &mut [Option<Align>], body: &[Vec<String>]) {
        let Some((_, settled)) = body.split_last() else {
            return;
        };
        if settled.is_empty() {
            return;
        }
        for (col, align) in aligns.iter_mut().enumerate() {
            if align.is_some() {
                continue;
            }
            let numeric = settled
                .iter()
                .all(|row| row.get(col).is_some_and(|v| Self::is_numeric(v)));
            if numeric {
                *align = Some(Align::Right);
            }
        }
    }

    /// `1,234.5`, `-3`, `42%` are numeric; blanks are not.
    pub fn is_numeric(value: &str) -> bool {
        let v = value.trim();
        let v = v.strip_prefix(['-', '+']).unwrap_or(v);
        let v = v.strip_suffix('%').unwrap_or(v);
        if !v.chars().any(|c| c.is_ascii_digit()) {
            return false;
        }
        v.replace(',', "").parse::<f64>().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn splits_and_unescapes_cells() {
        assert_eq!(Table::split_cells("| a | b \\| c |"), vec!["a", "b | c"]);
        assert_eq!(Table::split_cells("|  |"), vec![""]);
    }

    #[test]
    fn delimiter_alignments() {
        assert_eq!(
            Table::parse_delimiter("| --- | :-- | :-: | --: |"),
            Some(vec![
                None,
                Some(Align::Left),
                Some(Align::Center),
                Some(Align::Right)
            ])
        );
        assert_eq!(Table::parse_delimiter("| a | --- |"), None);
        assert_eq!(Table::parse_delimiter("---"), None);
    }

    #[test]
    fn rows_are_made_rectangular() {
        let row = Table::normalize_row(vec!["a".into()], 3);
        assert_eq!(row, vec!["a", "", ""]);
        let row = Table::normalize_row(vec!["a".into(), "b".into()], 1);
        assert_eq!(row, vec!["a"]);
    }

    #[rstest]
    #[case("42", true)]
    #[case("-1,234.5", true)]
    #[case("12%", true)]
    #[case("", false)]
    #[case("abc", false)]
    #[case("1.2.3", false)]
    fn numeric_values(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(Table::is_numeric(value), expected);
    }

    #[test]
    fn numeric_inference_skips_last_row() {
        let body = vec![
            vec!["1".to_string(), "x".to_string()],
            vec!["2".to_string(), "y".to_string()],
            vec!["partial".to_string(), "z".to_string()],
        ];
        let mut aligns = vec![None, None];
        Table::infer_numeric_alignment(&mut aligns, &body);
        assert_eq!(aligns, vec![Some(Align::Right), None]);
    }

    #[test]
    fn declared_alignment_wins() {
        let body = vec![vec!["1".to_string()], vec!["2".to_string()]];
        let mut aligns = vec![Some(Align::Center)];
        Table::infer_numeric_alignment(&mut aligns, &body);
        assert_eq!(aligns, vec![Some(Align::Center)]);
    }
}
