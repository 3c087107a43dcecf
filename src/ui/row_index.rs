//! Map rendered rows back to backend identifiers.

use crate::error::{Error, Result};

use super::table::DEFAULT_DELIMITER;

#[derive(Debug, Clone, Copy)]
pub struct RowIndex {
    delimiter: char,
}

impl Default for RowIndex {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl RowIndex {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Identifier held in the first cell of a rendered line
    pub fn extract_id(&self, line: &str) -> Result<String> {
        let not_found = || Error::NotFound {
            line: line.to_string(),
        };

        let rest = line.trim_start();
        let rest = rest.strip_prefix(self.delimiter).unwrap_or(rest);
        let (cell, _) = rest.split_once(self.delimiter).ok_or_else(not_found)?;
        let id = cell.trim();
        if id.is_empty() {
            return Err(not_found());
        }
        Ok(id.to_string())
    }

    /// Identifiers of an inclusive line range, in line order. The bounds may
    /// come in either order (a visual selection made upwards).
    pub fn extract_ids(&self, lines: &[String], first: usize, last: usize) -> Result<Vec<String>> {
        let (first, last) = if first <= last {
            (first, last)
        } else {
            (last, first)
        };
        (first..=last)
            .map(|n| match lines.get(n) {
                Some(line) => self.extract_id(line),
                None => Err(Error::NotFound {
                    line: format!("<line {} out of range>", n),
                }),
            })
            .collect()
    }
}

/// Single argument form for batch backend calls
pub fn join_ids(ids: &[String]) -> String {
    ids.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::himalaya::Envelope;
    use crate::ui::table::TableRenderer;

    fn envelopes(ids: &[&str]) -> Vec<Envelope> {
        ids.iter()
            .map(|id| Envelope {
                id: id.to_string(),
                flags: Vec::new(),
                subject: Some(format!("subject {}", id)),
                from: None,
                date: None,
                has_attachment: false,
            })
            .collect()
    }

    #[test]
    fn test_render_then_extract_recovers_ids() {
        let ids = ["101", "102", "103"];
        let table = TableRenderer::default().render_envelopes(&envelopes(&ids));
        let index = RowIndex::default();

        let extracted = index.extract_ids(table.lines(), 1, 3).unwrap();
        assert_eq!(extracted, ids);
        assert_eq!(join_ids(&extracted), "101,102,103");
    }

    #[test]
    fn test_range_yields_one_id_per_line() {
        let ids: Vec<String> = (1..=20).map(|n| format!("{}", n * 7)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let table = TableRenderer::default().render_envelopes(&envelopes(&refs));
        let index = RowIndex::default();

        let extracted = index.extract_ids(table.lines(), 5, 12).unwrap();
        assert_eq!(extracted.len(), 8);
        assert_eq!(extracted, ids[4..12]);
    }

    #[test]
    fn test_reversed_range_keeps_line_order() {
        let table = TableRenderer::default().render_envelopes(&envelopes(&["a1", "b2", "c3"]));
        let extracted = RowIndex::default()
            .extract_ids(table.lines(), 3, 2)
            .unwrap();
        assert_eq!(extracted, ["b2", "c3"]);
    }

    #[test]
    fn test_line_without_delimiter_is_not_found() {
        let err = RowIndex::default().extract_id("no cells here").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_empty_first_cell_is_not_found() {
        assert!(RowIndex::default().extract_id("│   │x│").is_err());
    }

    #[test]
    fn test_out_of_range_is_not_found() {
        let table = TableRenderer::default().render_envelopes(&envelopes(&["1"]));
        assert!(RowIndex::default().extract_ids(table.lines(), 1, 2).is_err());
    }

    #[test]
    fn test_custom_delimiter() {
        let index = RowIndex::new('|');
        assert_eq!(index.extract_id("| 42 |x|").unwrap(), "42");
        assert_eq!(index.extract_id("42|x").unwrap(), "42");
    }
}
