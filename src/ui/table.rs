//! Fixed-width text tables. Column widths are measured in terminal display
//! columns, so wide glyphs and multi-byte text stay aligned.

use unicode_width::UnicodeWidthStr;

use crate::himalaya::{Envelope, Flag, Mailbox};

pub const DEFAULT_DELIMITER: char = '│';

pub const UNSEEN_GLYPH: char = '✷';
pub const REPLIED_GLYPH: char = '↵';
pub const FLAGGED_GLYPH: char = '⚑';
pub const ATTACHMENT_GLYPH: &str = "@";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Mailboxes,
    Envelopes,
}

impl TableKind {
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            TableKind::Mailboxes => &["DELIM", "NAME", "ATTRIBUTES"],
            TableKind::Envelopes => &["ID", "FLAGS", "SUBJECT", "FROM", "DATE"],
        }
    }
}

/// Row 0 is the header; every data row starts with the record identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTable {
    kind: TableKind,
    lines: Vec<String>,
}

impl RenderedTable {
    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn header(&self) -> &str {
        &self.lines[0]
    }

    /// Data rows only
    pub fn body(&self) -> &[String] {
        &self.lines[1..]
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.lines.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct TableRenderer {
    delimiter: char,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl TableRenderer {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn render(&self, kind: TableKind, rows: &[Vec<String>]) -> RenderedTable {
        let headers = kind.headers();
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(|c| self.sanitize(c)).collect())
            .collect();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                rows.iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.width())
                    .fold(header.width(), usize::max)
            })
            .collect();

        let mut lines = Vec::with_capacity(rows.len() + 1);
        let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        lines.push(self.render_line(&header, &widths));
        for row in &rows {
            lines.push(self.render_line(row, &widths));
        }

        RenderedTable { kind, lines }
    }

    pub fn render_envelopes(&self, envelopes: &[Envelope]) -> RenderedTable {
        let rows: Vec<Vec<String>> = envelopes.iter().map(envelope_cells).collect();
        self.render(TableKind::Envelopes, &rows)
    }

    pub fn render_mailboxes(&self, mailboxes: &[Mailbox]) -> RenderedTable {
        let rows: Vec<Vec<String>> = mailboxes
            .iter()
            .map(|m| vec![m.delim.clone(), m.name.clone(), m.attrs.join(", ")])
            .collect();
        self.render(TableKind::Mailboxes, &rows)
    }

    fn render_line(&self, cells: &[String], widths: &[usize]) -> String {
        let mut line = String::new();
        line.push(self.delimiter);
        for (col, width) in widths.iter().enumerate() {
            let cell = cells.get(col).map(String::as_str).unwrap_or("");
            line.push_str(cell);
            line.push_str(&" ".repeat(width.saturating_sub(cell.width())));
            line.push(self.delimiter);
        }
        line
    }

    /// Control characters would break the one-record-per-line layout; the
    /// delimiter inside a cell would shift every column after it
    fn sanitize(&self, cell: &str) -> String {
        cell.chars()
            .map(|c| {
                if c.is_control() || c == self.delimiter {
                    ' '
                } else {
                    c
                }
            })
            .collect()
    }
}

/// Three glyph slots, always present so the column keeps its width
pub fn flag_glyphs(envelope: &Envelope) -> String {
    let unseen = if envelope.has_flag(Flag::Seen) {
        ' '
    } else {
        UNSEEN_GLYPH
    };
    let replied = if envelope.has_flag(Flag::Answered) {
        REPLIED_GLYPH
    } else {
        ' '
    };
    let flagged = if envelope.has_flag(Flag::Flagged) {
        FLAGGED_GLYPH
    } else {
        ' '
    };
    [unseen, replied, flagged].iter().collect()
}

fn envelope_cells(envelope: &Envelope) -> Vec<String> {
    let subject = envelope.subject.as_deref().unwrap_or("(no subject)");
    let subject = if envelope.has_attachment {
        format!("{} {}", subject, ATTACHMENT_GLYPH)
    } else {
        subject.to_string()
    };
    vec![
        envelope.id.clone(),
        flag_glyphs(envelope),
        subject,
        envelope.from_display(),
        format_date(envelope.date.as_deref().unwrap_or("")),
    ]
}

/// Format date from "2026-02-02 04:11+00:00" to "Feb 02 04:11"
pub fn format_date(date: &str) -> String {
    // Relative dates like "today" or "2 days ago" pass through
    if !date.contains('-') || date.contains("ago") {
        return date.to_string();
    }

    let mut parts = date.split([' ', 'T']);
    let date_part = parts.next().unwrap_or("");
    let time_part = parts.next().unwrap_or("");

    let date_parts: Vec<&str> = date_part.split('-').collect();
    if date_parts.len() < 3 {
        return date.to_string();
    }

    let month = match date_parts[1] {
        "01" => "Jan",
        "02" => "Feb",
        "03" => "Mar",
        "04" => "Apr",
        "05" => "May",
        "06" => "Jun",
        "07" => "Jul",
        "08" => "Aug",
        "09" => "Sep",
        "10" => "Oct",
        "11" => "Nov",
        "12" => "Dec",
        _ => return date.to_string(),
    };
    let day = date_parts[2];

    let time = time_part
        .split(['+', '-', 'Z'])
        .next()
        .unwrap_or("");
    let time_short = time.get(..5).unwrap_or(time);

    format!("{} {} {}", month, day, time_short).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(id: &str, flags: &[Flag], subject: &str) -> Envelope {
        Envelope {
            id: id.to_string(),
            flags: flags.to_vec(),
            subject: Some(subject.to_string()),
            from: None,
            date: Some("2026-02-02 04:11+00:00".to_string()),
            has_attachment: false,
        }
    }

    fn cells(line: &str) -> Vec<&str> {
        let inner = line
            .strip_prefix(DEFAULT_DELIMITER)
            .and_then(|l| l.strip_suffix(DEFAULT_DELIMITER))
            .unwrap();
        inner.split(DEFAULT_DELIMITER).collect()
    }

    #[test]
    fn test_header_is_row_zero() {
        let table = TableRenderer::default().render_envelopes(&[
            envelope("101", &[], "a"),
            envelope("102", &[], "b"),
            envelope("103", &[], "c"),
        ]);
        assert_eq!(table.lines().len(), 4);
        assert_eq!(table.len(), 3);
        assert_eq!(cells(table.header())[0].trim(), "ID");
        assert_eq!(cells(&table.body()[2])[0].trim(), "103");
    }

    #[test]
    fn test_zero_rows_fall_back_to_header_width() {
        let table = TableRenderer::default().render(TableKind::Mailboxes, &[]);
        assert!(table.is_empty());
        assert_eq!(table.header(), "│DELIM│NAME│ATTRIBUTES│");
    }

    #[test]
    fn test_widths_cover_widest_cell() {
        let rows = vec![
            vec!["/".to_string(), "INBOX".to_string(), String::new()],
            vec![
                "/".to_string(),
                "Archives/2025".to_string(),
                "NoSelect".to_string(),
            ],
        ];
        let table = TableRenderer::default().render(TableKind::Mailboxes, &rows);
        for line in table.lines() {
            let c = cells(line);
            assert_eq!(c[0].width(), 5);
            assert_eq!(c[1].width(), "Archives/2025".width());
            assert_eq!(c[2].width(), "ATTRIBUTES".width());
        }
    }

    #[test]
    fn test_wide_glyphs_measured_in_display_columns() {
        let table = TableRenderer::default().render_envelopes(&[
            envelope("1", &[Flag::Seen], "日本語の件名"),
            envelope("2", &[Flag::Seen], "ascii"),
        ]);
        let widths: Vec<usize> = table.lines().iter().map(|l| l.width()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cells(&table.body()[0])[2], "日本語の件名");
    }

    #[test]
    fn test_flag_glyph_slots() {
        assert_eq!(flag_glyphs(&envelope("1", &[Flag::Seen], "")), "   ");
        assert_eq!(flag_glyphs(&envelope("1", &[], "")), "✷  ");
        assert_eq!(
            flag_glyphs(&envelope("1", &[Flag::Seen, Flag::Answered, Flag::Flagged], "")),
            " ↵⚑"
        );
    }

    #[test]
    fn test_cells_cannot_break_layout() {
        let table = TableRenderer::default().render_envelopes(&[envelope(
            "9",
            &[Flag::Seen],
            "multi\nline │ subject",
        )]);
        assert_eq!(table.lines().len(), 2);
        assert_eq!(cells(&table.body()[0]).len(), 5);
    }

    #[test]
    fn test_rendering_is_reproducible() {
        let renderer = TableRenderer::new('|');
        let input = [envelope("5", &[], "x"), envelope("6", &[Flag::Seen], "y")];
        assert_eq!(
            renderer.render_envelopes(&input),
            renderer.render_envelopes(&input)
        );
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2026-02-02 04:11+00:00"), "Feb 02 04:11");
        assert_eq!(format_date("2026-12-24T18:30:00Z"), "Dec 24 18:30");
        assert_eq!(format_date("yesterday"), "yesterday");
    }
}
