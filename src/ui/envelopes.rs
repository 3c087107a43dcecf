use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::Selection;
use crate::config::ThemeConfig;
use crate::ui::table::{RenderedTable, UNSEEN_GLYPH};

/// Draw a rendered listing: the header pinned on top, body rows below.
/// Lines are shown exactly as rendered so the identifier column stays intact.
pub fn render_listing(
    f: &mut Frame,
    area: Rect,
    table: Option<&RenderedTable>,
    selection: &mut Selection,
    title: &str,
    theme: &ThemeConfig,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_active()))
        .title(title.to_string());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(table) = table else {
        let empty = Paragraph::new("(nothing loaded)").style(Style::default().fg(theme.fg_muted()));
        f.render_widget(empty, inner);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let header = Paragraph::new(format!("  {}", table.header())).style(
        Style::default()
            .fg(theme.fg_muted())
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = table
        .body()
        .iter()
        .enumerate()
        .map(|(row, line)| {
            let mut style = if line.contains(UNSEEN_GLYPH) {
                Style::default()
                    .fg(theme.unseen())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.fg())
            };
            if selection.covers(row) {
                style = style.bg(theme.selected_bg());
            }
            ListItem::new(Line::raw(line.as_str())).style(style)
        })
        .collect();

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(theme.selected_bg())
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let state: &mut ListState = &mut selection.list_state;
    f.render_stateful_widget(list, chunks[1], state);
}
