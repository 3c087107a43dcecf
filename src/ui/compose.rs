use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::config::ThemeConfig;
use crate::draft::{CloseChoice, Draft};

/// Draft surface: the raw message as last persisted, plus the close prompt
/// when one is pending
pub fn render_draft(
    f: &mut Frame,
    area: Rect,
    draft: Option<&Draft>,
    prompting: bool,
    theme: &ThemeConfig,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let (title, text) = match draft {
        Some(d) => {
            let marker = if d.is_dirty() { " [modified]" } else { "" };
            (format!("Draft ({}){}", d.kind().label(), marker), d.raw_text())
        }
        None => ("Draft".to_string(), ""),
    };

    let body = Paragraph::new(text)
        .style(Style::default().fg(theme.fg()))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border_active()))
                .title(title),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(body, chunks[0]);

    let key_style = Style::default()
        .fg(theme.primary())
        .add_modifier(Modifier::BOLD);
    let text_style = Style::default().fg(theme.fg_muted());

    let spans: Vec<Span> = if prompting {
        CloseChoice::ALL
            .iter()
            .flat_map(|choice| {
                [
                    Span::styled(format!("[{}]", choice.key()), key_style),
                    Span::styled(format!(" {}  ", choice.label()), text_style),
                ]
            })
            .collect()
    } else {
        vec![Span::styled("Close the draft to send or save it", text_style)]
    };

    let prompt = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border())),
    );
    f.render_widget(prompt, chunks[1]);
}
