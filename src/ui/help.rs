use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::Mode;
use crate::config::ThemeConfig;
use crate::controller::Surface;
use crate::status::{Level, StatusLine};

const LISTING_KEYS: &[(&str, &str)] = &[
    ("j/k", "nav"),
    ("v", "visual"),
    ("Enter", "read"),
    ("n/p", "page"),
    ("b/B", "mailbox"),
    ("A/Tab", "account"),
    ("/", "search"),
    ("w", "write"),
    ("r/R", "reply"),
    ("f", "forward"),
    ("c/m", "copy/move"),
    ("d", "delete"),
    ("s", "seen"),
    ("a", "attachments"),
    ("g", "refresh"),
    ("q", "quit"),
];

const MESSAGE_KEYS: &[(&str, &str)] = &[
    ("j/k", "scroll"),
    ("r/R", "reply"),
    ("f", "forward"),
    ("a", "attachments"),
    ("q/Esc", "back"),
];

const MAILBOX_KEYS: &[(&str, &str)] = &[
    ("j/k", "nav"),
    ("Enter", "open"),
    ("q/Esc", "back"),
];

const DRAFT_KEYS: &[(&str, &str)] = &[("e", "edit"), ("q", "close")];

pub fn render_help(
    f: &mut Frame,
    area: Rect,
    surface: Surface,
    mode: Mode,
    status: Option<&StatusLine>,
    search_input: &str,
    theme: &ThemeConfig,
) {
    let key_style = Style::default().fg(theme.primary());
    let text_style = Style::default().fg(theme.fg_muted());

    let keys = match (mode, surface) {
        (Mode::Search, _) => {
            vec![
                Span::styled("/", key_style),
                Span::raw(" "),
                Span::styled(search_input.to_string(), Style::default().fg(theme.fg())),
                Span::styled("_", key_style),
                Span::styled("  ", text_style),
                Span::styled("Enter", key_style),
                Span::styled(" search  ", text_style),
                Span::styled("Esc", key_style),
                Span::styled(" cancel", text_style),
            ]
        }
        (Mode::ClosePrompt, _) => vec![Span::styled("Close draft?", text_style)],
        (Mode::Normal, Surface::Listing) => key_spans(LISTING_KEYS, key_style, text_style),
        (Mode::Normal, Surface::Mailboxes) => key_spans(MAILBOX_KEYS, key_style, text_style),
        (Mode::Normal, Surface::Message) => key_spans(MESSAGE_KEYS, key_style, text_style),
        (Mode::Normal, Surface::Draft) => key_spans(DRAFT_KEYS, key_style, text_style),
    };

    let mut line = Line::from(keys);

    if let Some(status) = status {
        let color = match status.level {
            Level::Info => theme.success(),
            Level::Error => theme.error(),
        };
        line.spans
            .push(Span::styled("  │  ", Style::default().fg(theme.border())));
        line.spans
            .push(Span::styled(status.text.clone(), Style::default().fg(color)));
    }

    let paragraph = Paragraph::new(line).style(Style::default().bg(theme.bg_panel()));

    f.render_widget(paragraph, area);
}

fn key_spans(
    keys: &[(&'static str, &'static str)],
    key_style: Style,
    text_style: Style,
) -> Vec<Span<'static>> {
    keys.iter()
        .flat_map(|(key, label)| {
            [
                Span::styled(*key, key_style),
                Span::styled(format!(" {}  ", label), text_style),
            ]
        })
        .collect()
}
