use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::config::ThemeConfig;

fn url_end(line: &str, start: usize) -> usize {
    line[start..]
        .find(|c: char| c.is_whitespace() || matches!(c, '>' | ')' | ']' | '"'))
        .map(|i| start + i)
        .unwrap_or(line.len())
}

/// Split message text into lines with URLs underlined
fn style_content(content: &str, url_style: Style) -> Vec<Line<'static>> {
    content
        .lines()
        .map(|line_str| {
            let mut spans = Vec::new();
            let mut last_end = 0;

            while let Some(start) = line_str[last_end..]
                .find("http://")
                .or_else(|| line_str[last_end..].find("https://"))
            {
                let abs_start = last_end + start;
                let end = url_end(line_str, abs_start);

                if abs_start > last_end {
                    spans.push(Span::raw(line_str[last_end..abs_start].to_string()));
                }
                spans.push(Span::styled(line_str[abs_start..end].to_string(), url_style));
                last_end = end;
            }

            if last_end < line_str.len() || spans.is_empty() {
                spans.push(Span::raw(line_str[last_end..].to_string()));
            }
            Line::from(spans)
        })
        .collect()
}

/// Message surface
pub fn render_reader(
    f: &mut Frame,
    area: Rect,
    content: &str,
    scroll: u16,
    title: &str,
    theme: &ThemeConfig,
) {
    let url_style = Style::default()
        .fg(theme.primary())
        .add_modifier(Modifier::UNDERLINED);

    let paragraph = Paragraph::new(style_content(content, url_style))
        .style(Style::default().fg(theme.fg()))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border_active()))
                .title(title.to_string()),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_get_their_own_span() {
        let lines = style_content("see https://example.com/x) now", Style::default());
        let spans: Vec<&str> = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(spans, vec!["see ", "https://example.com/x", ") now"]);
    }

    #[test]
    fn test_plain_and_empty_lines() {
        let lines = style_content("hello\n\nbye", Style::default());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].spans.len(), 1);
    }
}
