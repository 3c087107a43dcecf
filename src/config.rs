use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

use crate::picker::PickerKind;
use crate::ui::table::DEFAULT_DELIMITER;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend command; arguments are appended to it
    pub command: String,
    /// Account to start with (if not set, the backend default, then the first)
    pub default_account: Option<String>,
    /// Mailbox opened on start and after switching accounts
    pub default_mailbox: String,
    /// Mailbox drafts are saved to
    pub drafts_mailbox: String,
    /// Envelopes per page
    pub page_size: usize,
    /// Picker to use; probed when unset
    pub picker: Option<PickerKind>,
    /// Fuzzy finder command
    pub fzf_command: String,
    /// Editor for drafts (falls back to $EDITOR, then vi)
    pub editor: Option<String>,
    pub table: TableConfig,
    pub theme: ThemeConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Column delimiter of rendered tables
    pub delimiter: char,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub bg_panel: String,
    pub fg: String,
    pub fg_muted: String,
    pub border: String,
    pub border_active: String,
    pub primary: String,
    pub success: String,
    pub error: String,
    pub selected_bg: String,
    pub unseen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: "himalaya".to_string(),
            default_account: None,
            default_mailbox: "INBOX".to_string(),
            drafts_mailbox: "drafts".to_string(),
            page_size: 50,
            picker: None,
            fzf_command: "fzf".to_string(),
            editor: None,
            table: TableConfig::default(),
            theme: ThemeConfig::default(),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// Capstan Cloud theme - warm earth tones with gold accents
impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            bg_panel: "#262422".to_string(),
            fg: "#f7f7f5".to_string(),
            fg_muted: "#8c8985".to_string(),
            border: "#524f4c".to_string(),
            border_active: "#d4a366".to_string(),
            primary: "#d4a366".to_string(),
            success: "#52c41a".to_string(),
            error: "#ff4d4f".to_string(),
            selected_bg: "#393634".to_string(),
            unseen: "#d4a366".to_string(),
        }
    }
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("mailsession"))
            .unwrap_or_else(|| PathBuf::from(shellexpand::tilde("~/.config/mailsession").as_ref()))
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn load() -> Self {
        let config_path = Self::config_path();

        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match Self::parse(&content) {
                    Ok(config) => return config,
                    Err(e) => warn!("Config parse error: {}", e),
                },
                Err(e) => warn!("Config read error: {}", e),
            }
        }

        Self::default()
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        config.command = shellexpand::tilde(&config.command).into_owned();
        config.editor = config
            .editor
            .map(|e| shellexpand::tilde(&e).into_owned());
        if config.page_size == 0 {
            config.page_size = Self::default().page_size;
        }
        Ok(config)
    }

    /// Editor command for drafts
    pub fn editor_command(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok())
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string())
    }
}

impl ThemeConfig {
    pub fn bg_panel(&self) -> ratatui::style::Color {
        parse_color(&self.bg_panel)
    }
    pub fn fg(&self) -> ratatui::style::Color {
        parse_color(&self.fg)
    }
    pub fn fg_muted(&self) -> ratatui::style::Color {
        parse_color(&self.fg_muted)
    }
    pub fn border(&self) -> ratatui::style::Color {
        parse_color(&self.border)
    }
    pub fn border_active(&self) -> ratatui::style::Color {
        parse_color(&self.border_active)
    }
    pub fn primary(&self) -> ratatui::style::Color {
        parse_color(&self.primary)
    }
    pub fn success(&self) -> ratatui::style::Color {
        parse_color(&self.success)
    }
    pub fn error(&self) -> ratatui::style::Color {
        parse_color(&self.error)
    }
    pub fn selected_bg(&self) -> ratatui::style::Color {
        parse_color(&self.selected_bg)
    }
    pub fn unseen(&self) -> ratatui::style::Color {
        parse_color(&self.unseen)
    }
}

/// Parse color string to ratatui Color
pub fn parse_color(s: &str) -> ratatui::style::Color {
    use ratatui::style::Color;

    // Try hex first (#RRGGBB)
    if s.starts_with('#') && s.len() == 7 {
        if let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&s[1..3], 16),
            u8::from_str_radix(&s[3..5], 16),
            u8::from_str_radix(&s[5..7], 16),
        ) {
            return Color::Rgb(r, g, b);
        }
    }

    match s.to_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        _ => Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.command, "himalaya");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.drafts_mailbox, "drafts");
        assert_eq!(config.picker, None);
        assert_eq!(config.table.delimiter, DEFAULT_DELIMITER);
    }

    #[test]
    fn test_picker_and_table_settings() {
        let config = Config::parse(
            r#"
            command = "himalaya --config /etc/himalaya.toml"
            picker = "fzf"
            page_size = 0

            [table]
            delimiter = "|"
            "#,
        )
        .unwrap();
        assert_eq!(config.picker, Some(PickerKind::FuzzyFinder));
        assert_eq!(config.table.delimiter, '|');
        assert_eq!(config.page_size, 50);
        assert_eq!(config.command, "himalaya --config /etc/himalaya.toml");
    }

    #[test]
    fn test_unknown_picker_is_rejected() {
        assert!(Config::parse(r#"picker = "telescope""#).is_err());
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#d4a366"), Color::Rgb(0xd4, 0xa3, 0x66));
        assert_eq!(parse_color("cyan"), Color::Cyan);
        assert_eq!(parse_color("nonsense"), Color::White);
    }
}
