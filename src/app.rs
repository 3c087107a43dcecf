use ratatui::widgets::ListState;
use std::sync::Arc;

use crate::config::Config;
use crate::controller::{SessionController, Surface};
use crate::error::Error;
use crate::status::{Level, StatusLine};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Normal,
    /// Typing a search query
    Search,
    /// Waiting for a close choice on the draft surface
    ClosePrompt,
}

/// Cursor over the body rows of the listing plus an optional visual anchor
#[derive(Debug, Default)]
pub struct Selection {
    pub list_state: ListState,
    anchor: Option<usize>,
}

impl Selection {
    pub fn next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    /// Keep the cursor inside a listing of `len` rows
    pub fn clamp(&mut self, len: usize) {
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            None => self.list_state.select(Some(0)),
            _ => {}
        }
        if self.anchor.is_some_and(|a| a >= len) {
            self.anchor = None;
        }
    }

    pub fn toggle_visual(&mut self) {
        self.anchor = match self.anchor {
            Some(_) => None,
            None => self.list_state.selected(),
        };
    }

    pub fn is_visual(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn clear_visual(&mut self) {
        self.anchor = None;
    }

    /// Table line of the cursor (line 0 is the header)
    pub fn line(&self) -> Option<usize> {
        self.list_state.selected().map(|i| i + 1)
    }

    /// Inclusive table line range covered by the visual selection, or the
    /// cursor line alone
    pub fn lines(&self) -> Option<(usize, usize)> {
        let cursor = self.list_state.selected()?;
        let anchor = self.anchor.unwrap_or(cursor);
        Some((anchor.min(cursor) + 1, anchor.max(cursor) + 1))
    }

    /// Whether body row `row` is inside the visual range
    pub fn covers(&self, row: usize) -> bool {
        match (self.anchor, self.list_state.selected()) {
            (Some(a), Some(c)) => (a.min(c)..=a.max(c)).contains(&row),
            _ => false,
        }
    }
}

pub struct App {
    pub config: Arc<Config>,
    pub controller: SessionController,
    pub mode: Mode,
    pub selection: Selection,
    pub mailbox_selection: Selection,
    pub search_input: String,
    pub reader_scroll: u16,
    pub status_message: Option<StatusLine>,
    pub should_quit: bool,
}

impl App {
    pub fn new(controller: SessionController, config: Arc<Config>) -> Self {
        let mut app = Self {
            config,
            controller,
            mode: Mode::Normal,
            selection: Selection::default(),
            mailbox_selection: Selection::default(),
            search_input: String::new(),
            reader_scroll: 0,
            status_message: None,
            should_quit: false,
        };
        app.sync();
        app
    }

    pub fn surface(&self) -> Surface {
        self.controller.surface()
    }

    pub fn rows(&self) -> usize {
        self.controller.table().map_or(0, |t| t.len())
    }

    pub fn mailbox_rows(&self) -> usize {
        self.controller
            .mailbox_listing()
            .map_or(0, |l| l.table.len())
    }

    /// Pull fresh status lines and keep the cursor in range after the
    /// listing may have changed
    pub fn sync(&mut self) {
        let rows = self.rows();
        self.selection.clamp(rows);
        let rows = self.mailbox_rows();
        self.mailbox_selection.clamp(rows);
        let mut lines = self.controller.status_mut().take();
        let shown = match lines.iter().rposition(|l| l.level == Level::Error) {
            Some(i) => Some(lines.swap_remove(i)),
            None => lines.pop(),
        };
        if shown.is_some() {
            self.status_message = shown;
        }
    }

    /// Surface the outcome of a controller operation
    pub fn report(&mut self, result: crate::Result<()>) {
        if let Err(e) = result {
            match e {
                Error::Aborted => {}
                // already logged line by line by the bridge
                Error::Diagnostic(_) => {}
                other => self.controller.status_mut().error(other.to_string()),
            }
        }
        self.sync();
    }

    pub fn set_status(&mut self, text: &str) {
        self.status_message = Some(StatusLine {
            level: Level::Info,
            text: text.to_string(),
        });
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn start_search(&mut self) {
        self.search_input = self
            .controller
            .state()
            .current_query()
            .unwrap_or("")
            .to_string();
        self.mode = Mode::Search;
    }

    pub fn cancel_search(&mut self) {
        self.search_input.clear();
        self.mode = Mode::Normal;
    }

    pub fn title(&self) -> String {
        let state = self.controller.state();
        let account = state
            .current_account()
            .map(|a| format!("[{}] ", a))
            .unwrap_or_default();
        let query = state
            .current_query()
            .map(|q| format!(" search: {}", q))
            .unwrap_or_default();
        let visual = if self.selection.is_visual() {
            " (visual)"
        } else {
            ""
        };
        format!(
            "{}{} page {}{}{}",
            account,
            state.current_mailbox(),
            state.current_page() + 1,
            query,
            visual
        )
    }

    pub fn reader_scroll_down(&mut self) {
        self.reader_scroll = self.reader_scroll.saturating_add(3);
    }

    pub fn reader_scroll_up(&mut self) {
        self.reader_scroll = self.reader_scroll.saturating_sub(3);
    }
}
