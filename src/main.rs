use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mailsession::app::{App, Mode};
use mailsession::config::Config;
use mailsession::controller::{self, SessionController, Settings, Surface};
use mailsession::draft::CloseChoice;
use mailsession::himalaya::CommandBridge;
use mailsession::picker::{self, Capabilities, PickerAdapter};
use mailsession::ui::table::TableRenderer;
use mailsession::ui::{render_draft, render_help, render_listing, render_reader};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

#[derive(Parser)]
#[command(name = "mailsession")]
#[command(about = "Terminal session over a command-line mail backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the first page of a mailbox (used by the fuzzy finder preview)
    #[command(name = "preview-mailbox")]
    PreviewMailbox {
        /// Account the mailbox belongs to
        #[arg(long)]
        account: String,
        /// Mailbox to list
        mailbox: String,
    },
}

/// Where log records go
#[derive(Debug, PartialEq, Eq)]
enum LogTarget {
    /// Truncated per session; the terminal is owned by the TUI
    File(PathBuf),
    /// Short-lived helper processes; keeps the session log intact
    Stderr,
}

fn log_target(command: Option<&Commands>) -> LogTarget {
    match command {
        None => LogTarget::File(Config::config_dir().join("mailsession.log")),
        Some(Commands::PreviewMailbox { .. }) => LogTarget::Stderr,
    }
}

fn open_log(target: &LogTarget) -> Option<File> {
    let LogTarget::File(path) = target else {
        return None;
    };
    path.parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .ok()?;
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .ok()
}

fn setup_logging(target: &LogTarget) {
    let default = match target {
        LogTarget::File(_) => "info,mailsession=debug",
        LogTarget::Stderr => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if let Some(file) = open_log(target) {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&log_target(cli.command.as_ref()));

    match cli.command {
        None => run(Arc::new(Config::load())),
        Some(Commands::PreviewMailbox { account, mailbox }) => {
            preview_mailbox(&Config::load(), &account, &mailbox)
        }
    }
}

/// Print the first page of a mailbox; run by the fuzzy finder for previews
fn preview_mailbox(config: &Config, account: &str, mailbox: &str) -> Result<()> {
    let bridge = CommandBridge::new(&config.command)?;
    let renderer = TableRenderer::new(config.table.delimiter);
    let text = controller::preview(&bridge, &renderer, account, mailbox, config.page_size);
    println!("{}", text);
    Ok(())
}

fn run(config: Arc<Config>) -> Result<()> {
    let bridge = CommandBridge::new(&config.command)?;
    let kind = picker::resolve(config.picker, Capabilities::probe(&config.fzf_command));
    let picker = PickerAdapter::from_kind(kind, &config.fzf_command)?;
    info!(picker = ?kind, command = %config.command, "starting");

    let mut controller = SessionController::new(
        Settings::from(config.as_ref()),
        bridge,
        picker,
        config.table.delimiter,
    );
    controller
        .start()
        .context("could not start a session with the mail backend")?;

    let mut app = App::new(controller, config);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut app, &mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop(app: &mut App, terminal: &mut Term) -> Result<()> {
    loop {
        terminal.draw(|f| render(app, f))?;

        // Poll with timeout so we redraw on resize
        if !event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            app.clear_status();
            match (app.mode, app.surface()) {
                (Mode::Search, _) => handle_search(app, key),
                (Mode::ClosePrompt, _) => handle_close_prompt(app, key),
                (Mode::Normal, Surface::Listing) => handle_listing(app, key, terminal)?,
                (Mode::Normal, Surface::Mailboxes) => handle_mailboxes(app, key),
                (Mode::Normal, Surface::Message) => handle_message(app, key, terminal)?,
                (Mode::Normal, Surface::Draft) => handle_draft(app, key, terminal)?,
            }
        }

        if app.should_quit {
            app.controller.abandon_draft();
            return Ok(());
        }
    }
}

fn handle_listing(app: &mut App, key: KeyEvent, terminal: &mut Term) -> Result<()> {
    let rows = app.rows();
    let line = app.selection.line();
    let range = app.selection.lines();

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.selection.next(rows),
        KeyCode::Char('k') | KeyCode::Up => app.selection.previous(rows),
        KeyCode::Char('v') => app.selection.toggle_visual(),
        KeyCode::Esc => app.selection.clear_visual(),
        KeyCode::Char('g') => {
            let result = app.controller.list();
            app.report(result);
        }
        KeyCode::Char('n') => {
            let result = app.controller.next_page();
            app.report(result);
        }
        KeyCode::Char('p') => {
            let result = app.controller.prev_page();
            app.report(result);
        }
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Char('b') => {
            let result = suspended(terminal, || app.controller.choose_mailbox())?;
            app.report(result);
        }
        KeyCode::Char('B') => {
            let result = app.controller.show_mailboxes();
            app.mailbox_selection = Default::default();
            app.report(result);
        }
        KeyCode::Char('A') => {
            let result = suspended(terminal, || app.controller.choose_account())?;
            app.report(result);
        }
        KeyCode::Tab => {
            let result = app.controller.cycle_account();
            app.report(result);
        }
        KeyCode::Char('c') => {
            if let Some((first, last)) = range {
                let result = suspended(terminal, || app.controller.copy(first, last))?;
                app.selection.clear_visual();
                app.report(result);
            }
        }
        KeyCode::Char('m') => {
            if let Some((first, last)) = range {
                let result = suspended(terminal, || app.controller.move_to(first, last))?;
                app.selection.clear_visual();
                app.report(result);
            }
        }
        KeyCode::Char('d') => {
            if let Some((first, last)) = range {
                let result = app.controller.delete_rows(first, last);
                app.selection.clear_visual();
                app.report(result);
            }
        }
        KeyCode::Char('s') => {
            if let Some(line) = line {
                let result = app.controller.toggle_seen(line);
                app.report(result);
            }
        }
        KeyCode::Enter => {
            if let Some(line) = line {
                app.reader_scroll = 0;
                let result = app.controller.read(line);
                app.report(result);
            }
        }
        _ => handle_common(app, key, line, terminal)?,
    }
    Ok(())
}

fn handle_mailboxes(app: &mut App, key: KeyEvent) {
    let rows = app.mailbox_rows();
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.controller.close_mailboxes(),
        KeyCode::Char('j') | KeyCode::Down => app.mailbox_selection.next(rows),
        KeyCode::Char('k') | KeyCode::Up => app.mailbox_selection.previous(rows),
        KeyCode::Enter => {
            if let Some(line) = app.mailbox_selection.line() {
                let result = app.controller.open_mailbox(line);
                app.report(result);
            }
        }
        _ => {}
    }
}

fn handle_message(app: &mut App, key: KeyEvent, terminal: &mut Term) -> Result<()> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.controller.close_message(),
        KeyCode::Char('j') | KeyCode::Down => app.reader_scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.reader_scroll_up(),
        _ => {
            let line = app.selection.line();
            handle_common(app, key, line, terminal)?;
        }
    }
    Ok(())
}

/// Keys that act on one message from either the listing or the message view
fn handle_common(
    app: &mut App,
    key: KeyEvent,
    line: Option<usize>,
    terminal: &mut Term,
) -> Result<()> {
    let result = match (key.code, line) {
        (KeyCode::Char('w'), _) => app.controller.write(),
        (KeyCode::Char('r'), Some(line)) => app.controller.reply(line),
        (KeyCode::Char('R'), Some(line)) => app.controller.reply_all(line),
        (KeyCode::Char('f'), Some(line)) => app.controller.forward(line),
        (KeyCode::Char('a'), Some(line)) => app.controller.download_attachments(line),
        _ => return Ok(()),
    };
    app.report(result);

    if app.surface() == Surface::Draft {
        edit_draft(app, terminal)?;
    }
    Ok(())
}

fn handle_draft(app: &mut App, key: KeyEvent, terminal: &mut Term) -> Result<()> {
    match key.code {
        KeyCode::Char('e') => edit_draft(app, terminal)?,
        KeyCode::Char('q') | KeyCode::Esc => {
            let buffer = app
                .controller
                .draft()
                .map(|d| d.raw_text().to_string())
                .unwrap_or_default();
            match app.controller.propose_close(&buffer) {
                Ok(_) => app.mode = Mode::ClosePrompt,
                Err(e) => app.report(Err(e)),
            }
        }
        _ => {}
    }
    Ok(())
}

fn handle_close_prompt(app: &mut App, key: KeyEvent) {
    let choice = match key.code {
        KeyCode::Char(c) => CloseChoice::from_key(c),
        KeyCode::Esc => Some(CloseChoice::Cancel),
        _ => None,
    };
    let Some(choice) = choice else {
        return;
    };

    app.mode = Mode::Normal;
    match app.controller.finalize_draft(choice) {
        Ok(state) => {
            app.report(Ok(()));
            if app.status_message.is_none() {
                app.set_status(&format!("Draft {:?}", state).to_lowercase());
            }
        }
        Err(e) if e.is_aborted() => app.set_status("Close cancelled"),
        Err(e) => app.report(Err(e)),
    }
}

fn handle_search(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_search(),
        KeyCode::Enter => {
            let query = std::mem::take(&mut app.search_input);
            app.mode = Mode::Normal;
            let result = app.controller.search(&query);
            app.report(result);
        }
        KeyCode::Backspace => {
            app.search_input.pop();
        }
        KeyCode::Char(c) => app.search_input.push(c),
        _ => {}
    }
}

/// Run `f` with the terminal handed back to the shell (pickers, editor)
fn suspended<T>(terminal: &mut Term, f: impl FnOnce() -> T) -> Result<T> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;

    let out = f();

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    terminal.clear()?;
    Ok(out)
}

/// Open the draft in the editor; every editor exit is a persist
fn edit_draft(app: &mut App, terminal: &mut Term) -> Result<()> {
    let Some(draft) = app.controller.draft() else {
        return Ok(());
    };

    let mut temp_file = tempfile::Builder::new()
        .prefix("mailsession-")
        .suffix(".eml")
        .tempfile()?;
    write!(temp_file, "{}", draft.raw_text())?;
    temp_file.flush()?;
    let path = temp_file.path().to_owned();

    let editor = app.config.editor_command();
    let mut words = shell_words::split(&editor).unwrap_or_else(|_| vec![editor.clone()]);
    if words.is_empty() {
        words.push("vi".to_string());
    }
    let program = words.remove(0);

    let status = suspended(terminal, || {
        Command::new(&program).args(&words).arg(&path).status()
    })?;

    match status {
        Ok(s) if s.success() => {
            let result = app.controller.persist_draft_file(&path);
            app.report(result);
        }
        Ok(s) => {
            warn!(status = %s, "editor exited with failure, buffer not saved");
            app.controller.mark_draft_dirty();
            app.controller
                .status_mut()
                .error(format!("{} exited with {}", program, s));
            app.sync();
        }
        Err(e) => {
            app.controller
                .status_mut()
                .error(format!("could not run {}: {}", program, e));
            app.sync();
        }
    }
    Ok(())
}

fn render(app: &mut App, f: &mut Frame) {
    let config = app.config.clone();
    let theme = &config.theme;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(f.area());

    match app.surface() {
        Surface::Listing => {
            let title = app.title();
            render_listing(
                f,
                chunks[0],
                app.controller.table(),
                &mut app.selection,
                &title,
                theme,
            );
        }
        Surface::Mailboxes => {
            let title = format!(
                " [{}] mailboxes ",
                app.controller.state().current_account().unwrap_or("-")
            );
            render_listing(
                f,
                chunks[0],
                app.controller.mailbox_listing().map(|l| &l.table),
                &mut app.mailbox_selection,
                &title,
                theme,
            );
        }
        Surface::Message => {
            let (title, text) = match app.controller.message() {
                Some(m) => (format!("Message {}", m.id), m.text.as_str()),
                None => ("Message".to_string(), ""),
            };
            render_reader(f, chunks[0], text, app.reader_scroll, &title, theme);
        }
        Surface::Draft => {
            render_draft(
                f,
                chunks[0],
                app.controller.draft(),
                app.mode == Mode::ClosePrompt,
                theme,
            );
        }
    }

    render_help(
        f,
        chunks[1],
        app.surface(),
        app.mode,
        app.status_message.as_ref(),
        &app.search_input,
        theme,
    );
}
