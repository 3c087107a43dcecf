//! Session orchestration: turns user commands into backend calls and keeps
//! the displayed table, the session state and the draft consistent.
//!
//! State changes are staged on a copy of [`SessionState`] and committed only
//! once the fetch they depend on has produced a payload, so a failed call
//! leaves both the state and the displayed table as they were.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::draft::{CloseChoice, ComposeKind, Draft, DraftController, DraftState, DraftTarget};
use crate::error::{Error, Result};
use crate::himalaya::{
    client, Account, CommandBridge, Envelope, Flag, Invocation, Mailbox, Outcome, Response,
};
use crate::picker::{PickRequest, PickerAdapter, PickerKind};
use crate::session::SessionState;
use crate::status::StatusLog;
use crate::ui::row_index::{join_ids, RowIndex};
use crate::ui::table::{RenderedTable, TableRenderer};

/// Subcommand the preview-capable picker runs for a highlighted mailbox
pub const PREVIEW_SUBCOMMAND: &str = "preview-mailbox";

#[derive(Debug, Clone)]
pub struct Settings {
    pub page_size: usize,
    pub default_mailbox: String,
    pub drafts_mailbox: String,
    pub default_account: Option<String>,
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            default_mailbox: config.default_mailbox.clone(),
            drafts_mailbox: config.drafts_mailbox.clone(),
            default_account: config.default_account.clone(),
        }
    }
}

/// What the host should be showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Listing,
    /// The account's mailboxes as a table
    Mailboxes,
    Message,
    Draft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub id: String,
    pub text: String,
}

/// Envelopes of the current page and their rendering; row `n` of the table
/// is `envelopes[n - 1]`
#[derive(Debug, Clone)]
pub struct Listing {
    pub table: RenderedTable,
    pub envelopes: Vec<Envelope>,
}

/// Mailboxes of the current account; row `n` of the table is `mailboxes[n - 1]`
#[derive(Debug, Clone)]
pub struct MailboxListing {
    pub table: RenderedTable,
    pub mailboxes: Vec<Mailbox>,
}

pub struct SessionController {
    settings: Settings,
    bridge: CommandBridge,
    renderer: TableRenderer,
    rows: RowIndex,
    picker: PickerAdapter,
    state: SessionState,
    /// Owns the active draft. Kept apart from `state`, which is cloned to
    /// stage every navigation change.
    drafts: DraftController,
    accounts: Vec<Account>,
    listing: Option<Listing>,
    mailbox_listing: Option<MailboxListing>,
    message: Option<MessageView>,
    surface: Surface,
    log: StatusLog,
}

impl SessionController {
    pub fn new(
        settings: Settings,
        bridge: CommandBridge,
        picker: PickerAdapter,
        delimiter: char,
    ) -> Self {
        let state = SessionState::new(settings.default_mailbox.clone());
        Self {
            settings,
            bridge,
            renderer: TableRenderer::new(delimiter),
            rows: RowIndex::new(delimiter),
            picker,
            state,
            drafts: DraftController::default(),
            accounts: Vec::new(),
            listing: None,
            mailbox_listing: None,
            message: None,
            surface: Surface::Listing,
            log: StatusLog::default(),
        }
    }

    // ---- accessors -------------------------------------------------------

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn listing(&self) -> Option<&Listing> {
        self.listing.as_ref()
    }

    pub fn table(&self) -> Option<&RenderedTable> {
        self.listing.as_ref().map(|l| &l.table)
    }

    pub fn mailbox_listing(&self) -> Option<&MailboxListing> {
        self.mailbox_listing.as_ref()
    }

    pub fn message(&self) -> Option<&MessageView> {
        self.message.as_ref()
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.drafts.draft()
    }

    pub fn draft_state(&self) -> DraftState {
        self.drafts.state()
    }

    pub fn picker_kind(&self) -> PickerKind {
        self.picker.kind()
    }

    pub fn status(&self) -> &StatusLog {
        &self.log
    }

    pub fn status_mut(&mut self) -> &mut StatusLog {
        &mut self.log
    }

    fn account(&self) -> Result<String> {
        self.state
            .current_account()
            .map(str::to_string)
            .ok_or(Error::NoAccount)
    }

    // ---- session start and accounts ---------------------------------------

    /// Resolve the account once (configured, then backend default, then
    /// first) and load the first page of the default mailbox
    pub fn start(&mut self) -> Result<()> {
        let invocation = client::list_accounts().propagating();
        self.accounts = self
            .bridge
            .invoke(&invocation, &mut self.log)?
            .decode::<Vec<Account>>()?
            .unwrap_or_default();

        let configured = self.settings.default_account.clone();
        let name = configured
            .filter(|name| self.accounts.is_empty() || self.accounts.iter().any(|a| &a.name == name))
            .or_else(|| {
                self.accounts
                    .iter()
                    .find(|a| a.default)
                    .or_else(|| self.accounts.first())
                    .map(|a| a.name.clone())
            })
            .ok_or(Error::NoAccount)?;

        info!(account = %name, "session started");
        self.state.set_account(name);
        self.refresh();
        Ok(())
    }

    pub fn switch_account(&mut self, name: &str) -> Result<()> {
        let mut next = self.state.clone();
        next.set_account(name);
        next.set_mailbox(self.settings.default_mailbox.clone());
        if self.fetch_listing(next, true)? {
            self.log.info(format!("Switched to {}", name));
        }
        Ok(())
    }

    /// Next account in backend order, wrapping around
    pub fn cycle_account(&mut self) -> Result<()> {
        if self.accounts.len() <= 1 {
            return Ok(());
        }
        let current = self.state.current_account().unwrap_or("");
        let next = match self.accounts.iter().position(|a| a.name == current) {
            Some(idx) => (idx + 1) % self.accounts.len(),
            None => 0,
        };
        let next = self.accounts[next].name.clone();
        self.switch_account(&next)
    }

    pub fn choose_account(&mut self) -> Result<()> {
        let names: Vec<String> = self.accounts.iter().map(|a| a.name.clone()).collect();
        if let Some(name) = self.pick("Account", &names, None)? {
            self.switch_account(&name)?;
        }
        Ok(())
    }

    // ---- listing ------------------------------------------------------------

    /// Re-fetch the current page. Failures only reach the status channel.
    pub fn refresh(&mut self) {
        let current = self.state.clone();
        match self.fetch_listing(current, false) {
            Ok(_) => {}
            // the bridge already logged these line by line
            Err(Error::Diagnostic(_)) => {}
            Err(e) => {
                debug!(error = %e, "refresh failed");
                for line in e.status_lines() {
                    self.log.error(line);
                }
            }
        }
    }

    /// Re-fetch the current page, reporting failures to the caller
    pub fn list(&mut self) -> Result<()> {
        let current = self.state.clone();
        self.fetch_listing(current, true)?;
        Ok(())
    }

    pub fn next_page(&mut self) -> Result<()> {
        let mut next = self.state.clone();
        next.next_page();
        self.fetch_listing(next, true)?;
        Ok(())
    }

    pub fn prev_page(&mut self) -> Result<()> {
        let mut next = self.state.clone();
        next.prev_page();
        self.fetch_listing(next, true)?;
        Ok(())
    }

    pub fn set_mailbox(&mut self, mailbox: &str) -> Result<()> {
        let mut next = self.state.clone();
        next.set_mailbox(mailbox);
        self.fetch_listing(next, true)?;
        Ok(())
    }

    pub fn search(&mut self, query: &str) -> Result<()> {
        let mut next = self.state.clone();
        next.set_query(Some(query.to_string()));
        self.fetch_listing(next, true)?;
        Ok(())
    }

    pub fn mailboxes(&mut self) -> Result<Vec<Mailbox>> {
        let account = self.account()?;
        let invocation = client::list_mailboxes(&account).propagating();
        Ok(self
            .bridge
            .invoke(&invocation, &mut self.log)?
            .decode::<Vec<Mailbox>>()?
            .unwrap_or_default())
    }

    /// Fetch the account's mailboxes and show them as a table
    pub fn show_mailboxes(&mut self) -> Result<()> {
        let mailboxes = self.mailboxes()?;
        let table = self.renderer.render_mailboxes(&mailboxes);
        self.mailbox_listing = Some(MailboxListing { table, mailboxes });
        self.surface = Surface::Mailboxes;
        Ok(())
    }

    /// Open the mailbox on a line of the mailbox table (0 is the header)
    pub fn open_mailbox(&mut self, line: usize) -> Result<()> {
        let name = self
            .mailbox_listing
            .as_ref()
            .and_then(|l| l.mailboxes.get(line.checked_sub(1)?))
            .map(|m| m.name.clone())
            .ok_or_else(|| Error::NotFound {
                line: format!("<line {}>", line),
            })?;
        self.set_mailbox(&name)?;
        self.close_mailboxes();
        Ok(())
    }

    pub fn close_mailboxes(&mut self) {
        self.surface = Surface::Listing;
    }

    pub fn choose_mailbox(&mut self) -> Result<()> {
        if let Some(mailbox) = self.pick_mailbox("Mailbox")? {
            self.set_mailbox(&mailbox)?;
        }
        Ok(())
    }

    /// First page of a mailbox as text, for picker previews. Never touches
    /// the session; a failure comes back as its diagnostic text.
    pub fn preview_mailbox(&self, mailbox: &str) -> String {
        let Some(account) = self.state.current_account() else {
            return Error::NoAccount.to_string();
        };
        preview(
            &self.bridge,
            &self.renderer,
            account,
            mailbox,
            self.settings.page_size,
        )
    }

    fn listing_invocation(&self, state: &SessionState) -> Result<Invocation> {
        let account = state.current_account().ok_or(Error::NoAccount)?;
        let mailbox = state.current_mailbox();
        let page = state.current_page();
        let size = self.settings.page_size;
        Ok(match state.current_query() {
            Some(query) => client::search_envelopes(account, mailbox, query, size, page),
            None => client::list_envelopes(account, mailbox, size, page),
        })
    }

    /// Fetch the listing `next` describes and commit both only on a payload.
    /// Returns whether anything was committed.
    fn fetch_listing(&mut self, next: SessionState, propagate: bool) -> Result<bool> {
        let mut invocation = self.listing_invocation(&next)?;
        if propagate {
            invocation = invocation.propagating();
        }

        let response = self.bridge.invoke(&invocation, &mut self.log)?;
        if !matches!(response, Response::Payload(_)) {
            return Ok(false);
        }
        let envelopes = response.decode::<Vec<Envelope>>()?.unwrap_or_default();

        let table = self.renderer.render_envelopes(&envelopes);
        debug!(
            mailbox = next.current_mailbox(),
            page = next.current_page(),
            rows = table.len(),
            "listing replaced"
        );
        self.state = next;
        self.listing = Some(Listing { table, envelopes });
        Ok(true)
    }

    // ---- row selection ----------------------------------------------------

    fn listing_lines(&self) -> &[String] {
        self.listing.as_ref().map(|l| l.table.lines()).unwrap_or(&[])
    }

    /// Identifier on a table line (0 is the header)
    pub fn id_at(&self, line: usize) -> Result<String> {
        match self.listing_lines().get(line) {
            Some(text) if line > 0 => self.rows.extract_id(text),
            _ => Err(Error::NotFound {
                line: format!("<line {}>", line),
            }),
        }
    }

    /// Comma-joined identifiers of an inclusive line range
    pub fn ids_in(&self, first: usize, last: usize) -> Result<String> {
        if first == 0 || last == 0 {
            return Err(Error::NotFound {
                line: "<header>".to_string(),
            });
        }
        let ids = self.rows.extract_ids(self.listing_lines(), first, last)?;
        Ok(join_ids(&ids))
    }

    fn envelope_with_id(&self, id: &str) -> Option<&Envelope> {
        self.listing
            .as_ref()
            .and_then(|l| l.envelopes.iter().find(|e| e.id == id))
    }

    // ---- reading ----------------------------------------------------------

    pub fn read(&mut self, line: usize) -> Result<()> {
        let id = self.id_at(line)?;
        let account = self.account()?;
        let invocation = client::read_message(&account, self.state.current_mailbox(), &id);
        let text = self
            .bridge
            .invoke(&invocation, &mut self.log)?
            .decode::<String>()?
            .unwrap_or_default();

        self.message = Some(MessageView { id, text });
        self.surface = Surface::Message;
        Ok(())
    }

    /// Back to the listing as it was rendered before
    pub fn close_message(&mut self) {
        self.message = None;
        self.surface = Surface::Listing;
    }

    pub fn download_attachments(&mut self, line: usize) -> Result<()> {
        let id = self.id_at(line)?;
        let account = self.account()?;
        let invocation =
            client::download_attachments(&account, self.state.current_mailbox(), &id);
        let response = self.bridge.invoke(&invocation, &mut self.log)?;
        match response.decode::<String>() {
            Ok(Some(summary)) => self.log.info(summary),
            Ok(None) => {}
            Err(e) => self.log.error(e.to_string()),
        }
        Ok(())
    }

    // ---- batch actions ----------------------------------------------------

    pub fn copy_rows(&mut self, first: usize, last: usize, target: &str) -> Result<()> {
        let ids = self.ids_in(first, last)?;
        let account = self.account()?;
        let invocation = client::copy(&account, self.state.current_mailbox(), &ids, target);
        self.bridge.invoke(&invocation, &mut self.log)?;
        Ok(())
    }

    pub fn move_rows(&mut self, first: usize, last: usize, target: &str) -> Result<()> {
        let ids = self.ids_in(first, last)?;
        let account = self.account()?;
        let invocation = client::move_to(&account, self.state.current_mailbox(), &ids, target);
        self.bridge.invoke(&invocation, &mut self.log)?;
        self.refresh();
        Ok(())
    }

    pub fn delete_rows(&mut self, first: usize, last: usize) -> Result<()> {
        let ids = self.ids_in(first, last)?;
        let account = self.account()?;
        let invocation = client::delete(&account, self.state.current_mailbox(), &ids);
        self.bridge.invoke(&invocation, &mut self.log)?;
        self.refresh();
        Ok(())
    }

    /// Copy after asking for the target mailbox
    pub fn copy(&mut self, first: usize, last: usize) -> Result<()> {
        self.ids_in(first, last)?;
        match self.pick_mailbox("Copy to")? {
            Some(target) => self.copy_rows(first, last, &target),
            None => Ok(()),
        }
    }

    /// Move after asking for the target mailbox
    pub fn move_to(&mut self, first: usize, last: usize) -> Result<()> {
        self.ids_in(first, last)?;
        match self.pick_mailbox("Move to")? {
            Some(target) => self.move_rows(first, last, &target),
            None => Ok(()),
        }
    }

    pub fn toggle_seen(&mut self, line: usize) -> Result<()> {
        let id = self.id_at(line)?;
        let account = self.account()?;
        let mailbox = self.state.current_mailbox().to_string();
        let seen = self.envelope_with_id(&id).is_some_and(|e| e.has_flag(Flag::Seen));

        let invocation = if seen {
            client::flag_remove(&account, &mailbox, &id, "seen")
        } else {
            client::flag_add(&account, &mailbox, &id, "seen")
        };
        self.bridge.invoke(&invocation, &mut self.log)?;
        self.refresh();
        Ok(())
    }

    // ---- drafts -----------------------------------------------------------

    pub fn write(&mut self) -> Result<()> {
        self.compose(ComposeKind::Write)
    }

    pub fn reply(&mut self, line: usize) -> Result<()> {
        let id = self.id_at(line)?;
        self.compose(ComposeKind::Reply(id))
    }

    pub fn reply_all(&mut self, line: usize) -> Result<()> {
        let id = self.id_at(line)?;
        self.compose(ComposeKind::ReplyAll(id))
    }

    pub fn forward(&mut self, line: usize) -> Result<()> {
        let id = self.id_at(line)?;
        self.compose(ComposeKind::Forward(id))
    }

    fn compose(&mut self, kind: ComposeKind) -> Result<()> {
        let account = self.account()?;
        let target = DraftTarget {
            account: &account,
            mailbox: self.state.current_mailbox(),
            drafts_mailbox: &self.settings.drafts_mailbox,
        };
        self.drafts
            .compose(kind, &self.bridge, &mut self.log, target)?;
        self.surface = Surface::Draft;
        Ok(())
    }

    pub fn mark_draft_dirty(&mut self) {
        self.drafts.mark_dirty();
    }

    /// Checkpoint the editing surface without closing it
    pub fn persist_draft(&mut self, buffer: &str) -> Result<()> {
        self.drafts.persist(buffer)
    }

    /// Checkpoint from the file the editor wrote. A file that cannot be read
    /// as text leaves the draft dirty and the surface open.
    pub fn persist_draft_file(&mut self, path: &Path) -> Result<()> {
        match std::fs::read_to_string(path) {
            Ok(content) => self.drafts.persist(&content),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "edited draft unreadable");
                self.drafts.mark_dirty();
                Err(e.into())
            }
        }
    }

    /// First phase of closing the draft surface
    pub fn propose_close(&mut self, buffer: &str) -> Result<[CloseChoice; 4]> {
        self.drafts.propose_close(buffer)
    }

    /// Second phase of closing. `Err(Error::Aborted)` means the close is
    /// vetoed and the draft surface must stay open.
    pub fn finalize_draft(&mut self, choice: CloseChoice) -> Result<DraftState> {
        let account = self.account()?;
        let target = DraftTarget {
            account: &account,
            mailbox: self.state.current_mailbox(),
            drafts_mailbox: &self.settings.drafts_mailbox,
        };
        let state = self
            .drafts
            .finalize(choice, &self.bridge, &mut self.log, target)?;

        self.surface = if self.message.is_some() {
            Surface::Message
        } else {
            Surface::Listing
        };
        Ok(state)
    }

    /// The host is going away with a draft open
    pub fn abandon_draft(&mut self) {
        self.drafts.abandon();
    }

    // ---- picking ----------------------------------------------------------

    fn pick_mailbox(&mut self, prompt: &str) -> Result<Option<String>> {
        let account = self.account()?;
        let names: Vec<String> = self.mailboxes()?.into_iter().map(|m| m.name).collect();
        let preview = vec![
            PREVIEW_SUBCOMMAND.to_string(),
            "--account".to_string(),
            account,
        ];
        self.pick(prompt, &names, Some(preview.as_slice()))
    }

    fn pick(
        &mut self,
        prompt: &str,
        items: &[String],
        preview: Option<&[String]>,
    ) -> Result<Option<String>> {
        let mut picked = None;
        self.picker.select(
            PickRequest {
                prompt,
                items,
                preview,
            },
            |choice| picked = choice,
        )?;
        Ok(picked)
    }
}

/// First page of `mailbox` rendered as text, or the backend's diagnostic
pub fn preview(
    bridge: &CommandBridge,
    renderer: &TableRenderer,
    account: &str,
    mailbox: &str,
    page_size: usize,
) -> String {
    let invocation = client::list_envelopes(account, mailbox, page_size, 0);
    match bridge.execute(&invocation) {
        Outcome::Success(response) => match response.decode::<Vec<Envelope>>() {
            Ok(envelopes) => renderer
                .render_envelopes(&envelopes.unwrap_or_default())
                .lines()
                .join("\n"),
            Err(e) => e.to_string(),
        },
        Outcome::Diagnostic(lines) => lines.join("\n"),
    }
}
