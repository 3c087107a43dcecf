//! Message composition lifecycle.
//!
//! A draft is created by `compose`, checkpointed by `persist`, and ended by
//! one of the `finalize` branches. Closing is two-phase: the host proposes a
//! close, the user picks a [`CloseChoice`], and `Cancel` vetoes the close by
//! returning [`Error::Aborted`].

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::himalaya::{client, CommandBridge, Response};
use crate::status::StatusLog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeKind {
    Write,
    Reply(String),
    ReplyAll(String),
    Forward(String),
}

impl ComposeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ComposeKind::Write => "write",
            ComposeKind::Reply(_) => "reply",
            ComposeKind::ReplyAll(_) => "reply all",
            ComposeKind::Forward(_) => "forward",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    Empty,
    Editing,
    Saved,
    Sent,
    Discarded,
    /// The surface went away without a close choice (e.g. the host quit)
    Cancelled,
}

impl DraftState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DraftState::Empty | DraftState::Editing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseChoice {
    Send,
    SaveDraft,
    Discard,
    Cancel,
}

impl CloseChoice {
    pub const ALL: [CloseChoice; 4] = [
        CloseChoice::Send,
        CloseChoice::SaveDraft,
        CloseChoice::Discard,
        CloseChoice::Cancel,
    ];

    pub fn key(self) -> char {
        match self {
            CloseChoice::Send => 's',
            CloseChoice::SaveDraft => 'd',
            CloseChoice::Discard => 'x',
            CloseChoice::Cancel => 'c',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CloseChoice::Send => "send",
            CloseChoice::SaveDraft => "draft",
            CloseChoice::Discard => "discard",
            CloseChoice::Cancel => "cancel",
        }
    }

    pub fn from_key(key: char) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    kind: ComposeKind,
    raw_text: String,
    dirty: bool,
}

impl Draft {
    fn new(kind: ComposeKind, raw_text: String) -> Self {
        Self {
            kind,
            raw_text,
            dirty: false,
        }
    }

    pub fn kind(&self) -> &ComposeKind {
        &self.kind
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Backend coordinates a draft operation runs against
#[derive(Debug, Clone, Copy)]
pub struct DraftTarget<'a> {
    pub account: &'a str,
    pub mailbox: &'a str,
    pub drafts_mailbox: &'a str,
}

#[derive(Debug)]
pub struct DraftController {
    state: DraftState,
    draft: Option<Draft>,
}

impl Default for DraftController {
    fn default() -> Self {
        Self {
            state: DraftState::Empty,
            draft: None,
        }
    }
}

impl DraftController {
    pub fn state(&self) -> DraftState {
        self.state
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.state == DraftState::Editing
    }

    /// Fetch a template and start editing it. On failure nothing changes.
    pub fn compose(
        &mut self,
        kind: ComposeKind,
        bridge: &CommandBridge,
        log: &mut StatusLog,
        target: DraftTarget<'_>,
    ) -> Result<&Draft> {
        if self.is_editing() {
            return Err(Error::DraftInProgress);
        }

        let invocation = client::template(target.account, target.mailbox, &kind);
        let body = template_text(bridge.invoke(&invocation, log)?)?;

        info!(kind = kind.label(), "draft opened");
        self.state = DraftState::Editing;
        Ok(self.draft.insert(Draft::new(kind, body)))
    }

    /// The editing surface has unsaved changes
    pub fn mark_dirty(&mut self) {
        if let Some(draft) = self.draft.as_mut() {
            draft.dirty = true;
        }
    }

    /// Checkpoint the surface content. Never changes state.
    pub fn persist(&mut self, buffer: &str) -> Result<()> {
        let draft = self.editing_draft()?;
        draft.raw_text = buffer.to_string();
        draft.dirty = false;
        debug!(bytes = buffer.len(), "draft persisted");
        Ok(())
    }

    /// First phase of closing: capture the buffer and offer the choices
    pub fn propose_close(&mut self, buffer: &str) -> Result<[CloseChoice; 4]> {
        self.persist(buffer)?;
        Ok(CloseChoice::ALL)
    }

    /// Second phase of closing. `Cancel` returns `Err(Error::Aborted)` and the
    /// host must keep the surface open; a backend failure also leaves the
    /// draft in `Editing`.
    pub fn finalize(
        &mut self,
        choice: CloseChoice,
        bridge: &CommandBridge,
        log: &mut StatusLog,
        target: DraftTarget<'_>,
    ) -> Result<DraftState> {
        let raw = self.editing_draft()?.raw_text.clone();

        let next = match choice {
            CloseChoice::Send => {
                bridge.invoke(&client::send(target.account, &raw), log)?;
                DraftState::Sent
            }
            CloseChoice::SaveDraft => {
                let invocation = client::save(target.account, target.drafts_mailbox, &raw);
                bridge.invoke(&invocation, log)?;
                DraftState::Saved
            }
            CloseChoice::Discard => DraftState::Discarded,
            CloseChoice::Cancel => return Err(Error::Aborted),
        };

        info!(state = ?next, "draft closed");
        self.state = next;
        self.draft = None;
        Ok(next)
    }

    /// The surface is gone without a close choice
    pub fn abandon(&mut self) {
        if self.is_editing() {
            self.state = DraftState::Cancelled;
            self.draft = None;
        }
    }

    fn editing_draft(&mut self) -> Result<&mut Draft> {
        match (self.state, self.draft.as_mut()) {
            (DraftState::Editing, Some(draft)) => Ok(draft),
            _ => Err(Error::NoDraft),
        }
    }
}

fn template_text(response: Response) -> Result<String> {
    match response {
        Response::Empty => Ok(String::new()),
        Response::Text(text) => Ok(text),
        Response::Payload(Value::String(text)) => Ok(text),
        Response::Payload(Value::Object(map)) => ["raw", "content", "template"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| Error::UnexpectedPayload("template without text".to_string())),
        Response::Payload(other) => Err(Error::UnexpectedPayload(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::himalaya::{Captured, Runner};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Script {
        replies: Rc<RefCell<VecDeque<Captured>>>,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl Script {
        fn reply(&self, stdout: &str) {
            self.replies
                .borrow_mut()
                .push_back(Captured::stdout(stdout));
        }
    }

    impl Runner for Script {
        fn run(&self, command_line: &str) -> std::io::Result<Captured> {
            self.seen.borrow_mut().push(command_line.to_string());
            Ok(self.replies.borrow_mut().pop_front().unwrap_or_default())
        }
    }

    const TARGET: DraftTarget<'static> = DraftTarget {
        account: "work",
        mailbox: "INBOX",
        drafts_mailbox: "drafts",
    };

    fn setup() -> (DraftController, CommandBridge, StatusLog, Script) {
        let script = Script::default();
        let bridge = CommandBridge::with_runner("himalaya", Box::new(script.clone())).unwrap();
        (DraftController::default(), bridge, StatusLog::default(), script)
    }

    fn editing(
        controller: &mut DraftController,
        bridge: &CommandBridge,
        log: &mut StatusLog,
        script: &Script,
    ) {
        script.reply(r#"{"response":"To: \nSubject: \n\n"}"#);
        controller
            .compose(ComposeKind::Write, bridge, log, TARGET)
            .unwrap();
    }

    #[test]
    fn test_compose_success_enters_editing() {
        let (mut controller, bridge, mut log, script) = setup();
        script.reply(r#"{"response":"To: ann@example.com\nSubject: Re: hi\n\n> hi"}"#);

        let draft = controller
            .compose(ComposeKind::Reply("12".to_string()), &bridge, &mut log, TARGET)
            .unwrap();
        assert!(draft.raw_text().starts_with("To: ann@example.com"));
        assert_eq!(controller.state(), DraftState::Editing);
        assert!(script.seen.borrow()[0].ends_with("template reply 12"));
    }

    #[test]
    fn test_compose_failure_stays_empty() {
        let (mut controller, bridge, mut log, script) = setup();
        script.reply("cannot build template");

        let err = controller
            .compose(ComposeKind::Write, &bridge, &mut log, TARGET)
            .unwrap_err();
        assert!(matches!(err, Error::Diagnostic(_)));
        assert_eq!(controller.state(), DraftState::Empty);
        assert!(controller.draft().is_none());
    }

    #[test]
    fn test_only_one_draft_at_a_time() {
        let (mut controller, bridge, mut log, script) = setup();
        editing(&mut controller, &bridge, &mut log, &script);
        let err = controller
            .compose(ComposeKind::Write, &bridge, &mut log, TARGET)
            .unwrap_err();
        assert!(matches!(err, Error::DraftInProgress));
        assert_eq!(script.seen.borrow().len(), 1);
    }

    #[test]
    fn test_persist_never_changes_state() {
        let (mut controller, bridge, mut log, script) = setup();
        editing(&mut controller, &bridge, &mut log, &script);

        controller.mark_dirty();
        assert!(controller.draft().unwrap().is_dirty());
        for text in ["one", "two", "three"] {
            controller.persist(text).unwrap();
            assert_eq!(controller.state(), DraftState::Editing);
        }
        let draft = controller.draft().unwrap();
        assert_eq!(draft.raw_text(), "three");
        assert!(!draft.is_dirty());
    }

    #[test]
    fn test_persist_without_draft_fails() {
        let (mut controller, ..) = setup();
        assert!(matches!(controller.persist("x"), Err(Error::NoDraft)));
        assert_eq!(controller.state(), DraftState::Empty);
    }

    #[test]
    fn test_send_passes_exact_text() {
        let (mut controller, bridge, mut log, script) = setup();
        editing(&mut controller, &bridge, &mut log, &script);

        let text = "To: bob@example.com\nSubject: it's done\n\nbody";
        controller.propose_close(text).unwrap();
        let state = controller
            .finalize(CloseChoice::Send, &bridge, &mut log, TARGET)
            .unwrap();

        assert_eq!(state, DraftState::Sent);
        assert!(controller.draft().is_none());
        let expected_tail = format!("send -- {}", shell_words::quote(text));
        assert!(script.seen.borrow()[1].ends_with(&expected_tail));
    }

    #[test]
    fn test_failed_send_keeps_editing() {
        let (mut controller, bridge, mut log, script) = setup();
        editing(&mut controller, &bridge, &mut log, &script);
        controller.persist("precious words").unwrap();
        script.reply("smtp: connection refused");

        let err = controller
            .finalize(CloseChoice::Send, &bridge, &mut log, TARGET)
            .unwrap_err();
        assert!(matches!(err, Error::Diagnostic(_)));
        assert_eq!(controller.state(), DraftState::Editing);
        assert_eq!(controller.draft().unwrap().raw_text(), "precious words");
    }

    #[test]
    fn test_save_draft_targets_drafts_mailbox() {
        let (mut controller, bridge, mut log, script) = setup();
        editing(&mut controller, &bridge, &mut log, &script);

        let state = controller
            .finalize(CloseChoice::SaveDraft, &bridge, &mut log, TARGET)
            .unwrap();
        assert_eq!(state, DraftState::Saved);
        assert!(script.seen.borrow()[1].contains("--mailbox drafts save"));
    }

    #[test]
    fn test_discard_makes_no_backend_call() {
        let (mut controller, bridge, mut log, script) = setup();
        editing(&mut controller, &bridge, &mut log, &script);

        let state = controller
            .finalize(CloseChoice::Discard, &bridge, &mut log, TARGET)
            .unwrap();
        assert_eq!(state, DraftState::Discarded);
        assert!(state.is_terminal());
        assert_eq!(script.seen.borrow().len(), 1);
    }

    #[test]
    fn test_cancel_vetoes_close() {
        let (mut controller, bridge, mut log, script) = setup();
        editing(&mut controller, &bridge, &mut log, &script);

        let err = controller
            .finalize(CloseChoice::Cancel, &bridge, &mut log, TARGET)
            .unwrap_err();
        assert!(err.is_aborted());
        assert_eq!(controller.state(), DraftState::Editing);
        assert!(controller.draft().is_some());
    }

    #[test]
    fn test_abandon_cancels_open_draft() {
        let (mut controller, bridge, mut log, script) = setup();
        editing(&mut controller, &bridge, &mut log, &script);
        controller.abandon();
        assert_eq!(controller.state(), DraftState::Cancelled);
        assert!(controller.draft().is_none());
    }

    #[test]
    fn test_new_draft_after_terminal_state() {
        let (mut controller, bridge, mut log, script) = setup();
        editing(&mut controller, &bridge, &mut log, &script);
        controller
            .finalize(CloseChoice::Discard, &bridge, &mut log, TARGET)
            .unwrap();
        editing(&mut controller, &bridge, &mut log, &script);
        assert_eq!(controller.state(), DraftState::Editing);
    }

    #[test]
    fn test_close_choice_keys() {
        assert_eq!(CloseChoice::from_key('s'), Some(CloseChoice::Send));
        assert_eq!(CloseChoice::from_key('c'), Some(CloseChoice::Cancel));
        assert_eq!(CloseChoice::from_key('z'), None);
    }
}
