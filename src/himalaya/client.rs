//! Typed backend invocations.
//!
//! Global options (`--output`, `--account`, `--mailbox`) always precede the
//! subcommand. Pages are 1-based on the command line.

use super::bridge::{Invocation, OutputMode};
use crate::draft::ComposeKind;

fn scoped(description: &str, account: &str, mailbox: Option<&str>) -> Invocation {
    with_output(OutputMode::Structured, description, account, mailbox)
}

fn with_output(
    output: OutputMode,
    description: &str,
    account: &str,
    mailbox: Option<&str>,
) -> Invocation {
    let inv = match output {
        OutputMode::Structured => Invocation::new(description).flag("--output", "json"),
        OutputMode::Plain => Invocation::new(description)
            .flag("--output", "plain")
            .plain(),
    };
    let inv = inv.flag("--account", account);
    match mailbox {
        Some(m) => inv.flag("--mailbox", m),
        None => inv,
    }
}

pub fn list_accounts() -> Invocation {
    Invocation::new("Fetching accounts")
        .flag("--output", "json")
        .arg("accounts")
}

pub fn list_mailboxes(account: &str) -> Invocation {
    scoped("Fetching mailboxes", account, None).arg("mailboxes")
}

pub fn list_envelopes(account: &str, mailbox: &str, page_size: usize, page: usize) -> Invocation {
    scoped("Fetching envelopes", account, Some(mailbox))
        .arg("list")
        .flag("--page-size", page_size.to_string())
        .flag("--page", (page + 1).to_string())
}

pub fn search_envelopes(
    account: &str,
    mailbox: &str,
    query: &str,
    page_size: usize,
    page: usize,
) -> Invocation {
    scoped("Searching envelopes", account, Some(mailbox))
        .arg("search")
        .flag("--page-size", page_size.to_string())
        .flag("--page", (page + 1).to_string())
        .args(query.split_whitespace())
}

pub fn read_message(account: &str, mailbox: &str, id: &str) -> Invocation {
    scoped("Fetching message", account, Some(mailbox))
        .arg("read")
        .arg(id)
        .propagating()
}

pub fn template(account: &str, mailbox: &str, kind: &ComposeKind) -> Invocation {
    let inv = scoped("Fetching template", account, Some(mailbox)).arg("template");
    let inv = match kind {
        ComposeKind::Write => inv.arg("new"),
        ComposeKind::Reply(id) => inv.arg("reply").arg(id.as_str()),
        ComposeKind::ReplyAll(id) => inv.arg("reply").arg("--all").arg(id.as_str()),
        ComposeKind::Forward(id) => inv.arg("forward").arg(id.as_str()),
    };
    inv.propagating()
}

pub fn send(account: &str, raw: &str) -> Invocation {
    scoped("Sending message", account, None)
        .arg("send")
        .arg("--")
        .arg(raw)
        .propagating()
}

pub fn save(account: &str, drafts_mailbox: &str, raw: &str) -> Invocation {
    scoped("Saving draft", account, Some(drafts_mailbox))
        .arg("save")
        .arg("--")
        .arg(raw)
        .propagating()
}

pub fn copy(account: &str, mailbox: &str, ids: &str, target: &str) -> Invocation {
    scoped("Copying message", account, Some(mailbox))
        .arg("copy")
        .arg(ids)
        .arg(target)
        .propagating()
}

pub fn move_to(account: &str, mailbox: &str, ids: &str, target: &str) -> Invocation {
    scoped("Moving message", account, Some(mailbox))
        .arg("move")
        .arg(ids)
        .arg(target)
        .propagating()
}

pub fn delete(account: &str, mailbox: &str, ids: &str) -> Invocation {
    scoped("Deleting message", account, Some(mailbox))
        .arg("delete")
        .arg(ids)
        .propagating()
}

pub fn flag_add(account: &str, mailbox: &str, id: &str, flag: &str) -> Invocation {
    scoped("Adding flag", account, Some(mailbox))
        .args(["flag", "add"])
        .arg(id)
        .arg(flag)
        .propagating()
}

pub fn flag_remove(account: &str, mailbox: &str, id: &str, flag: &str) -> Invocation {
    scoped("Removing flag", account, Some(mailbox))
        .args(["flag", "remove"])
        .arg(id)
        .arg(flag)
        .propagating()
}

/// Prints a human-readable summary of the saved files
pub fn download_attachments(account: &str, mailbox: &str, id: &str) -> Invocation {
    with_output(OutputMode::Plain, "Downloading attachments", account, Some(mailbox))
        .arg("attachments")
        .arg(id)
        .propagating()
}
