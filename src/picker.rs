//! Item selection with interchangeable implementations.
//!
//! Which implementation runs is decided once from a capability snapshot, see
//! [`resolve`]. Every variant hands its answer to a continuation; the fuzzy
//! finders only call it once the external finder exits.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PickerKind {
    #[serde(rename = "fzf-preview")]
    FuzzyFinderWithPreview,
    #[serde(rename = "fzf")]
    FuzzyFinder,
    #[serde(rename = "native")]
    Plain,
}

/// Tried in this order when no picker is configured
pub const PROBE_ORDER: [PickerKind; 3] = [
    PickerKind::FuzzyFinderWithPreview,
    PickerKind::FuzzyFinder,
    PickerKind::Plain,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub fuzzy_finder: bool,
    pub preview: bool,
}

impl Capabilities {
    /// Look for the finder on `PATH` and for a program to run previews with
    pub fn probe(fzf_command: &str) -> Self {
        let fuzzy_finder = shell_words::split(fzf_command)
            .ok()
            .and_then(|words| words.into_iter().next())
            .is_some_and(|program| find_program(&program).is_some());
        let preview = std::env::current_exe().is_ok();
        debug!(fuzzy_finder, preview, "picker capabilities");
        Self {
            fuzzy_finder,
            preview,
        }
    }

    pub fn supports(&self, kind: PickerKind) -> bool {
        match kind {
            PickerKind::FuzzyFinderWithPreview => self.fuzzy_finder && self.preview,
            PickerKind::FuzzyFinder => self.fuzzy_finder,
            PickerKind::Plain => true,
        }
    }
}

/// A configured preference wins when it is available; otherwise the first
/// available kind in [`PROBE_ORDER`]
pub fn resolve(preference: Option<PickerKind>, capabilities: Capabilities) -> PickerKind {
    if let Some(kind) = preference {
        if capabilities.supports(kind) {
            return kind;
        }
        warn!(?kind, "configured picker unavailable, probing");
    }
    PROBE_ORDER
        .into_iter()
        .find(|kind| capabilities.supports(*kind))
        .unwrap_or(PickerKind::Plain)
}

fn find_program(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    let dirs = std::env::var_os("PATH")?;
    std::env::split_paths(&dirs)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

pub struct PickRequest<'a> {
    pub prompt: &'a str,
    pub items: &'a [String],
    /// Command prefix printing a preview for a candidate, which is appended
    /// as the last argument. Ignored by pickers without preview.
    pub preview: Option<&'a [String]>,
}

pub enum PickerAdapter {
    Plain(PlainPrompt),
    FuzzyFinder(FuzzyFinder),
    FuzzyFinderWithPreview {
        finder: FuzzyFinder,
        program: PathBuf,
    },
}

impl PickerAdapter {
    pub fn from_kind(kind: PickerKind, fzf_command: &str) -> Result<Self> {
        Ok(match kind {
            PickerKind::Plain => PickerAdapter::Plain(PlainPrompt::stdio()),
            PickerKind::FuzzyFinder => PickerAdapter::FuzzyFinder(FuzzyFinder::new(fzf_command)),
            PickerKind::FuzzyFinderWithPreview => PickerAdapter::FuzzyFinderWithPreview {
                finder: FuzzyFinder::new(fzf_command),
                program: std::env::current_exe()?,
            },
        })
    }

    pub fn kind(&self) -> PickerKind {
        match self {
            PickerAdapter::Plain(_) => PickerKind::Plain,
            PickerAdapter::FuzzyFinder(_) => PickerKind::FuzzyFinder,
            PickerAdapter::FuzzyFinderWithPreview { .. } => PickerKind::FuzzyFinderWithPreview,
        }
    }

    pub fn select(
        &mut self,
        request: PickRequest<'_>,
        then: impl FnOnce(Option<String>),
    ) -> Result<()> {
        let choice = match self {
            PickerAdapter::Plain(prompt) => prompt.ask(request.prompt, request.items)?,
            PickerAdapter::FuzzyFinder(finder) => {
                finder.run(request.prompt, request.items, None)?
            }
            PickerAdapter::FuzzyFinderWithPreview { finder, program } => {
                let preview = request.preview.map(|args| {
                    let mut words = vec![program.to_string_lossy().into_owned()];
                    words.extend(args.iter().cloned());
                    format!("{} {{}}", shell_words::join(&words))
                });
                finder.run(request.prompt, request.items, preview.as_deref())?
            }
        };
        debug!(?choice, prompt = request.prompt, "picked");
        then(choice);
        Ok(())
    }
}

/// Numbered list on a line-oriented terminal
pub struct PlainPrompt {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl PlainPrompt {
    pub fn new(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self { input, output }
    }

    pub fn stdio() -> Self {
        Self::new(
            Box::new(std::io::BufReader::new(std::io::stdin())),
            Box::new(std::io::stdout()),
        )
    }

    /// Blocks until the user answers with an item number or a literal name.
    /// An empty answer or end of input dismisses the prompt.
    fn ask(&mut self, prompt: &str, items: &[String]) -> Result<Option<String>> {
        for (i, item) in items.iter().enumerate() {
            writeln!(self.output, "{:>3}) {}", i + 1, item)?;
        }
        loop {
            write!(self.output, "{}: ", prompt)?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                return Ok(None);
            }
            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=items.len()).contains(&n) => return Ok(Some(items[n - 1].clone())),
                Ok(_) if !items.iter().any(|i| i == answer) => {
                    writeln!(self.output, "no item {}", answer)?;
                }
                _ => return Ok(Some(answer.to_string())),
            }
        }
    }
}

/// External fuzzy finder reading candidates on stdin
pub struct FuzzyFinder {
    command: String,
}

impl FuzzyFinder {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.trim().to_string(),
        }
    }

    pub fn command_line(&self, prompt: &str, preview: Option<&str>) -> String {
        let mut line = format!(
            "{} --prompt {}",
            self.command,
            shell_words::quote(&format!("{}> ", prompt))
        );
        if let Some(preview) = preview {
            line.push_str(" --preview ");
            line.push_str(&shell_words::quote(preview));
        }
        line
    }

    fn run(&self, prompt: &str, items: &[String], preview: Option<&str>) -> Result<Option<String>> {
        let line = self.command_line(prompt, preview);
        debug!(command = %line, "starting fuzzy finder");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&line)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // The finder may exit before reading everything
            if let Err(e) = stdin.write_all(items.join("\n").as_bytes()) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(Error::Io(e));
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Ok(None);
        }
        let picked = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(str::trim)
            .unwrap_or("")
            .to_string();
        Ok((!picked.is_empty()).then_some(picked))
    }
}
