//! Process boundary with the backend mail command.
//!
//! An [`Invocation`] carries typed arguments; the bridge quotes each one
//! individually and appends it to the configured command template, runs the
//! result through `sh -c`, then classifies what came back.

use std::process::{Command, Stdio};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::status::StatusLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// stdout is a JSON object whose `response` field holds the payload
    Structured,
    /// stdout is returned as trimmed text
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    args: Vec<String>,
    output: OutputMode,
    description: String,
    propagate: bool,
}

impl Invocation {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            args: Vec::new(),
            output: OutputMode::Structured,
            description: description.into(),
            propagate: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn flag(self, name: &str, value: impl Into<String>) -> Self {
        self.arg(name).arg(value)
    }

    pub fn plain(mut self) -> Self {
        self.output = OutputMode::Plain;
        self
    }

    /// Diagnostics re-raise instead of only being logged
    pub fn propagating(mut self) -> Self {
        self.propagate = true;
        self
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn output(&self) -> OutputMode {
        self.output
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn should_propagate(&self) -> bool {
        self.propagate
    }
}

/// Captured output of one backend run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stdout: text.into(),
            stderr: String::new(),
        }
    }
}

/// Runs a fully built command line
pub trait Runner {
    fn run(&self, command_line: &str) -> std::io::Result<Captured>;
}

pub struct ShellRunner;

impl Runner for ShellRunner {
    fn run(&self, command_line: &str) -> std::io::Result<Captured> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .output()?;
        Ok(Captured {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Empty,
    Payload(Value),
    Text(String),
}

impl Response {
    /// Decode the payload; `None` when the backend returned nothing
    pub fn decode<T: DeserializeOwned>(self) -> Result<Option<T>> {
        match self {
            Response::Empty => Ok(None),
            Response::Payload(value) => Ok(Some(serde_json::from_value(value)?)),
            Response::Text(text) => Ok(Some(serde_json::from_value(Value::String(text))?)),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Response::Empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Response),
    Diagnostic(Vec<String>),
}

/// Classify captured output without side effects
pub fn classify(output: OutputMode, captured: &Captured) -> Outcome {
    let stdout = captured.stdout.trim();
    let stderr = captured.stderr.trim();

    if stdout.is_empty() && stderr.is_empty() {
        return Outcome::Success(Response::Empty);
    }

    match output {
        // nothing on stdout but something on stderr: the backend failed
        OutputMode::Plain if stdout.is_empty() => Outcome::Diagnostic(diagnostic_lines("", stderr)),
        OutputMode::Plain => Outcome::Success(Response::Text(stdout.to_string())),
        OutputMode::Structured => {
            if !stdout.is_empty() {
                if let Some(payload) = parse_envelope(stdout) {
                    return Outcome::Success(Response::Payload(payload));
                }
            }
            Outcome::Diagnostic(diagnostic_lines(stdout, stderr))
        }
    }
}

/// Extract `response` from the success envelope. JSON `null`, `true` and
/// `false` come out as native `Value`s, so callers never see raw literals.
fn parse_envelope(stdout: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(stdout) {
        Ok(Value::Object(mut map)) => map.remove("response"),
        _ => None,
    }
}

fn diagnostic_lines(stdout: &str, stderr: &str) -> Vec<String> {
    stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct CommandBridge {
    template: String,
    runner: Box<dyn Runner>,
}

impl CommandBridge {
    pub fn new(template: &str) -> Result<Self> {
        Self::with_runner(template, Box::new(ShellRunner))
    }

    pub fn with_runner(template: &str, runner: Box<dyn Runner>) -> Result<Self> {
        let words = shell_words::split(template).map_err(|e| Error::Template(e.to_string()))?;
        if words.is_empty() {
            return Err(Error::Template("empty command".to_string()));
        }
        Ok(Self {
            template: template.trim().to_string(),
            runner,
        })
    }

    /// Template followed by every argument, each quoted on its own
    pub fn command_line(&self, invocation: &Invocation) -> String {
        let mut line = self.template.clone();
        for arg in invocation.arguments() {
            line.push(' ');
            line.push_str(&shell_words::quote(arg));
        }
        line
    }

    /// Run and classify, without logging or propagation policy
    pub fn execute(&self, invocation: &Invocation) -> Outcome {
        let line = self.command_line(invocation);
        debug!(command = %line, "invoking backend");
        match self.runner.run(&line) {
            Ok(captured) => {
                if !captured.stderr.trim().is_empty() {
                    debug!(stderr = %captured.stderr.trim(), "backend stderr");
                }
                classify(invocation.output(), &captured)
            }
            Err(e) => Outcome::Diagnostic(vec![format!("failed to run backend: {}", e)]),
        }
    }

    /// Run an invocation and apply its propagation policy. Diagnostics are
    /// always logged; they turn into `Err` only for propagating calls, otherwise
    /// the caller gets `Response::Empty`.
    pub fn invoke(&self, invocation: &Invocation, log: &mut StatusLog) -> Result<Response> {
        match self.execute(invocation) {
            Outcome::Success(response) => {
                log.info(format!("{}...done", invocation.description()));
                Ok(response)
            }
            Outcome::Diagnostic(lines) => {
                for line in &lines {
                    log.error(line.clone());
                }
                if invocation.should_propagate() {
                    Err(Error::Diagnostic(lines))
                } else {
                    warn!(
                        action = invocation.description(),
                        "backend diagnostic ignored"
                    );
                    Ok(Response::Empty)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Fixed {
        output: Captured,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl Runner for Fixed {
        fn run(&self, command_line: &str) -> std::io::Result<Captured> {
            self.seen.borrow_mut().push(command_line.to_string());
            Ok(self.output.clone())
        }
    }

    fn bridge(output: Captured) -> (CommandBridge, Rc<RefCell<Vec<String>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let runner = Fixed {
            output,
            seen: seen.clone(),
        };
        let bridge = CommandBridge::with_runner("himalaya", Box::new(runner)).unwrap();
        (bridge, seen)
    }

    #[test]
    fn test_empty_output_is_success_without_payload() {
        let outcome = classify(OutputMode::Structured, &Captured::default());
        assert_eq!(outcome, Outcome::Success(Response::Empty));
    }

    #[test]
    fn test_response_field_is_unwrapped() {
        let captured = Captured::stdout(r#"{"response":[{"id":1,"seen":true,"subject":null}]}"#);
        let Outcome::Success(Response::Payload(value)) =
            classify(OutputMode::Structured, &captured)
        else {
            panic!("expected payload");
        };
        assert_eq!(value[0]["seen"], Value::Bool(true));
        assert_eq!(value[0]["subject"], Value::Null);
    }

    #[test]
    fn test_non_json_output_is_diagnostic() {
        let captured = Captured::stdout("mailbox does not exist\ncheck your config\n");
        assert_eq!(
            classify(OutputMode::Structured, &captured),
            Outcome::Diagnostic(vec![
                "mailbox does not exist".to_string(),
                "check your config".to_string()
            ])
        );
    }

    #[test]
    fn test_json_without_response_is_diagnostic() {
        let captured = Captured::stdout(r#"{"error":"nope"}"#);
        assert!(matches!(
            classify(OutputMode::Structured, &captured),
            Outcome::Diagnostic(_)
        ));
    }

    #[test]
    fn test_stderr_only_is_diagnostic_in_structured_mode() {
        let captured = Captured {
            stdout: String::new(),
            stderr: "error: cannot connect\n".to_string(),
        };
        assert_eq!(
            classify(OutputMode::Structured, &captured),
            Outcome::Diagnostic(vec!["error: cannot connect".to_string()])
        );
    }

    #[test]
    fn test_plain_mode_trims_text() {
        let captured = Captured::stdout("  From: a@b.c\n\nhello\n\n");
        assert_eq!(
            classify(OutputMode::Plain, &captured),
            Outcome::Success(Response::Text("From: a@b.c\n\nhello".to_string()))
        );
    }

    #[test]
    fn test_plain_mode_stderr_only_is_diagnostic() {
        let captured = Captured {
            stdout: String::new(),
            stderr: "cannot find message 7\n".to_string(),
        };
        assert_eq!(
            classify(OutputMode::Plain, &captured),
            Outcome::Diagnostic(vec!["cannot find message 7".to_string()])
        );

        let noisy = Captured {
            stdout: "2 attachments saved\n".to_string(),
            stderr: "warning: slow server".to_string(),
        };
        assert_eq!(
            classify(OutputMode::Plain, &noisy),
            Outcome::Success(Response::Text("2 attachments saved".to_string()))
        );
    }

    #[test]
    fn test_each_argument_is_quoted() {
        let (bridge, _) = bridge(Captured::default());
        let inv = Invocation::new("Sending")
            .arg("send")
            .arg("Subject: it's $(rm -rf ~); `x`");
        assert_eq!(
            bridge.command_line(&inv),
            "himalaya send 'Subject: it'\\''s $(rm -rf ~); `x`'"
        );
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        assert!(CommandBridge::with_runner("himalaya 'oops", Box::new(ShellRunner)).is_err());
        assert!(CommandBridge::with_runner("   ", Box::new(ShellRunner)).is_err());
    }

    #[test]
    fn test_non_propagating_diagnostic_is_logged_only() {
        let (bridge, seen) = bridge(Captured::stdout("mailbox does not exist"));
        let mut log = StatusLog::default();
        let inv = Invocation::new("Listing").arg("list");

        let response = bridge.invoke(&inv, &mut log).unwrap();

        assert!(response.is_empty());
        assert_eq!(seen.borrow().len(), 1);
        let errors: Vec<_> = log.errors().map(|l| l.text.as_str()).collect();
        assert_eq!(errors, vec!["mailbox does not exist"]);
    }

    #[test]
    fn test_propagating_diagnostic_is_raised() {
        let (bridge, _) = bridge(Captured::stdout("smtp failure"));
        let mut log = StatusLog::default();
        let inv = Invocation::new("Sending").arg("send").propagating();

        let err = bridge.invoke(&inv, &mut log).unwrap_err();
        assert!(matches!(err, Error::Diagnostic(ref lines) if lines == &["smtp failure"]));
        assert_eq!(log.errors().count(), 1);
    }

    #[test]
    fn test_success_logs_done() {
        let (bridge, _) = bridge(Captured::default());
        let mut log = StatusLog::default();
        let inv = Invocation::new("Copying message").arg("copy").propagating();

        bridge.invoke(&inv, &mut log).unwrap();
        assert_eq!(log.last().unwrap().text, "Copying message...done");
        assert_eq!(log.errors().count(), 0);
    }
}
