//! Error types for the mail session controller

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Non-structured backend output, one entry per line
    #[error("{}", .0.join("\n"))]
    Diagnostic(Vec<String>),

    #[error("no message id on line: {line:?}")]
    NotFound { line: String },

    /// The user cancelled an operation that must not complete (e.g. closing a draft)
    #[error("aborted")]
    Aborted,

    #[error("a draft is already being edited")]
    DraftInProgress,

    #[error("no draft is being edited")]
    NoDraft,

    #[error("no account selected")]
    NoAccount,

    #[error("invalid command template: {0}")]
    Template(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode backend payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected backend payload: {0}")]
    UnexpectedPayload(String),
}

impl Error {
    /// Lines to surface on the status channel
    pub fn status_lines(&self) -> Vec<String> {
        match self {
            Error::Diagnostic(lines) => lines.clone(),
            other => vec![other.to_string()],
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_keeps_lines() {
        let err = Error::Diagnostic(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(err.to_string(), "first\nsecond");
        assert_eq!(err.status_lines(), vec!["first", "second"]);
    }

    #[test]
    fn test_other_errors_render_one_line() {
        let err = Error::NotFound {
            line: "header".to_string(),
        };
        assert_eq!(err.status_lines().len(), 1);
        assert!(!err.is_aborted());
        assert!(Error::Aborted.is_aborted());
    }
}
