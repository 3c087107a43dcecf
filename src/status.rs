use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub level: Level,
    pub text: String,
}

/// User-facing status channel. Every line is mirrored to the tracing log.
#[derive(Debug, Default)]
pub struct StatusLog {
    lines: Vec<StatusLine>,
}

impl StatusLog {
    pub fn info(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!(status = %text);
        self.lines.push(StatusLine {
            level: Level::Info,
            text,
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        error!(status = %text);
        self.lines.push(StatusLine {
            level: Level::Error,
            text,
        });
    }

    pub fn lines(&self) -> &[StatusLine] {
        &self.lines
    }

    pub fn last(&self) -> Option<&StatusLine> {
        self.lines.last()
    }

    pub fn errors(&self) -> impl Iterator<Item = &StatusLine> {
        self.lines.iter().filter(|l| l.level == Level::Error)
    }

    /// Drain lines accumulated since the last call (the host shows them once)
    pub fn take(&mut self) -> Vec<StatusLine> {
        std::mem::take(&mut self.lines)
    }
}
