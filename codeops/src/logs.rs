use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Error,
    Success,
    Progress,
    #[default]
    Plain,
}

impl LogKind {
    /// Case-sensitive substring match, checked in order: `"Error"`,
    /// `"Success"`, `"Generating"`.
    pub fn classify(text: &str) -> Self {
        if text.contains("Error") {
            LogKind::Error
        } else if text.contains("Success") {
            LogKind::Success
        } else if text.contains("Generating") {
            LogKind::Progress
        } else {
            LogKind::Plain
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub kind: LogKind,
    pub text: String,
}

impl LogLine {
    pub fn classified(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: LogKind::classify(&text),
            text,
        }
    }

    pub fn tagged(kind: LogKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}
