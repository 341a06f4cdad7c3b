//! Presentation derived from a [`Session`]. Nothing here mutates state.

use crate::logs::LogKind;
use crate::session::{Session, SessionStatus};

pub const LOGS_PLACEHOLDER: &str = "Waiting for mission parameters...";
pub const CODE_PLACEHOLDER: &str = "# Waiting for agent output...";
pub const CODE_TITLE: &str = "VERIFIED_SOURCE_CODE.py";
pub const INPUT_PLACEHOLDER: &str =
    "Enter engineering task (e.g., 'Write a Python script to scan ports 80-100 on localhost')";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Active,
    Success,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    pub label: &'static str,
    pub tone: Tone,
}

/// Badge for a status. `Failed` shares the standby badge.
pub fn status_badge(status: SessionStatus) -> StatusBadge {
    match status {
        SessionStatus::Working => StatusBadge {
            label: "SYSTEM ACTIVE: PROCESSING",
            tone: Tone::Active,
        },
        SessionStatus::Completed => StatusBadge {
            label: "MISSION SUCCESS",
            tone: Tone::Success,
        },
        SessionStatus::Idle | SessionStatus::Failed => StatusBadge {
            label: "SYSTEM STANDBY",
            tone: Tone::Neutral,
        },
    }
}

pub fn log_icon(kind: LogKind) -> &'static str {
    match kind {
        LogKind::Error => "✗",
        LogKind::Success => "✓",
        LogKind::Progress => "⟳",
        LogKind::Plain => "→",
    }
}

/// Text for the code panel: the code verbatim, or the placeholder.
pub fn code_text(session: &Session) -> &str {
    if session.code().is_empty() {
        CODE_PLACEHOLDER
    } else {
        session.code()
    }
}

/// Footer line, present only once the backend reported attempts.
pub fn footer_text(session: &Session) -> Option<String> {
    session.retry_cycles().map(|cycles| {
        format!("SELF_CORRECTION_CYCLES: {cycles} | SANDBOX_INTEGRITY: VERIFIED")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, SolveOutcome, TaskBackend};
    use crate::logs::LogLine;

    struct Reply(u32, &'static str);

    impl TaskBackend for Reply {
        fn solve(&self, _task: &str) -> Result<SolveOutcome, ClientError> {
            Ok(SolveOutcome {
                logs: vec![LogLine::classified("Execution Successful.")],
                code: self.1.to_string(),
                attempts: self.0,
            })
        }
    }

    #[test]
    fn badge_follows_status() {
        assert_eq!(status_badge(SessionStatus::Working).tone, Tone::Active);
        assert_eq!(status_badge(SessionStatus::Completed).label, "MISSION SUCCESS");
        assert_eq!(status_badge(SessionStatus::Idle), status_badge(SessionStatus::Failed));
        assert_eq!(status_badge(SessionStatus::Failed).label, "SYSTEM STANDBY");
    }

    #[test]
    fn highlighted_kinds_have_distinct_icons() {
        let icons = [LogKind::Error, LogKind::Success, LogKind::Progress, LogKind::Plain]
            .map(log_icon);
        for (i, a) in icons.iter().enumerate() {
            for b in &icons[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn code_placeholder_until_code_arrives() {
        let mut session = Session::new();
        assert_eq!(code_text(&session), CODE_PLACEHOLDER);
        session.submit_task("task", &Reply(1, "print(1)"));
        assert_eq!(code_text(&session), "print(1)");
    }

    #[test]
    fn footer_reports_retries_beyond_first_attempt() {
        let mut session = Session::new();
        assert_eq!(footer_text(&session), None);
        session.submit_task("task", &Reply(3, "x"));
        assert_eq!(
            footer_text(&session).as_deref(),
            Some("SELF_CORRECTION_CYCLES: 2 | SANDBOX_INTEGRITY: VERIFIED")
        );
    }

    #[test]
    fn footer_hidden_when_backend_reports_zero_attempts() {
        let mut session = Session::new();
        session.submit_task("task", &Reply(0, ""));
        assert_eq!(footer_text(&session), None);
        assert_eq!(code_text(&session), CODE_PLACEHOLDER);
    }
}
