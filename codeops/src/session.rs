use log::{debug, error, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::client::{ClientError, SolveOutcome, TaskBackend};
use crate::logs::{LogKind, LogLine};

pub const BOOTSTRAP_LINES: [&str; 2] = [
    "Initializing CodeOPS ULTRA Protocol...",
    "Connecting to Secure Docker Sandbox...",
];

pub const CONNECTION_FAILED_LINE: &str = "CRITICAL ERROR: Connection to Agent Brain Failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Idle,
    Working,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub run_id: Uuid,
    pub task: String,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    task: String,
    status: SessionStatus,
    logs: Vec<LogLine>,
    code: String,
    attempts: u32,
    run_id: Option<Uuid>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn logs(&self) -> &[LogLine] {
        &self.logs
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn can_submit(&self) -> bool {
        self.status != SessionStatus::Working
    }

    /// Attempts beyond the first.
    pub fn retry_cycles(&self) -> Option<u32> {
        (self.attempts > 0).then(|| self.attempts - 1)
    }

    pub fn begin(&mut self, text: &str) -> Option<Submission> {
        if text.trim().is_empty() {
            warn!("Attempted to submit empty task");
            return None;
        }
        if !self.can_submit() {
            warn!("Submission rejected: a task is already in flight");
            return None;
        }

        let run_id = Uuid::new_v4();
        info!("Submitting task (run {}): {}", run_id, text.trim());
        self.task = text.to_string();
        self.logs.clear();
        self.code.clear();
        self.attempts = 0;
        self.status = SessionStatus::Working;
        self.run_id = Some(run_id);
        for line in BOOTSTRAP_LINES {
            self.logs.push(LogLine::classified(line));
        }

        Some(Submission {
            run_id,
            task: self.task.clone(),
        })
    }

    /// Ignored unless the session is `Working`.
    pub fn finish(&mut self, outcome: Result<SolveOutcome, ClientError>) {
        if self.status != SessionStatus::Working {
            warn!("Ignoring outcome: session is {:?}, not Working", self.status);
            return;
        }
        match outcome {
            Ok(result) => {
                info!(
                    "Run completed: {} log lines, {} attempts",
                    result.logs.len(),
                    result.attempts
                );
                self.logs.extend(result.logs);
                self.code = result.code;
                self.attempts = result.attempts;
                self.status = SessionStatus::Completed;
            }
            Err(err) => {
                error!("Agent request failed: {}", err);
                self.logs
                    .push(LogLine::tagged(LogKind::Error, CONNECTION_FAILED_LINE));
                self.status = SessionStatus::Failed;
            }
        }
        debug!("Session status now {:?}", self.status);
    }

    pub fn submit_task(&mut self, text: &str, backend: &dyn TaskBackend) -> bool {
        let Some(submission) = self.begin(text) else {
            return false;
        };
        let outcome = backend.solve(&submission.task);
        self.finish(outcome);
        true
    }
}
