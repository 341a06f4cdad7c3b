use std::io::Write;

use anyhow::Result;
use log::{error, info};

use crate::app::App;
use crate::session::SessionStatus;
use crate::view;

pub const EXIT_COMPLETED: u8 = 0;
pub const EXIT_FAILED: u8 = 1;
pub const EXIT_EMPTY_TASK: u8 = 2;

pub fn exit_status(status: SessionStatus) -> u8 {
    match status {
        SessionStatus::Completed => EXIT_COMPLETED,
        _ => EXIT_FAILED,
    }
}

/// Submits `task` once and prints the logs, then the code, to `out`.
/// Returns the process exit status.
pub fn run(app: &mut App, task: &str, out: &mut dyn Write, err: &mut dyn Write) -> Result<u8> {
    let Some(status) = app.run_once(task) else {
        error!("Rejected empty task");
        writeln!(err, "Task must not be empty")?;
        return Ok(EXIT_EMPTY_TASK);
    };
    info!("Headless run finished: {:?}", status);

    let session = app.session();
    for line in session.logs() {
        writeln!(out, "{} {}", view::log_icon(line.kind), line.text)?;
    }
    writeln!(out, "--- {} ---", view::CODE_TITLE)?;
    writeln!(out, "{}", view::code_text(session))?;
    if let Some(footer) = view::footer_text(session) {
        writeln!(out, "{footer}")?;
    }
    if let Some(notice) = &app.notice {
        writeln!(err, "{notice}")?;
    }
    out.flush()?;

    Ok(exit_status(status))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::{ClientError, SolveOutcome, TaskBackend};
    use crate::logs::LogLine;
    use crate::session::{BOOTSTRAP_LINES, CONNECTION_FAILED_LINE};

    struct Reply(fn() -> Result<SolveOutcome, ClientError>);

    impl TaskBackend for Reply {
        fn solve(&self, _task: &str) -> Result<SolveOutcome, ClientError> {
            (self.0)()
        }
    }

    struct Crashing;

    impl TaskBackend for Crashing {
        fn solve(&self, _task: &str) -> Result<SolveOutcome, ClientError> {
            panic!("worker died");
        }
    }

    fn solved() -> Result<SolveOutcome, ClientError> {
        Ok(SolveOutcome {
            logs: vec![LogLine::classified("Execution Successful.")],
            code: "print(1)".into(),
            attempts: 2,
        })
    }

    fn refused() -> Result<SolveOutcome, ClientError> {
        Err(ClientError::Malformed("nope".into()))
    }

    fn run_with(app: &mut App, task: &str) -> (u8, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(app, task, &mut out, &mut err).unwrap();
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn completed_run_prints_logs_then_code_and_exits_zero() {
        let mut app = App::new(Arc::new(Reply(solved)), None);
        let (code, out, err) = run_with(&mut app, "count to one");

        assert_eq!(code, EXIT_COMPLETED);
        assert!(err.is_empty());
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].ends_with(BOOTSTRAP_LINES[0]));
        assert!(lines[1].ends_with(BOOTSTRAP_LINES[1]));
        assert!(lines[2].ends_with("Execution Successful."));
        assert_eq!(lines[3], format!("--- {} ---", view::CODE_TITLE));
        assert_eq!(lines[4], "print(1)");
        assert!(lines[5].contains("SELF_CORRECTION_CYCLES: 1"));
    }

    #[test]
    fn failed_run_exits_one() {
        let mut app = App::new(Arc::new(Reply(refused)), None);
        let (code, out, _) = run_with(&mut app, "count to one");

        assert_eq!(code, EXIT_FAILED);
        assert!(out.contains(CONNECTION_FAILED_LINE));
        assert!(out.contains(view::CODE_PLACEHOLDER));
    }

    #[test]
    fn blank_task_exits_two_without_output() {
        let mut app = App::new(Arc::new(Reply(solved)), None);
        let (code, out, err) = run_with(&mut app, "  \t");

        assert_eq!(code, EXIT_EMPTY_TASK);
        assert!(out.is_empty());
        assert_eq!(err.trim(), "Task must not be empty");
        assert_eq!(app.session().status(), SessionStatus::Idle);
    }

    #[test]
    fn dead_worker_is_a_failed_run_not_a_blank_task() {
        let mut app = App::new(Arc::new(Crashing), None);
        let (code, out, _) = run_with(&mut app, "crash please");

        assert_eq!(code, EXIT_FAILED);
        assert_eq!(app.session().status(), SessionStatus::Failed);
        assert!(out.contains(CONNECTION_FAILED_LINE));
    }

    #[test]
    fn exit_status_maps_terminal_states() {
        assert_eq!(exit_status(SessionStatus::Completed), 0);
        assert_eq!(exit_status(SessionStatus::Failed), 1);
    }
}
