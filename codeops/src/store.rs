use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use uuid::Uuid;

use crate::logs::LogLine;
use crate::session::{Session, SessionStatus};

#[derive(Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create session root {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn write_run(&self, session: &Session) -> Result<PathBuf> {
        if !session.status().is_terminal() {
            bail!("cannot export a run in state {:?}", session.status());
        }
        let finished_at = Utc::now();
        let run_id = session.run_id().unwrap_or_else(Uuid::nil);
        let path = self.root.join(format!(
            "run-{}-{}.json",
            finished_at.format("%Y%m%d-%H%M%S"),
            run_id
        ));
        let payload = RunExport {
            run_id,
            task: session.task(),
            status: session.status(),
            logs: session.logs(),
            code: session.code(),
            attempts: session.attempts(),
            finished_at,
        };
        let data = serde_json::to_string_pretty(&payload)?;
        fs::write(&path, data).with_context(|| format!("failed writing {}", path.display()))?;
        info!("Run exported to {}", path.display());
        Ok(path)
    }

    /// Empty code is not written.
    pub fn save_code(&self, session: &Session) -> Result<Option<PathBuf>> {
        let code = session.code();
        if code.is_empty() {
            debug!("No code to save");
            return Ok(None);
        }
        let path = self.root.join(format!(
            "code-{}-{}.py",
            Utc::now().format("%Y%m%d-%H%M%S"),
            session.run_id().unwrap_or_else(Uuid::nil)
        ));
        fs::write(&path, code).with_context(|| format!("failed writing {}", path.display()))?;
        info!("Code saved to {}", path.display());
        Ok(Some(path))
    }
}

#[derive(Serialize)]
struct RunExport<'a> {
    run_id: Uuid,
    task: &'a str,
    status: SessionStatus,
    logs: &'a [LogLine],
    code: &'a str,
    attempts: u32,
    finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, SolveOutcome, TaskBackend};

    struct Fixed;

    impl TaskBackend for Fixed {
        fn solve(&self, _task: &str) -> std::result::Result<SolveOutcome, ClientError> {
            Ok(SolveOutcome {
                logs: vec![LogLine::classified("Execution Successful.")],
                code: "print('hi')".into(),
                attempts: 2,
            })
        }
    }

    #[test]
    fn writes_run_export() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RunStore::new(tmp.path().join("runs")).unwrap();
        let mut session = Session::new();
        session.submit_task("say hi", &Fixed);

        let path = store.write_run(&session).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["status"], "COMPLETED");
        assert_eq!(value["attempts"], 2);
        assert_eq!(value["code"], "print('hi')");
        assert_eq!(value["logs"][2]["kind"], "success");
        assert_eq!(value["run_id"], session.run_id().unwrap().to_string());
    }

    #[test]
    fn refuses_to_export_unfinished_run() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RunStore::new(tmp.path().to_path_buf()).unwrap();
        let mut session = Session::new();
        assert!(store.write_run(&session).is_err());
        session.begin("pending").unwrap();
        assert!(store.write_run(&session).is_err());
    }

    #[test]
    fn save_code_skips_empty_code() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RunStore::new(tmp.path().to_path_buf()).unwrap();
        let mut session = Session::new();
        assert!(store.save_code(&session).unwrap().is_none());

        session.submit_task("say hi", &Fixed);
        let path = store.save_code(&session).unwrap().unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "print('hi')");
    }

    #[test]
    fn saved_code_files_are_named_per_run() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RunStore::new(tmp.path().to_path_buf()).unwrap();
        let mut session = Session::new();

        session.submit_task("first", &Fixed);
        let first = store.save_code(&session).unwrap().unwrap();
        session.submit_task("second", &Fixed);
        let second = store.save_code(&session).unwrap().unwrap();

        assert_ne!(first, second);
        let name = second.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.contains(&session.run_id().unwrap().to_string()));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 2);
    }
}
