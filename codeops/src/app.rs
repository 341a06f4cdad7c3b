use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use log::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::client::{ClientError, SolveOutcome, TaskBackend};
use crate::session::{Session, SessionStatus};
use crate::store::RunStore;

type SolveResult = Result<SolveOutcome, ClientError>;

pub type SharedBackend = Arc<dyn TaskBackend + Send + Sync>;

pub struct App {
    pub input: String,
    pub notice: Option<String>,
    pub log_scroll: usize,
    pub code_scroll: usize,
    max_log_scroll: usize,
    session: Session,
    backend: SharedBackend,
    store: Option<RunStore>,
    pending: Option<Receiver<SolveResult>>,
    seen_logs: usize,
    seen_run: Option<Uuid>,
}

impl App {
    pub fn new(backend: SharedBackend, store: Option<RunStore>) -> Self {
        info!("Creating new App instance");
        debug!("Run export enabled: {}", store.is_some());
        Self {
            input: String::new(),
            notice: None,
            log_scroll: 0,
            code_scroll: 0,
            max_log_scroll: 0,
            session: Session::new(),
            backend,
            store,
            pending: None,
            seen_logs: 0,
            seen_run: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_working(&self) -> bool {
        !self.session.can_submit()
    }

    /// Returns `false` when the input was rejected.
    pub fn submit(&mut self) -> bool {
        let Some(submission) = self.session.begin(&self.input) else {
            return false;
        };
        self.notice = None;

        let (tx, rx) = mpsc::channel();
        let backend = Arc::clone(&self.backend);
        let spawned = thread::Builder::new()
            .name("codeops-solve".into())
            .spawn(move || {
                let outcome = backend.solve(&submission.task);
                if tx.send(outcome).is_err() {
                    warn!("Solve result dropped: receiver gone");
                }
            });

        match spawned {
            Ok(_) => {
                trace!("Solve worker started");
                self.pending = Some(rx);
            }
            Err(err) => {
                error!("Failed to start solve worker: {}", err);
                self.complete(Err(ClientError::Worker(err.to_string())));
            }
        }
        true
    }

    /// Returns `true` when the session changed.
    pub fn poll(&mut self) -> bool {
        let Some(rx) = &self.pending else {
            return false;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(ClientError::Worker(
                "worker exited without a result".into(),
            )),
        };
        self.pending = None;
        self.complete(outcome);
        true
    }

    pub fn wait(&mut self) {
        let Some(rx) = self.pending.take() else {
            return;
        };
        let outcome = rx
            .recv()
            .unwrap_or_else(|_| Err(ClientError::Worker("worker exited without a result".into())));
        self.complete(outcome);
    }

    /// Submit `task` and block until it resolves. `None` when the task was
    /// rejected.
    pub fn run_once(&mut self, task: &str) -> Option<SessionStatus> {
        self.input = task.to_string();
        if !self.submit() {
            return None;
        }
        self.wait();
        Some(self.session.status())
    }

    fn complete(&mut self, outcome: SolveResult) {
        self.session.finish(outcome);
        self.export_run();
    }

    fn export_run(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.write_run(&self.session) {
            error!("Failed exporting run: {:?}", err);
            self.notice = Some(format!("Run export failed: {err}"));
        }
    }

    pub fn save_code(&mut self) {
        let Some(store) = &self.store else {
            self.notice = Some("Saving is unavailable: no session directory".into());
            return;
        };
        self.notice = match store.save_code(&self.session) {
            Ok(Some(path)) => Some(format!("Code saved to {}", path.display())),
            Ok(None) => Some("No code to save yet".into()),
            Err(err) => {
                error!("Failed saving code: {:?}", err);
                Some(format!("Save failed: {err}"))
            }
        };
    }

    pub fn push_char(&mut self, c: char) {
        if !self.is_working() {
            self.input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if !self.is_working() {
            self.input.pop();
        }
    }

    pub fn scroll_logs_up(&mut self, rows: usize) {
        self.log_scroll = (self.log_scroll + rows).min(self.max_log_scroll);
    }

    pub fn scroll_logs_down(&mut self, rows: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(rows);
    }

    pub fn set_max_log_scroll(&mut self, rows: usize) {
        self.max_log_scroll = rows;
        self.log_scroll = self.log_scroll.min(rows);
    }

    pub fn scroll_code_down(&mut self, rows: usize) {
        let max = self.session.code().lines().count().saturating_sub(1);
        self.code_scroll = (self.code_scroll + rows).min(max);
    }

    pub fn scroll_code_up(&mut self, rows: usize) {
        self.code_scroll = self.code_scroll.saturating_sub(rows);
    }

    // A new run also rewinds the code panel.
    pub fn follow_logs(&mut self) {
        let run = self.session.run_id();
        if run != self.seen_run {
            self.seen_run = run;
            self.code_scroll = 0;
            self.seen_logs = 0;
        }
        let len = self.session.logs().len();
        if len != self.seen_logs {
            self.seen_logs = len;
            self.log_scroll = 0;
        }
    }
}
