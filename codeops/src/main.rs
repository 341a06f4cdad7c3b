use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, info, warn};

use codeops::app::App;
use codeops::client::AgentClient;
use codeops::config::AppConfig;
use codeops::logger::{FileLogger, LOG_FILE_NAME};
use codeops::store::RunStore;
use codeops::{headless, tui};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run a single task without the TUI and print the result
    #[arg(long)]
    task: Option<String>,

    /// Base URL of the agent backend (overrides config)
    #[arg(long)]
    api_url: Option<String>,

    /// Request timeout in seconds; 0 waits indefinitely
    #[arg(long)]
    timeout: Option<u64>,

    /// Answer tasks with a built-in mock instead of calling the backend
    #[arg(long)]
    offline: bool,

    /// Verbosity of the log file
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(secs) = cli.timeout {
        config.request_timeout_secs = secs;
    }
    config.offline_mode |= cli.offline;

    let is_headless = cli.task.is_some();
    let log_path = config.session_root.join(LOG_FILE_NAME);
    if let Err(err) = FileLogger::init(&log_path, cli.log_level, !is_headless) {
        eprintln!("Warning: logging disabled ({err})");
    }
    info!("codeops starting (headless: {})", is_headless);

    let client = AgentClient::new(&config)?;
    let store = match RunStore::new(config.session_root.clone()) {
        Ok(store) => Some(store),
        Err(err) => {
            warn!("Run export disabled: {:?}", err);
            None
        }
    };
    let mut app = App::new(Arc::new(client), store);

    match cli.task {
        Some(task) => {
            let code = headless::run(&mut app, &task, &mut io::stdout(), &mut io::stderr())?;
            Ok(ExitCode::from(code))
        }
        None => {
            tui::run(&mut app)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
