use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, trace, warn};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::logs::{LogKind, LogLine};

const SOLVE_PATH: &str = "/api/solve";

/// Anything that can run one task through the agent and report back.
///
/// Implemented by [`AgentClient`] for the real backend; tests substitute
/// their own.
pub trait TaskBackend {
    fn solve(&self, task: &str) -> std::result::Result<SolveOutcome, ClientError>;
}

/// Normalized result of one successful round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOutcome {
    pub logs: Vec<LogLine>,
    pub code: String,
    pub attempts: u32,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed sending solve request to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("agent backend returned HTTP {status}: {snippet}")]
    Status { status: u16, snippet: String },
    #[error("malformed agent response: {0}")]
    Malformed(String),
    #[error("solve worker failed: {0}")]
    Worker(String),
}

#[derive(Clone)]
pub struct AgentClient {
    inner: ClientMode,
}

#[derive(Clone)]
enum ClientMode {
    Remote(RemoteClient),
    Offline,
}

#[derive(Clone)]
struct RemoteClient {
    http: Client,
    endpoint: String,
}

impl AgentClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        info!("Creating AgentClient");
        if config.offline_mode {
            warn!("Running in offline mode - solve requests will be mocked");
            return Ok(Self {
                inner: ClientMode::Offline,
            });
        }

        let endpoint = build_solve_endpoint(&config.api_url)?;
        let timeout = match config.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        trace!("Building HTTP client (timeout: {:?})", timeout);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        info!("AgentClient created: endpoint={}", endpoint);
        Ok(Self {
            inner: ClientMode::Remote(RemoteClient { http, endpoint }),
        })
    }

    pub fn endpoint(&self) -> Option<&str> {
        match &self.inner {
            ClientMode::Remote(remote) => Some(remote.endpoint.as_str()),
            ClientMode::Offline => None,
        }
    }
}

impl TaskBackend for AgentClient {
    fn solve(&self, task: &str) -> std::result::Result<SolveOutcome, ClientError> {
        info!("Requesting solve (task length: {} chars)", task.len());
        match &self.inner {
            ClientMode::Remote(remote) => {
                debug!("Using remote agent backend");
                remote.solve(task)
            }
            ClientMode::Offline => {
                warn!("Using offline mock solve");
                Ok(mock_outcome(task))
            }
        }
    }
}

impl RemoteClient {
    fn solve(&self, task: &str) -> std::result::Result<SolveOutcome, ClientError> {
        let request = SolveRequest { task };

        info!("Sending POST request to {}", self.endpoint);
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|source| ClientError::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = resp.status();
        info!("Received response: status={}", status.as_u16());

        let raw_body = resp.text().map_err(|source| ClientError::Transport {
            endpoint: self.endpoint.clone(),
            source,
        })?;
        debug!("Response body length: {} bytes", raw_body.len());

        if !status.is_success() {
            error!("Solve request failed with status {}", status.as_u16());
            let snippet = if raw_body.is_empty() {
                "no response body".to_string()
            } else {
                raw_body.chars().take(500).collect()
            };
            return Err(ClientError::Status {
                status: status.as_u16(),
                snippet,
            });
        }

        trace!("Parsing JSON response");
        parse_solve_response(&raw_body)
    }
}

/// Decode a solve response body. Every declared field is required.
pub fn parse_solve_response(raw: &str) -> std::result::Result<SolveOutcome, ClientError> {
    let body: SolveResponse =
        serde_json::from_str(raw).map_err(|err| ClientError::Malformed(err.to_string()))?;

    let logs = body
        .logs
        .into_iter()
        .map(|entry| match entry {
            WireLogLine::Plain(text) => LogLine::classified(text),
            WireLogLine::Tagged { kind, text } => LogLine::tagged(kind, text),
        })
        .collect::<Vec<_>>();

    info!(
        "Solve response decoded: {} log lines, {} bytes of code, {} attempts",
        logs.len(),
        body.code.len(),
        body.attempts
    );
    Ok(SolveOutcome {
        logs,
        code: body.code,
        attempts: body.attempts,
    })
}

fn build_solve_endpoint(api_url: &str) -> Result<String> {
    let endpoint = format!("{}{}", api_url.trim().trim_end_matches('/'), SOLVE_PATH);
    reqwest::Url::parse(&endpoint)
        .with_context(|| format!("invalid agent API URL '{api_url}' - expected absolute URL"))?;
    Ok(endpoint)
}

fn mock_outcome(task: &str) -> SolveOutcome {
    let preview = task.chars().take(60).collect::<String>();
    SolveOutcome {
        logs: vec![
            LogLine::classified("Generating Solution (Attempt 1)..."),
            LogLine::classified(format!(
                "Execution Successful.\nOutput:\noffline mock run for '{preview}'"
            )),
        ],
        code: format!("# offline mock solution\nprint({:?})\n", preview),
        attempts: 1,
    }
}

#[derive(Serialize)]
struct SolveRequest<'a> {
    task: &'a str,
}

#[derive(Deserialize)]
struct SolveResponse {
    logs: Vec<WireLogLine>,
    code: String,
    attempts: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireLogLine {
    Plain(String),
    Tagged { kind: LogKind, text: String },
}
