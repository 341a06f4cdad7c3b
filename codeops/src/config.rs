use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use serde::Deserialize;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
// The backend may run several generate/execute cycles per request.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub offline_mode: bool,
    pub session_root: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    offline_mode: Option<bool>,
    session_dir: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        info!("Loading application configuration");
        trace!("Reading file config");
        let file_cfg = read_file_config()?;
        Self::resolve(file_cfg, &env_value)
    }

    /// Merge file settings with environment overrides and defaults.
    ///
    /// `env` looks up a variable by name and returns `None` when it is unset
    /// or blank.
    pub fn resolve(file_cfg: FileConfig, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = env("CODEOPS_API_URL")
            .or(file_cfg.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        info!("API URL: {}", api_url);

        let request_timeout_secs = match env("CODEOPS_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| {
                    format!("CODEOPS_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'")
                })?,
            None => file_cfg
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        if request_timeout_secs == 0 {
            warn!("Request timeout disabled");
        } else {
            debug!("Request timeout: {}s", request_timeout_secs);
        }

        let offline_mode = resolve_bool(env("CODEOPS_OFFLINE"))
            .or(file_cfg.offline_mode)
            .unwrap_or(false);
        if offline_mode {
            warn!("Offline mode enabled");
        }

        trace!("Resolving session directory");
        let session_root = resolve_session_dir(env("CODEOPS_SESSION_DIR"), file_cfg.session_dir);
        info!("Session root: {}", session_root.display());

        info!("Configuration loaded successfully");
        Ok(Self {
            api_url,
            request_timeout_secs,
            offline_mode,
            session_root,
        })
    }
}

fn read_file_config() -> Result<FileConfig> {
    let Some(path) = config_file_path() else {
        debug!("No config file path found, using defaults");
        return Ok(FileConfig::default());
    };
    read_file_config_from(&path)
}

pub fn read_file_config_from(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        debug!(
            "Config file does not exist: {}, using defaults",
            path.display()
        );
        return Ok(FileConfig::default());
    }

    info!("Reading config file: {}", path.display());
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed reading config file {}", path.display()))?;

    trace!("Parsing TOML config");
    toml::from_str(&data).with_context(|| {
        format!(
            "invalid TOML in {} (make sure string values are quoted)",
            path.display()
        )
    })
}

pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("codeops").join("config.toml"))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn resolve_bool(val: Option<String>) -> Option<bool> {
    let val = val?;
    match val.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn resolve_session_dir(env_override: Option<String>, file_override: Option<String>) -> PathBuf {
    if let Some(path) = env_override.or(file_override) {
        return PathBuf::from(path);
    }
    let base = dirs::data_dir().or_else(|| dirs::home_dir().map(|h| h.join(".local/share")));
    base.unwrap_or_else(|| PathBuf::from(".")).join("codeops")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let cfg = AppConfig::resolve(FileConfig::default(), &env_from(&[])).unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(!cfg.offline_mode);
        assert!(cfg.session_root.ends_with("codeops"));
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_url = \"http://file:9000\"\nrequest_timeout_secs = 60\noffline_mode = true\nsession_dir = \"/tmp/from-file\"\n",
        )
        .unwrap();
        let file_cfg = read_file_config_from(&path).unwrap();
        let env = env_from(&[
            ("CODEOPS_API_URL", "http://env:7000"),
            ("CODEOPS_OFFLINE", "no"),
        ]);
        let cfg = AppConfig::resolve(file_cfg, &env).unwrap();
        assert_eq!(cfg.api_url, "http://env:7000");
        assert_eq!(cfg.request_timeout_secs, 60);
        assert!(!cfg.offline_mode);
        assert_eq!(cfg.session_root, PathBuf::from("/tmp/from-file"));
    }

    #[test]
    fn invalid_timeout_env_is_an_error() {
        let env = env_from(&[("CODEOPS_TIMEOUT_SECS", "soon")]);
        assert!(AppConfig::resolve(FileConfig::default(), &env).is_err());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_url = http://unquoted\n").unwrap();
        let err = read_file_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = read_file_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.api_url.is_none());
    }
}
