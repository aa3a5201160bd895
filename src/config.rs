use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the remote answer service, e.g. `http://localhost:8000/api`.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Bearer token attached to every request. The `ASKDESK_TOKEN`
    /// environment variable takes precedence when set.
    #[serde(default)]
    pub auth_token: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    /// File holding the serialized history log (single durable slot).
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

fn default_history_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => Path::new(&home).join(".askdesk").join("history.json"),
        None => PathBuf::from("askdesk-history.json"),
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Files larger than this are dropped at intake, matching the
    /// service-side limit.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

impl ApiConfig {
    /// Resolve the effective auth token: environment first, then config.
    pub fn resolved_token(&self) -> Option<String> {
        std::env::var("ASKDESK_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.auth_token.clone())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.api.base_url.trim().is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }

    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }

    if config.upload.max_file_bytes == 0 {
        anyhow::bail!("upload.max_file_bytes must be > 0");
    }

    Ok(config)
}
