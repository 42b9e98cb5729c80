//! Stepdoc configuration
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. CLI flags (applied by the binary)
//! 2. Environment variables (`STEPDOC_*`, `OLLAMA_HOST`), `.env` included
//! 3. Config file (`stepdoc.yaml` in the working directory, or `--config`)
//! 4. Defaults

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StepdocError};
use crate::provider::{OllamaProvider, DEFAULT_HOST, DEFAULT_MODEL, DEFAULT_TIMEOUT};

pub const DEFAULT_CONFIG_FILE: &str = "stepdoc.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StepdocConfig {
    /// Session directory (log.json + images/)
    pub session_dir: PathBuf,
    /// Markdown output file
    pub output: PathBuf,
    /// Vision provider name
    pub provider: String,
    pub ollama_url: String,
    pub model: String,
    /// Upper bound for one description request
    pub timeout_secs: u64,
    /// Steps described at once during synthesis
    pub concurrency: usize,
}

impl Default for StepdocConfig {
    fn default() -> Self {
        Self {
            session_dir: PathBuf::from("session_data"),
            output: PathBuf::from("documentation.md"),
            provider: "ollama".to_string(),
            ollama_url: DEFAULT_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            concurrency: 1,
        }
    }
}

impl StepdocConfig {
    /// Load from `path`, or from `stepdoc.yaml` when present
    ///
    /// An explicit path must exist; the implicit one may be missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if required {
                return Err(StepdocError::Config {
                    reason: format!("config file '{}' not found", path.display()),
                });
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| StepdocError::Config {
            reason: format!("Failed to read '{}': {}", path.display(), e),
        })?;

        Self::from_yaml(&content).map_err(|e| StepdocError::Config {
            reason: format!("Failed to parse '{}': {}", path.display(), e),
        })
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Merge process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Merge values from `lookup` (env-shaped keys)
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("STEPDOC_SESSION_DIR") {
            self.session_dir = PathBuf::from(dir);
        }
        if let Some(output) = get("STEPDOC_OUTPUT") {
            self.output = PathBuf::from(output);
        }
        if let Some(provider) = get("STEPDOC_PROVIDER") {
            self.provider = provider;
        }
        // OLLAMA_HOST is what the ollama CLI itself reads; ours wins
        if let Some(host) = get("OLLAMA_HOST") {
            self.ollama_url = normalize_host(&host);
        }
        if let Some(url) = get("STEPDOC_OLLAMA_URL") {
            self.ollama_url = url;
        }
        if let Some(model) = get("STEPDOC_MODEL") {
            self.model = model;
        }
        if let Some(secs) = get("STEPDOC_TIMEOUT_SECS") {
            self.timeout_secs = parse_number("STEPDOC_TIMEOUT_SECS", &secs)?;
        }
        if let Some(n) = get("STEPDOC_CONCURRENCY") {
            self.concurrency = parse_number("STEPDOC_CONCURRENCY", &n)?;
        }

        Ok(self)
    }

    /// Reject values that would make a run misbehave
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(StepdocError::InvalidConfig {
                field: "timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(StepdocError::InvalidConfig {
                field: "concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.provider.eq_ignore_ascii_case("ollama") {
            OllamaProvider::new(&self.ollama_url, self.model.clone(), self.timeout())?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| StepdocError::InvalidConfig {
            field: field.to_string(),
            reason: format!("'{}' is not a number", value),
        })
}

/// `OLLAMA_HOST` is often given as `host:port`
fn normalize_host(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
