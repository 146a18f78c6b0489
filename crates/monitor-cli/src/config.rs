use std::path::{Path, PathBuf};
use std::time::Duration;

use monitor_core::{ModelFilter, DEFAULT_SERIES_LEN};
use monitor_poller::{PollerConfig, DEFAULT_EVENTS_LIMIT, DEFAULT_POLL_INTERVAL};
use monitor_source::http::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use monitor_source::HttpSourceConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "llm-monitor.toml";
const HOME_CONFIG_DIR: &str = ".llm-monitor";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub base_url: String,
    pub interval_secs: u64,
    pub events_limit: u32,
    pub series_len: usize,
    pub request_timeout_secs: u64,
    pub model: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            events_limit: DEFAULT_EVENTS_LIMIT,
            series_len: DEFAULT_SERIES_LEN,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            model: None,
        }
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub interval_secs: Option<u64>,
    pub events_limit: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub model: Option<String>,
}

impl MonitorConfig {
    /// Loads the file layer. An explicit path must exist; otherwise the
    /// working directory and then `~/.llm-monitor/` are searched, and
    /// defaults are used when neither has a config file.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_locations().into_iter().find(|path| path.exists()) {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(base_url) = overrides.base_url {
            self.base_url = base_url;
        }
        if let Some(interval_secs) = overrides.interval_secs {
            self.interval_secs = interval_secs;
        }
        if let Some(events_limit) = overrides.events_limit {
            self.events_limit = events_limit;
        }
        if let Some(timeout) = overrides.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if overrides.model.is_some() {
            self.model = overrides.model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)?;
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "interval_secs must be at least 1".to_string(),
            ));
        }
        if self.events_limit == 0 {
            return Err(ConfigError::Invalid(
                "events_limit must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn initial_filter(&self) -> ModelFilter {
        ModelFilter::from_option(self.model.as_deref().map(|name| name.trim().to_string()))
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(self.interval_secs),
            events_limit: self.events_limit,
            series_len: self.series_len,
        }
    }

    pub fn source_config(&self) -> HttpSourceConfig {
        HttpSourceConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(HOME_CONFIG_DIR).join("config.toml"));
    }
    locations
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| {
        ConfigError::Invalid(format!("base_url {base_url:?} is not usable: {reason}"))
    };

    let url = url::Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}
