//! Client configuration
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Explicit path, or the override in the data dir
//!    (~/.local/share/sift/config/client.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! `SIFT_API_URL` replaces the service base URL after the file is read.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/client.toml");

/// Environment variable overriding `base_url`
pub const API_URL_ENV: &str = "SIFT_API_URL";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Transaction service root, e.g. `http://127.0.0.1:5000/api`
    pub base_url: String,
    /// Timeout for every call except the streamed batch job
    pub request_timeout: Duration,
    pub page_size: u32,
    pub batch_limit: u32,
    /// How long final batch progress stays visible before it is cleared
    pub progress_clear_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            request_timeout: Duration::from_secs(30),
            page_size: 50,
            batch_limit: 100,
            progress_clear_delay: Duration::from_millis(1500),
        }
    }
}

impl ClientConfig {
    /// Load from an explicit path or the default override location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?,
                None => DEFAULT_CONFIG.to_string(),
            },
        };
        parse_config(&content)
    }

    /// Load, then apply the `SIFT_API_URL` override
    pub fn from_env_or_file(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load(path)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        Ok(config)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("sift").join("config").join("client.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    service: Option<RawService>,
    search: Option<RawSearch>,
    categorize: Option<RawCategorize>,
}

#[derive(Debug, Deserialize)]
struct RawService {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawSearch {
    page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawCategorize {
    batch_limit: Option<u32>,
    progress_clear_ms: Option<u64>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<ClientConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = ClientConfig::default();

    if let Some(service) = raw.service {
        if let Some(url) = service.base_url {
            config.base_url = url;
        }
        if let Some(timeout) = service.timeout_secs {
            config.request_timeout = Duration::from_secs(timeout);
        }
    }

    if let Some(search) = raw.search {
        if let Some(size) = search.page_size {
            if size == 0 {
                return Err(Error::Config("search.page_size must be at least 1".into()));
            }
            config.page_size = size;
        }
    }

    if let Some(categorize) = raw.categorize {
        if let Some(limit) = categorize.batch_limit {
            config.batch_limit = limit;
        }
        if let Some(ms) = categorize.progress_clear_ms {
            config.progress_clear_delay = Duration::from_millis(ms);
        }
    }

    Ok(config)
}
