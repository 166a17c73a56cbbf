//! Client configuration
//!
//! Values are resolved in order: command line flags, environment variables
//! (handled by clap for flags that declare `env`), the optional YAML file at
//! `<config dir>/marketscope/config.yaml`, then built-in defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const API_URL_ENV: &str = "MARKETSCOPE_API_URL";
pub const TIMEOUT_ENV: &str = "MARKETSCOPE_TIMEOUT_SECS";
pub const OUTPUT_DIR_ENV: &str = "MARKETSCOPE_OUTPUT_DIR";
pub const CONFIG_FILE_ENV: &str = "MARKETSCOPE_CONFIG";

/// Connection settings for the research backend
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
  /// Base URL of the backend without a trailing slash (e.g. "http://localhost:8000")
  pub base_url: String,
  /// Request timeout in seconds
  pub timeout_secs: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self { base_url: DEFAULT_API_URL.to_string(), timeout_secs: DEFAULT_TIMEOUT_SECS }
  }
}

impl ClientConfig {
  /// Validate and normalize a base URL
  pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ClientError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|e| ClientError::invalid_url(trimmed, e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
      return Err(ClientError::invalid_url(trimmed, "expected an http or https URL"));
    }
    if parsed.host_str().is_none() {
      return Err(ClientError::invalid_url(trimmed, "missing host"));
    }

    Ok(Self { base_url: trimmed.to_string(), timeout_secs: timeout_secs.max(1) })
  }
}

/// Where downloaded reports go and whether to open them
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
  pub output_dir: PathBuf,
  pub open: bool,
}

impl Default for ViewerConfig {
  fn default() -> Self {
    Self { output_dir: default_output_dir(), open: true }
  }
}

/// Reports land in the user's download folder, or the cache dir when there is none
pub fn default_output_dir() -> PathBuf {
  dirs::download_dir()
    .or_else(dirs::cache_dir)
    .unwrap_or_else(std::env::temp_dir)
    .join("marketscope")
}

/// Optional on-disk configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
  pub api_url: Option<String>,
  pub timeout_secs: Option<u64>,
  pub output_dir: Option<PathBuf>,
  pub open_reports: Option<bool>,
}

impl FileConfig {
  /// `$MARKETSCOPE_CONFIG`, else `<config dir>/marketscope/config.yaml`
  pub fn default_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
      return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("marketscope").join("config.yaml"))
  }

  /// Load the file if it exists; a missing file is an empty configuration
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    if !path.exists() {
      return Ok(Self::default());
    }

    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
      return Ok(Self::default());
    }

    let config: FileConfig = serde_yaml::from_str(&content)
      .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
    Ok(config)
  }
}

/// Values given on the command line (or through their environment variables)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub api_url: Option<String>,
  pub timeout_secs: Option<u64>,
  pub output_dir: Option<PathBuf>,
  pub no_open: bool,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub client: ClientConfig,
  pub viewer: ViewerConfig,
}

impl Settings {
  pub fn resolve(overrides: Overrides, file: FileConfig) -> Result<Self, ClientError> {
    let base_url = overrides
      .api_url
      .or(file.api_url)
      .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let timeout_secs = overrides.timeout_secs.or(file.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS);

    let client = ClientConfig::new(&base_url, timeout_secs)?;
    let viewer = ViewerConfig {
      output_dir: overrides.output_dir.or(file.output_dir).unwrap_or_else(default_output_dir),
      open: !overrides.no_open && file.open_reports.unwrap_or(true),
    };

    Ok(Self { client, viewer })
  }
}
