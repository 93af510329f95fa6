// crates/api-verify-config/src/config.rs
// ============================================================================
// Module: API Verify Configuration
// Description: Configuration loading and validation for api-verify.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: api-verify-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! A missing file at the default location yields defaults; an explicitly named
//! file that cannot be read is an error. Overrides from the environment and
//! the command line are applied on top and the result is validated again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use api_verify_core::BackendMode;
use api_verify_core::ReportFormat;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::env::ConfigEnv;
use crate::env::read_env_strict;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "api-verify.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "API_VERIFY_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default target base URL.
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
/// Default collection path.
pub const DEFAULT_RESOURCE_PATH: &str = "/posts";
/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Minimum request timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum request timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 300_000;

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Top-level api-verify configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiVerifyConfig {
    /// Remote target settings.
    #[serde(default)]
    pub target: TargetConfig,
    /// Backend durability settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Report rendering settings.
    #[serde(default)]
    pub report: ReportConfig,
    /// Run event logging settings.
    #[serde(default)]
    pub events: EventsConfig,
}

impl ApiVerifyConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: `path`, then `API_VERIFY_CONFIG`, then
    /// `api-verify.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound && !explicit => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(err) => return Err(ConfigError::Io(format!("{}: {err}", resolved.display()))),
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;
        self.report.validate()?;
        self.events.validate()?;
        Ok(())
    }

    /// Applies overrides and revalidates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the overridden configuration is invalid.
    pub fn apply(&mut self, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(base_url) = &overrides.base_url {
            self.target.base_url.clone_from(base_url);
        }
        if let Some(timeout) = overrides.timeout {
            self.target.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        }
        if let Some(mode) = overrides.backend {
            self.backend.mode = mode;
        }
        if let Some(format) = overrides.format {
            self.report.format = format;
        }
        if let Some(output_dir) = &overrides.output_dir {
            self.report.output_dir = Some(output_dir.clone());
        }
        self.validate()
    }
}

/// Remote target configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Base URL of the remote API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Collection path under the base URL.
    #[serde(default = "default_resource_path")]
    pub resource_path: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            resource_path: default_resource_path(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl TargetConfig {
    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates target settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(self.base_url.trim())
            .map_err(|err| ConfigError::Invalid(format!("target.base_url is invalid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("target.base_url must use http or https".to_string()));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::Invalid("target.base_url must include a host".to_string()));
        }
        if !self.resource_path.starts_with('/') {
            return Err(ConfigError::Invalid("target.resource_path must start with /".to_string()));
        }
        if self.resource_path.contains(['?', '#']) {
            return Err(ConfigError::Invalid(
                "target.resource_path must not contain a query or fragment".to_string(),
            ));
        }
        if !(MIN_TIMEOUT_MS ..= MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "target.timeout_ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Backend durability configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Whether the target persists writes.
    #[serde(default)]
    pub mode: BackendMode,
}

/// Report rendering configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Format printed to stdout.
    #[serde(default)]
    pub format: ReportFormat,
    /// Optional directory receiving `report.json` and `report.md`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl ReportConfig {
    /// Validates report settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.output_dir {
            validate_path_string("report.output_dir", &dir.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Destination for run events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSinkKind {
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Events are discarded.
    #[default]
    None,
}

/// Run event logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: EventSinkKind,
    /// Log file path, required for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl EventsConfig {
    /// Validates event settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.sink, &self.path) {
            (EventSinkKind::File, None) => {
                Err(ConfigError::Invalid("events.path is required when events.sink = \"file\"".to_string()))
            }
            (_, Some(path)) => validate_path_string("events.path", &path.to_string_lossy()),
            _ => Ok(()),
        }
    }
}

/// Values layered over the file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Base URL override.
    pub base_url: Option<String>,
    /// Timeout override.
    pub timeout: Option<Duration>,
    /// Backend mode override.
    pub backend: Option<BackendMode>,
    /// Report format override.
    pub format: Option<ReportFormat>,
    /// Report output directory override.
    pub output_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Returns overrides where values from `higher` win.
    #[must_use]
    pub fn merge(self, higher: Self) -> Self {
        Self {
            base_url: higher.base_url.or(self.base_url),
            timeout: higher.timeout.or(self.timeout),
            backend: higher.backend.or(self.backend),
            format: higher.format.or(self.format),
            output_dir: higher.output_dir.or(self.output_dir),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default base URL.
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Default resource path.
fn default_resource_path() -> String {
    DEFAULT_RESOURCE_PATH.to_string()
}

/// Default timeout in milliseconds.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Resolves the config path from CLI or environment defaults. The flag is
/// true when the path was named explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = read_env_strict(ConfigEnv::ConfigPath.as_str())? {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
