// crates/api-verify-config/src/env.rs
// ============================================================================
// Module: Environment Overrides
// Description: Environment-backed overrides for api-verify configuration.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: api-verify-core
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Set-but-empty values and invalid UTF-8 fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use api_verify_core::BackendMode;

use crate::config::CONFIG_ENV_VAR;
use crate::config::ConfigError;
use crate::config::ConfigOverrides;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys read by api-verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEnv {
    /// Config file path.
    ConfigPath,
    /// Target base URL override.
    BaseUrl,
    /// Request timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Backend mode override (`persisting` or `simulated`).
    Backend,
}

impl ConfigEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigPath => CONFIG_ENV_VAR,
            Self::BaseUrl => "API_VERIFY_BASE_URL",
            Self::TimeoutSeconds => "API_VERIFY_TIMEOUT_SEC",
            Self::Backend => "API_VERIFY_BACKEND",
        }
    }
}

impl ConfigOverrides {
    /// Loads overrides from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is not valid UTF-8, is
    /// empty, or fails parsing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = read_env_nonempty(ConfigEnv::BaseUrl.as_str())?;
        let timeout = read_env_nonempty(ConfigEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(ConfigEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let backend = read_env_nonempty(ConfigEnv::Backend.as_str())?
            .map(|value| {
                value.parse::<BackendMode>().map_err(|err| {
                    ConfigError::Invalid(format!("{}: {err}", ConfigEnv::Backend.as_str()))
                })
            })
            .transpose()?;
        Ok(Self {
            base_url,
            timeout,
            backend,
            ..Self::default()
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
    })
}

/// Reads an environment variable and rejects empty values.
fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Invalid(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

/// Parses a positive timeout value from an environment variable string.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        ConfigError::Invalid(format!("{name} must be a positive integer number of seconds"))
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}
