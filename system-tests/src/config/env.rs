// system-tests/src/config/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment knobs for the posts system-test harness.
// Purpose: Resolve the artifact root, the timeout floor, and the live target.
// Dependencies: api-verify-core
// ============================================================================

//! ## Overview
//! Every knob is optional. A value that is set must be valid UTF-8, non-empty,
//! and parse for its knob; otherwise loading fails instead of falling back to
//! the default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use api_verify_core::BackendMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Artifact root used when no override is set.
pub const DEFAULT_ARTIFACT_ROOT: &str = "target/system-tests";

/// Public posts service targeted by the live suite by default.
pub const DEFAULT_LIVE_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// Harness environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Directory under which each run writes its artifacts.
    ArtifactRoot,
    /// Minimum request timeout in seconds, applied to every suite run.
    TimeoutFloorSeconds,
    /// Base URL of the live posts service.
    LiveBaseUrl,
    /// Whether the live service persists writes (`persisting` or `simulated`).
    LiveBackend,
}

impl SystemTestEnv {
    /// Every harness variable, in documentation order.
    pub const ALL: [Self; 4] =
        [Self::ArtifactRoot, Self::TimeoutFloorSeconds, Self::LiveBaseUrl, Self::LiveBackend];

    /// Returns the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArtifactRoot => "API_VERIFY_SYSTEM_TEST_ARTIFACT_ROOT",
            Self::TimeoutFloorSeconds => "API_VERIFY_SYSTEM_TEST_TIMEOUT_FLOOR_SEC",
            Self::LiveBaseUrl => "API_VERIFY_LIVE_BASE_URL",
            Self::LiveBackend => "API_VERIFY_LIVE_BACKEND",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// The posts service exercised by the live suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTarget {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Durability mode the suite assumes for the target.
    pub backend: BackendMode,
}

impl Default for LiveTarget {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LIVE_BASE_URL.to_string(),
            backend: BackendMode::Simulated,
        }
    }
}

/// Harness configuration resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTestConfig {
    /// Directory under which each run writes its artifacts.
    pub artifact_root: PathBuf,
    /// Minimum request timeout, when set.
    pub timeout_floor: Option<Duration>,
    /// Live suite target.
    pub live: LiveTarget,
}

impl Default for SystemTestConfig {
    fn default() -> Self {
        Self {
            artifact_root: PathBuf::from(DEFAULT_ARTIFACT_ROOT),
            timeout_floor: None,
            live: LiveTarget::default(),
        }
    }
}

impl SystemTestConfig {
    /// Loads the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable when a set value is not UTF-8, is
    /// empty, or does not parse.
    pub fn load() -> Result<Self, String> {
        let defaults = Self::default();
        let artifact_root =
            read_knob(SystemTestEnv::ArtifactRoot, |raw| Ok(PathBuf::from(raw)))?
                .unwrap_or(defaults.artifact_root);
        let timeout_floor = read_knob(SystemTestEnv::TimeoutFloorSeconds, parse_seconds)?;
        let base_url = read_knob(SystemTestEnv::LiveBaseUrl, parse_base_url)?
            .unwrap_or(defaults.live.base_url);
        let backend = read_knob(SystemTestEnv::LiveBackend, str::parse::<BackendMode>)?
            .unwrap_or(defaults.live.backend);
        Ok(Self {
            artifact_root,
            timeout_floor,
            live: LiveTarget {
                base_url,
                backend,
            },
        })
    }

    /// Stretches `requested` up to the configured floor.
    #[must_use]
    pub fn timeout(&self, requested: Duration) -> Duration {
        self.timeout_floor.map_or(requested, |floor| requested.max(floor))
    }

    /// Returns the artifact directory of `test_name` within run `run_id`.
    #[must_use]
    pub fn test_dir(&self, run_id: &str, test_name: &str) -> PathBuf {
        self.artifact_root.join(format!("run_{run_id}")).join(test_name)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads one knob, trimming it and applying `parse` when set.
fn read_knob<T, F>(knob: SystemTestEnv, parse: F) -> Result<Option<T>, String>
where
    F: FnOnce(&str) -> Result<T, String>,
{
    let name = knob.as_str();
    let Some(raw) = std::env::var_os(name) else {
        return Ok(None);
    };
    let raw = raw.into_string().map_err(|_| format!("{name} must be valid UTF-8"))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{name} must not be empty"));
    }
    parse(trimmed).map(Some).map_err(|err| format!("{name}: {err}"))
}

/// Parses a positive number of seconds.
fn parse_seconds(raw: &str) -> Result<Duration, String> {
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err(format!("expected a positive number of seconds, got `{raw}`")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}

/// Accepts http(s) URLs and drops any trailing slash.
fn parse_base_url(raw: &str) -> Result<String, String> {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Ok(raw.trim_end_matches('/').to_string())
    } else {
        Err(format!("expected an http(s) url, got `{raw}`"))
    }
}
