// crates/api-verify-core/src/report.rs
// ============================================================================
// Module: Suite Reports
// Description: Per-scenario verdicts and suite summaries.
// Purpose: Render pass/fail results with expected-vs-actual diagnostics.
// Dependencies: serde, serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! A [`SuiteReport`] aggregates one [`ScenarioVerdict`] per executed scenario.
//! Reports render as canonical JSON (JCS) for machines and Markdown for people,
//! and can be written to an output directory as `report.json` and `report.md`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::assertions::Mismatch;
use crate::scenario::BackendMode;
use crate::transport::Method;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Scenario verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every step passed.
    Pass,
    /// At least one check failed.
    Fail,
}

impl Verdict {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// All checks held.
    Passed,
    /// A response arrived but at least one check failed.
    Failed,
    /// No usable response: transport failure or unresolved dependency.
    Aborted,
    /// Not attempted because an earlier step of the scenario failed.
    Skipped,
}

impl StepStatus {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::Skipped => "skipped",
        }
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// Step label.
    pub label: String,
    /// HTTP method.
    pub method: Method,
    /// Resolved path, absent when resolution failed or the step was skipped.
    pub path: Option<String>,
    /// Expected status code.
    pub expected_status: u16,
    /// Observed status code.
    pub status: Option<u16>,
    /// Backend mode used to pick the expectation, for durability checks.
    pub applied_backend: Option<BackendMode>,
    /// Step result.
    pub result: StepStatus,
    /// Elapsed time in milliseconds.
    pub duration_ms: u64,
}

/// A failed check attributed to a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionFailure {
    /// Step label.
    pub step: String,
    /// Check label (`status`, `transport`, `dependency`, or a predicate).
    pub check: String,
    /// Rendered expected value.
    pub expected: String,
    /// Rendered actual value.
    pub actual: String,
}

impl AssertionFailure {
    /// Attributes a mismatch to a step.
    #[must_use]
    pub fn from_mismatch(step: &str, mismatch: Mismatch) -> Self {
        Self {
            step: step.to_string(),
            check: mismatch.check,
            expected: mismatch.expected,
            actual: mismatch.actual,
        }
    }
}

/// Verdict for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioVerdict {
    /// Scenario name.
    pub name: String,
    /// Scenario description.
    pub description: String,
    /// Final verdict.
    pub verdict: Verdict,
    /// Step outcomes in declaration order.
    pub steps: Vec<StepOutcome>,
    /// Recorded failures.
    pub failures: Vec<AssertionFailure>,
    /// Elapsed time in milliseconds.
    pub duration_ms: u64,
}

impl ScenarioVerdict {
    /// Returns true when the scenario passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Summary of a suite run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    /// Collection path the suite targeted.
    pub resource: String,
    /// Backend mode applied to durability checks.
    pub backend: BackendMode,
    /// Scenario count.
    pub total: usize,
    /// Passing scenarios.
    pub passed: usize,
    /// Failing scenarios.
    pub failed: usize,
    /// Elapsed time in milliseconds.
    pub duration_ms: u64,
    /// Per-scenario verdicts in execution order.
    pub scenarios: Vec<ScenarioVerdict>,
}

impl SuiteReport {
    /// Builds a report from verdicts.
    #[must_use]
    pub fn new(
        resource: &str,
        backend: BackendMode,
        scenarios: Vec<ScenarioVerdict>,
        duration_ms: u64,
    ) -> Self {
        let passed = scenarios.iter().filter(|verdict| verdict.passed()).count();
        Self {
            resource: resource.to_string(),
            backend,
            total: scenarios.len(),
            passed,
            failed: scenarios.len() - passed,
            duration_ms,
            scenarios,
        }
    }

    /// Returns true when every scenario passed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Returns the verdict for a named scenario.
    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&ScenarioVerdict> {
        self.scenarios.iter().find(|verdict| verdict.name == name)
    }

    /// Serializes the report as canonical JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialize`] when serialization fails.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, ReportError> {
        serde_jcs::to_vec(self).map_err(|err| ReportError::Serialize(err.to_string()))
    }

    /// Renders a Markdown summary.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# API Verification Report\n\n");
        out.push_str("## Summary\n\n");
        let _ = writeln!(out, "- Resource: {}", self.resource);
        let _ = writeln!(out, "- Backend: {}", self.backend);
        let _ = writeln!(out, "- Scenarios: {}", self.total);
        let _ = writeln!(out, "- Passed: {}", self.passed);
        let _ = writeln!(out, "- Failed: {}", self.failed);
        let _ = writeln!(out, "- Duration (ms): {}", self.duration_ms);
        out.push_str("\n## Scenarios\n\n");
        for scenario in &self.scenarios {
            let _ = writeln!(
                out,
                "- [{}] {}: {}",
                scenario.verdict.as_str(),
                scenario.name,
                scenario.description
            );
            for step in &scenario.steps {
                let mut line = format!(
                    "  - {} {} {}",
                    step.label,
                    step.method,
                    step.path.as_deref().unwrap_or("-")
                );
                let _ = write!(
                    line,
                    " -> {} (expected {})",
                    step.status.map_or_else(|| "-".to_string(), |status| status.to_string()),
                    step.expected_status
                );
                if let Some(backend) = step.applied_backend {
                    let _ = write!(line, " [{backend} backend]");
                }
                let _ = writeln!(out, "{line} {}", step.result.as_str());
            }
            for failure in &scenario.failures {
                let _ = writeln!(
                    out,
                    "  - FAILED {} / {}: expected {}, actual {}",
                    failure.step, failure.check, failure.expected, failure.actual
                );
            }
        }
        out
    }

    /// Writes `report.json` and `report.md` into `dir`, creating it.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the directory or files cannot be written.
    pub fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(dir).map_err(|err| ReportError::Io(err.to_string()))?;
        let json_path = dir.join("report.json");
        fs::write(&json_path, self.to_canonical_json()?)
            .map_err(|err| ReportError::Io(err.to_string()))?;
        let markdown_path = dir.join("report.md");
        fs::write(&markdown_path, self.to_markdown().as_bytes())
            .map_err(|err| ReportError::Io(err.to_string()))?;
        Ok(vec![json_path, markdown_path])
    }
}

/// Output formats for rendered reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Canonical JSON.
    Json,
    /// Markdown summary.
    #[default]
    Markdown,
}

impl ReportFormat {
    /// Renders `report` in this format.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialize`] when JSON serialization fails.
    pub fn render(self, report: &SuiteReport) -> Result<String, ReportError> {
        match self {
            Self::Json => {
                let bytes = report.to_canonical_json()?;
                String::from_utf8(bytes).map_err(|err| ReportError::Serialize(err.to_string()))
            }
            Self::Markdown => Ok(report.to_markdown()),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "json" => Ok(Self::Json),
            "markdown" => Ok(Self::Markdown),
            other => Err(format!("unknown report format `{other}` (expected json or markdown)")),
        }
    }
}

/// Report rendering errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization failed.
    #[error("report serialization error: {0}")]
    Serialize(String),
    /// Writing the report failed.
    #[error("report io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
#[must_use]
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
