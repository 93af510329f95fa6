// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Test Artifacts
// Description: Per-test artifact directories and run summaries.
// Purpose: Keep suite reports, event logs, and verdict summaries per test.
// Dependencies: system-tests, api-verify-core, serde, serde_jcs
// ============================================================================

//! ## Overview
//! Every test binary picks one run id at first use; each test then writes to
//! `<artifact root>/run_<id>/<test name>`. [`TestReporter::record_suite`]
//! stores the suite's `report.json`, `report.md` and `events.json`, and the
//! final `summary.json` carries the suite verdict next to the test status.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use api_verify_core::BackendMode;
use api_verify_core::MemoryEventSink;
use api_verify_core::SuiteReport;
use api_verify_core::duration_millis;
use serde::Serialize;
use system_tests::config::SystemTestConfig;

/// Suite outcome copied into the test summary.
#[derive(Debug, Clone, Serialize)]
struct SuiteSummary {
    resource: String,
    backend: BackendMode,
    total: usize,
    passed: usize,
    failed: usize,
    failed_scenarios: Vec<String>,
}

impl SuiteSummary {
    fn from_report(report: &SuiteReport) -> Self {
        Self {
            resource: report.resource.clone(),
            backend: report.backend,
            total: report.total,
            passed: report.passed,
            failed: report.failed,
            failed_scenarios: report
                .scenarios
                .iter()
                .filter(|verdict| !verdict.passed())
                .map(|verdict| verdict.name.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TestSummary {
    test_name: String,
    status: String,
    duration_ms: u64,
    notes: Vec<String>,
    artifacts: Vec<String>,
    suites: Vec<SuiteSummary>,
}

/// Run id shared by every test in this binary.
fn run_id() -> &'static str {
    static RUN_ID: OnceLock<String> = OnceLock::new();
    RUN_ID.get_or_init(|| {
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        format!("{}_{}", duration_millis(since_epoch), std::process::id())
    })
}

/// Artifact writer and summary recorder for one system-test.
pub struct TestReporter {
    root: PathBuf,
    test_name: String,
    started: Instant,
    artifacts: Vec<String>,
    suites: Vec<SuiteSummary>,
    finalized: bool,
}

impl TestReporter {
    /// Creates the artifact directory for `test_name`.
    pub fn new(test_name: &str) -> io::Result<Self> {
        let config = SystemTestConfig::load().map_err(io::Error::other)?;
        let root = config.test_dir(run_id(), test_name);
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            test_name: test_name.to_string(),
            started: Instant::now(),
            artifacts: Vec::new(),
            suites: Vec::new(),
            finalized: false,
        })
    }

    /// Returns the test's artifact directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a text artifact and lists it in the summary.
    pub fn write_text(&mut self, name: &str, value: &str) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, value.as_bytes())?;
        self.note_artifact(name);
        Ok(path)
    }

    /// Stores a suite run: the rendered report pair, the captured events, and
    /// the verdict counts for the summary.
    pub fn record_suite(&mut self, report: &SuiteReport, sink: &MemoryEventSink) -> io::Result<()> {
        report.write_to_dir(&self.root).map_err(io::Error::other)?;
        self.note_artifact("report.json");
        self.note_artifact("report.md");
        let events = serde_jcs::to_vec(&sink.events()).map_err(io::Error::other)?;
        fs::write(self.root.join("events.json"), events)?;
        self.note_artifact("events.json");
        self.suites.push(SuiteSummary::from_report(report));
        Ok(())
    }

    /// Writes `summary.json` and `summary.md`.
    pub fn finish(&mut self, status: &str, notes: Vec<String>) -> io::Result<()> {
        self.note_artifact("summary.json");
        self.note_artifact("summary.md");
        let summary = TestSummary {
            test_name: self.test_name.clone(),
            status: status.to_string(),
            duration_ms: duration_millis(self.started.elapsed()),
            notes,
            artifacts: self.artifacts.clone(),
            suites: self.suites.clone(),
        };
        let json = serde_jcs::to_vec(&summary).map_err(io::Error::other)?;
        fs::write(self.root.join("summary.json"), json)?;
        fs::write(self.root.join("summary.md"), summary_markdown(&summary))?;
        self.finalized = true;
        Ok(())
    }

    fn note_artifact(&mut self, name: &str) {
        if !self.artifacts.iter().any(|existing| existing == name) {
            self.artifacts.push(name.to_string());
        }
    }
}

impl Drop for TestReporter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        let status = if std::thread::panicking() { "panic" } else { "error" };
        let _ = self.finish(status, vec!["test ended before reporting a status".to_string()]);
    }
}

fn summary_markdown(summary: &TestSummary) -> String {
    let mut out = format!("# {}\n\n", summary.test_name);
    let _ = writeln!(out, "Status: **{}** ({} ms)", summary.status, summary.duration_ms);
    for suite in &summary.suites {
        let _ = write!(
            out,
            "\nSuite on `{}` ({} backend): {}/{} passed",
            suite.resource, suite.backend, suite.passed, suite.total
        );
        if !suite.failed_scenarios.is_empty() {
            let _ = write!(out, "; failed: {}", suite.failed_scenarios.join(", "));
        }
        out.push('\n');
    }
    if !summary.notes.is_empty() {
        out.push_str("\nNotes:\n");
        for note in &summary.notes {
            let _ = writeln!(out, "- {note}");
        }
    }
    let _ = writeln!(out, "\nArtifacts: {}", summary.artifacts.join(", "));
    out
}
