// system-tests/tests/helpers/cli.rs
// ============================================================================
// Module: CLI Helpers
// Description: Shared helpers for locating and invoking the api-verify CLI.
// Purpose: Provide consistent CLI binary resolution across system-test suites.
// Dependencies: std::process, std::path
// ============================================================================

//! Helpers for invoking the api-verify CLI in system-tests.

use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::sync::OnceLock;

/// Environment variables the CLI reads; cleared so host settings cannot leak in.
const CLI_ENV_VARS: [&str; 4] =
    ["API_VERIFY_CONFIG", "API_VERIFY_BASE_URL", "API_VERIFY_TIMEOUT_SEC", "API_VERIFY_BACKEND"];

/// Locates the api-verify CLI binary, building it if necessary.
pub fn cli_binary() -> Option<PathBuf> {
    if let Some(path) = option_env!("CARGO_BIN_EXE_api_verify") {
        let candidate = PathBuf::from(path);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_api_verify") {
        let candidate = PathBuf::from(path);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    build_cli_binary().map_or_else(|_| resolve_cli_from_current_exe(), Some)
}

/// Runs the CLI with arguments in `cwd` and returns the process output.
pub fn run_cli(binary: &Path, cwd: &Path, args: &[&str]) -> Result<Output, String> {
    run_cli_with_env(binary, cwd, args, &[])
}

/// Runs the CLI with arguments and extra environment variables.
pub fn run_cli_with_env(
    binary: &Path,
    cwd: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Result<Output, String> {
    let mut command = Command::new(binary);
    command.current_dir(cwd).args(args);
    for name in CLI_ENV_VARS {
        command.env_remove(name);
    }
    for (name, value) in envs {
        command.env(name, value);
    }
    command.output().map_err(|err| format!("run api-verify failed: {err}"))
}

fn resolve_cli_from_current_exe() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let profile_dir = exe.parent()?.parent()?;
    let candidate = profile_dir.join(format!("api-verify{}", exe_suffix()));
    if candidate.exists() { Some(candidate) } else { None }
}

fn target_dir_from_current_exe() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let profile_dir = exe.parent()?.parent()?;
    profile_dir.parent().map(PathBuf::from)
}

fn build_cli_binary() -> Result<PathBuf, String> {
    static BUILD_RESULT: OnceLock<Result<PathBuf, String>> = OnceLock::new();
    let result = BUILD_RESULT.get_or_init(|| {
        let Some(target_dir) = target_dir_from_current_exe() else {
            return Err("unable to resolve target dir from current exe".to_string());
        };
        let output = Command::new("cargo")
            .args(["build", "-p", "api-verify-cli", "--bin", "api-verify", "--target-dir"])
            .arg(&target_dir)
            .output()
            .map_err(|err| format!("spawn cargo build failed: {err}"))?;
        if !output.status.success() {
            return Err(format!(
                "cargo build api-verify-cli failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        resolve_cli_from_target_dir(&target_dir)
            .ok_or_else(|| "api-verify binary not found after build".to_string())
    });
    result.clone()
}

fn resolve_cli_from_target_dir(target_dir: &Path) -> Option<PathBuf> {
    let candidate = target_dir.join("debug").join(format!("api-verify{}", exe_suffix()));
    if candidate.exists() { Some(candidate) } else { None }
}

const fn exe_suffix() -> &'static str {
    if cfg!(windows) { ".exe" } else { "" }
}
