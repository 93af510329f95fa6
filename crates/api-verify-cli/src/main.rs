// crates/api-verify-cli/src/main.rs
// ============================================================================
// Module: API Verify CLI Entry Point
// Description: Command dispatcher for suite runs, schema checks, and config.
// Purpose: Run the posts verification suite from the command line.
// Dependencies: api-verify-config, api-verify-core, clap, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The `api-verify` CLI runs the built-in posts suite against a configured
//! target, checks local JSON payloads against the post schema, and validates
//! configuration files. Reports go to stdout; run events and errors go to
//! stderr. The exit code is non-zero when any scenario fails.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use api_verify_config::ApiVerifyConfig;
use api_verify_config::ConfigOverrides;
use api_verify_config::EventSinkKind;
use api_verify_config::EventsConfig;
use api_verify_core::BackendMode;
use api_verify_core::FileEventSink;
use api_verify_core::HttpTransport;
use api_verify_core::JsonSchemaValidator;
use api_verify_core::NoopEventSink;
use api_verify_core::PostsClient;
use api_verify_core::ReportFormat;
use api_verify_core::RunEventSink;
use api_verify_core::Schema;
use api_verify_core::StderrEventSink;
use api_verify_core::SuiteRunner;
use api_verify_core::posts_suite;
use api_verify_core::validate_schema;
use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a payload checked by `schema check`.
const MAX_PAYLOAD_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "api-verify", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the posts verification suite against the configured target.
    Run(RunCommand),
    /// Post schema utilities.
    Schema {
        /// Selected schema subcommand.
        #[command(subcommand)]
        command: SchemaCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Config file path (defaults to `API_VERIFY_CONFIG` or `api-verify.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Base URL of the target API.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
    /// Whether the target persists writes.
    #[arg(long, value_enum, value_name = "MODE")]
    backend: Option<BackendArg>,
    /// Report format printed to stdout.
    #[arg(long, value_enum, value_name = "FORMAT")]
    format: Option<FormatArg>,
    /// Directory receiving `report.json` and `report.md`.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

/// Schema subcommands.
#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// Check a JSON object, or an array of objects, against the post schema.
    Check(SchemaCheckCommand),
    /// Print the post schema as a JSON-Schema document.
    Show,
}

/// Arguments for `schema check`.
#[derive(Args, Debug)]
struct SchemaCheckCommand {
    /// JSON file to check.
    #[arg(long, value_name = "FILE")]
    input: PathBuf,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an api-verify configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path (defaults to `API_VERIFY_CONFIG` or `api-verify.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Backend mode argument.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BackendArg {
    /// Writes are durable.
    Persisting,
    /// Writes are acknowledged but discarded.
    Simulated,
}

impl From<BackendArg> for BackendMode {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Persisting => Self::Persisting,
            BackendArg::Simulated => Self::Simulated,
        }
    }
}

/// Report format argument.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    /// Canonical JSON.
    Json,
    /// Markdown summary.
    Markdown,
}

impl From<FormatArg> for ReportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => Self::Json,
            FormatArg::Markdown => Self::Markdown,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("api-verify {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Run(command) => command_run(&command).await,
        Commands::Schema {
            command,
        } => command_schema(command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
async fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let config = resolve_run_config(command)?;
    let transport = HttpTransport::new(&config.target.base_url, config.target.timeout())
        .map_err(|err| CliError::new(format!("failed to build transport: {err}")))?;
    let client = PostsClient::new(transport, &config.target.resource_path);
    let runner =
        SuiteRunner::new(client, config.backend.mode).with_sink(event_sink(&config.events)?);
    let report = runner
        .run(&posts_suite())
        .await
        .map_err(|err| CliError::new(format!("invalid suite: {err}")))?;

    let rendered = config
        .report
        .format
        .render(&report)
        .map_err(|err| CliError::new(format!("failed to render report: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    if let Some(dir) = &config.report.output_dir {
        report
            .write_to_dir(dir)
            .map_err(|err| CliError::new(format!("failed to write report: {err}")))?;
    }

    if report.all_passed() {
        return Ok(ExitCode::SUCCESS);
    }
    write_stderr_line(&format!(
        "{} of {} scenarios failed against {}",
        report.failed, report.total, config.target.base_url
    ))
    .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    Ok(ExitCode::FAILURE)
}

/// Loads config and layers environment then CLI overrides on top.
fn resolve_run_config(command: &RunCommand) -> CliResult<ApiVerifyConfig> {
    let mut config = ApiVerifyConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let env = ConfigOverrides::from_env()
        .map_err(|err| CliError::new(format!("failed to read environment: {err}")))?;
    config
        .apply(&env.merge(cli_overrides(command)))
        .map_err(|err| CliError::new(format!("failed to apply overrides: {err}")))?;
    Ok(config)
}

/// Collects overrides given on the command line.
fn cli_overrides(command: &RunCommand) -> ConfigOverrides {
    ConfigOverrides {
        base_url: command.base_url.clone(),
        timeout: None,
        backend: command.backend.map(BackendMode::from),
        format: command.format.map(ReportFormat::from),
        output_dir: command.output_dir.clone(),
    }
}

/// Builds the configured event sink.
fn event_sink(config: &EventsConfig) -> CliResult<Arc<dyn RunEventSink>> {
    match (config.sink, &config.path) {
        (EventSinkKind::Stderr, _) => Ok(Arc::new(StderrEventSink)),
        (EventSinkKind::None, _) => Ok(Arc::new(NoopEventSink)),
        (EventSinkKind::File, Some(path)) => FileEventSink::new(path)
            .map(|sink| Arc::new(sink) as Arc<dyn RunEventSink>)
            .map_err(|err| {
                CliError::new(format!("failed to open event log {}: {err}", path.display()))
            }),
        (EventSinkKind::File, None) => {
            Err(CliError::new("events.path is required for the file sink".to_string()))
        }
    }
}

// ============================================================================
// SECTION: Schema Commands
// ============================================================================

/// Dispatches schema subcommands.
fn command_schema(command: SchemaCommand) -> CliResult<ExitCode> {
    match command {
        SchemaCommand::Check(command) => command_schema_check(&command),
        SchemaCommand::Show => command_schema_show(),
    }
}

/// Executes `schema check`.
fn command_schema_check(command: &SchemaCheckCommand) -> CliResult<ExitCode> {
    let bytes = read_bytes_with_limit(&command.input, MAX_PAYLOAD_BYTES).map_err(|err| {
        CliError::new(format!("failed to read {}: {err}", command.input.display()))
    })?;
    let payload: Value = serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(format!("{} is not valid JSON: {err}", command.input.display()))
    })?;
    let lines = check_payload(&payload);
    if lines.is_empty() {
        write_stdout_line("ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }
    for line in &lines {
        write_stdout_line(line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::FAILURE)
}

/// Executes `schema show`.
fn command_schema_show() -> CliResult<ExitCode> {
    let document = Schema::post().to_document();
    JsonSchemaValidator::compile(&document)
        .map_err(|err| CliError::new(format!("post schema does not compile: {err}")))?;
    let bytes = serde_jcs::to_vec(&document)
        .map_err(|err| CliError::new(format!("failed to serialize schema: {err}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|err| CliError::new(format!("failed to serialize schema: {err}")))?;
    write_stdout_line(&text).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Returns one line per violation; array elements are prefixed with their
/// index.
fn check_payload(payload: &Value) -> Vec<String> {
    let schema = Schema::post();
    match payload {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .flat_map(|(index, item)| {
                validate_schema(item, &schema)
                    .violations()
                    .iter()
                    .map(|violation| format!("[{index}] {violation}"))
                    .collect::<Vec<_>>()
            })
            .collect(),
        other => validate_schema(other, &schema)
            .violations()
            .iter()
            .map(ToString::to_string)
            .collect(),
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = ApiVerifyConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: File Helpers
// ============================================================================

/// Errors from bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// File I/O failure.
    #[error("{0}")]
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
