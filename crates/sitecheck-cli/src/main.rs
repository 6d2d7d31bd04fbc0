// crates/sitecheck-cli/src/main.rs
// ============================================================================
// Module: sitecheck CLI Entry Point
// Description: Command dispatcher for manifest queries and validation runs.
// Purpose: Expose the resolution engine to operators and scripts.
// Dependencies: clap, serde, serde_json, sitecheck-config, sitecheck-manifest, thiserror
// ============================================================================

//! ## Overview
//! The sitecheck CLI loads `sitecheck.toml`, builds the resolution engine
//! over the configured installer tree and answers queries: single lookups,
//! mapping table dumps and expectation checks. Diagnostics go to the sink
//! named by the `[logging]` section; command output goes to stdout.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde::Serialize;
use sitecheck_config::LogOutput;
use sitecheck_config::LoggingConfig;
use sitecheck_config::SiteCheckConfig;
use sitecheck_manifest::DiagnosticSink;
use sitecheck_manifest::ExpectationSet;
use sitecheck_manifest::JsonLinesDiagnostics;
use sitecheck_manifest::MappingTable;
use sitecheck_manifest::NoopDiagnostics;
use sitecheck_manifest::ResolutionEngine;
use sitecheck_manifest::ValidationReport;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "sitecheck", disable_help_subcommand = true, disable_version_flag = true)]
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
    /// Resolve one (role, profile, key) query.
    Find(FindCommand),
    /// Mapping table utilities.
    Mapping {
        /// Selected mapping subcommand.
        #[command(subcommand)]
        command: MappingCommand,
    },
    /// Compare expected values against the manifests.
    Check(CheckCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config file selection shared by every command.
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Optional config file path (defaults to sitecheck.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Output rendering.
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// JSON document.
    Json,
}

/// Arguments for the `find` command.
#[derive(Args, Debug)]
struct FindCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Host role, network name or `global`.
    #[arg(long)]
    role: String,
    /// Profile the key belongs to.
    #[arg(long)]
    profile: String,
    /// Semantic key.
    #[arg(long)]
    key: String,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Mapping subcommands.
#[derive(Subcommand, Debug)]
enum MappingCommand {
    /// List every mapping entry in key order.
    List(MappingListCommand),
}

/// Arguments for `mapping list`.
#[derive(Args, Debug)]
struct MappingListCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for the `check` command.
#[derive(Args, Debug)]
struct CheckCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Expectation file (`{"expectations": [...]}`).
    #[arg(long, value_name = "PATH")]
    expectations: PathBuf,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Exit with failure when any value mismatches.
    #[arg(long, action = ArgAction::SetTrue)]
    fail_on_mismatch: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration and load the engine it describes.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
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
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("sitecheck {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Find(command) => command_find(&command),
        Commands::Mapping {
            command,
        } => match command {
            MappingCommand::List(command) => command_mapping_list(&command),
        },
        Commands::Check(command) => command_check(&command),
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
    }
}

/// Writes the top-level help text.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_bytes(help.as_bytes()).map_err(|err| CliError::new(output_error("stdout", &err)))
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `find` command.
fn command_find(command: &FindCommand) -> CliResult<ExitCode> {
    let (_, engine) = load_engine(&command.config)?;
    let values = engine.find_val(&command.role, &command.profile, &command.key);
    write_output(&render_values(&values, command.format)?)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `mapping list` command.
fn command_mapping_list(command: &MappingListCommand) -> CliResult<ExitCode> {
    let (_, engine) = load_engine(&command.config)?;
    write_output(&render_mapping(engine.mapping(), command.format)?)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `check` command.
fn command_check(command: &CheckCommand) -> CliResult<ExitCode> {
    let (_, engine) = load_engine(&command.config)?;
    let expectations = ExpectationSet::load(&command.expectations)
        .map_err(|err| CliError::new(err.to_string()))?;
    let report = engine.check(&expectations);
    write_output(&render_report(&report, command.format)?)?;
    if command.fail_on_mismatch && report.has_mismatches() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let (config, engine) = load_engine(&command.config)?;
    write_stdout_line(&format!(
        "config ok: {} documents, {} mapping entries under {}",
        engine.documents().len(),
        engine.mapping().len(),
        config.installer.root.display()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Engine Setup
// ============================================================================

/// Loads the configuration and builds the engine it describes.
fn load_engine(args: &ConfigArgs) -> CliResult<(SiteCheckConfig, ResolutionEngine)> {
    let config = SiteCheckConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let diagnostics = build_diagnostics(&config.logging)?;
    let engine = ResolutionEngine::load(
        &config.installer_layout(),
        &config.mapping.dir,
        &config.engine_options(),
        diagnostics,
    )
    .map_err(|err| CliError::new(format!("failed to load manifests: {err}")))?;
    Ok((config, engine))
}

/// Builds the diagnostic sink named by the logging configuration.
fn build_diagnostics(logging: &LoggingConfig) -> CliResult<Arc<dyn DiagnosticSink>> {
    match &logging.output {
        LogOutput::Stderr => {
            Ok(Arc::new(JsonLinesDiagnostics::with_min_level(std::io::stderr(), logging.level)))
        }
        LogOutput::Disabled => Ok(Arc::new(NoopDiagnostics)),
        LogOutput::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path).map_err(|err| {
                CliError::new(format!("failed to open log file {}: {err}", path.display()))
            })?;
            Ok(Arc::new(JsonLinesDiagnostics::with_min_level(file, logging.level)))
        }
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders resolved values, one per line or as a JSON array.
fn render_values(values: &[String], format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Text => Ok(values.iter().map(|value| format!("{value}\n")).collect()),
        OutputFormat::Json => to_json_line(values),
    }
}

/// Renders the mapping table in key order.
fn render_mapping(mapping: &MappingTable, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Text => Ok(mapping
            .iter()
            .map(|(key, entry)| {
                if entry.is_unmapped() {
                    format!("{key} -> (unmapped)\n")
                } else {
                    format!("{key} -> {}:{}\n", entry.manifest_context, entry.manifest_key)
                }
            })
            .collect()),
        OutputFormat::Json => {
            let entries: serde_json::Map<String, serde_json::Value> = mapping
                .iter()
                .map(|(key, entry)| {
                    let value = serde_json::to_value(entry).map_err(|err| {
                        CliError::new(format!("failed to serialize mapping entry {key}: {err}"))
                    })?;
                    Ok((key.to_string(), value))
                })
                .collect::<CliResult<_>>()?;
            to_json_line(&entries)
        }
    }
}

/// Renders a validation report.
fn render_report(report: &ValidationReport, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Text => Ok(report.render_text()),
        OutputFormat::Json => to_json_line(report),
    }
}

/// Serializes a value as one line of JSON.
fn to_json_line<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    let mut text = serde_json::to_string(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    text.push('\n');
    Ok(text)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes rendered command output to stdout.
fn write_output(text: &str) -> CliResult<()> {
    write_stdout_bytes(text.as_bytes()).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output failure message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
