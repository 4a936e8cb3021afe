//! Library module for ddlextract
//!
//! Argument parsing, report shapes and output helpers live here so that they
//! can be tested. The binary wiring is in main.rs.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ddlextract_core::events::format_elapsed;
use ddlextract_core::logging::LogFormat;
use ddlextract_core::{
    ConnectionTarget, DdlError, ExtractionEvent, ExtractionObserver, ExtractorConfig,
    ResolutionMode, ScriptProfile,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parsed command line.
#[derive(Parser)]
#[command(name = "ddlextract")]
#[command(about = "List SQL Server tables and extract their cleaned DDL")]
#[command(version)]
#[command(long_about = "
ddlextract - table DDL extraction for SQL Server

Lists the user tables of one database and scripts a selection of them as
portable CREATE TABLE statements with keys, foreign keys and constraints.
Storage placement, collations, session directives and constraint re-enable
statements are stripped from the output.

SECURITY FEATURES:
- Read-only catalog access
- Passwords are never logged; prefer DDLEXTRACT_PASSWORD or the prompt
- Logs go to stderr, the script to stdout or --output

EXAMPLES:
  ddlextract -c 'Server=db;Database=sales;User Id=reader;' list --schema dbo
  ddlextract -c mssql://reader@db/sales script dbo.Orders dbo.Customers
  ddlextract script --all --schema dbo --output sales.sql
")]
pub struct Cli {
    /// Logging flags
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Connection and credential flags
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Deadline flags
    #[command(flatten)]
    pub timeouts: TimeoutArgs,

    /// Selected subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Check that the server accepts the login and the database exists
    Test,
    /// List user tables as schema.name
    List(ListArgs),
    /// Script tables and print the cleaned DDL
    Script(ScriptArgs),
}

/// Logging flags shared by every subcommand.
#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Only log errors")]
    pub quiet: bool,

    /// Log record format
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

/// Where to connect and as whom.
#[derive(Args)]
pub struct ConnectionArgs {
    /// Connection string or mssql:// URL
    #[arg(
        short,
        long,
        global = true,
        env = "DDLEXTRACT_CONNECTION",
        hide_env_values = true,
        help = "Connection string (credentials are never logged)"
    )]
    pub connection: Option<String>,

    /// Login name, overriding the connection string
    #[arg(short, long, global = true, env = "DDLEXTRACT_USER")]
    pub user: Option<String>,

    /// Password, overriding the connection string
    #[arg(long, global = true, env = "DDLEXTRACT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Always prompt for the password
    #[arg(long, global = true)]
    pub prompt_password: bool,
}

/// Per-operation deadlines in seconds.
#[derive(Args)]
pub struct TimeoutArgs {
    /// Seconds allowed for each connection attempt
    #[arg(long, global = true, default_value_t = 15)]
    pub connect_timeout: u64,

    /// Seconds allowed for the table listing query
    #[arg(long, global = true, default_value_t = 30)]
    pub query_timeout: u64,

    /// Seconds allowed for scripting the whole selection
    #[arg(long, global = true, default_value_t = 120)]
    pub script_timeout: u64,
}

/// Arguments of `list`.
#[derive(Args)]
pub struct ListArgs {
    /// Only list tables of this schema
    #[arg(short, long, env = "DDLEXTRACT_SCHEMA")]
    pub schema: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Output file
    #[arg(short, long, help = "Write to this file instead of stdout")]
    pub output: Option<PathBuf>,
}

/// Arguments of `script`.
#[derive(Args)]
pub struct ScriptArgs {
    /// Tables to script, as schema.name
    #[arg(value_name = "TABLE")]
    pub tables: Vec<String>,

    /// Script every listed table (restricted by --schema)
    #[arg(long, conflicts_with = "tables")]
    pub all: bool,

    /// Schema filter used with --all
    #[arg(short, long, requires = "all")]
    pub schema: Option<String>,

    /// Fail when a requested table does not exist instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Scripting policy
    #[arg(long, value_enum, default_value_t = ProfileArg::Canonical)]
    pub profile: ProfileArg,

    /// Also script indexes that do not back a constraint
    #[arg(long)]
    pub include_indexes: bool,

    /// Also script DML triggers
    #[arg(long)]
    pub include_triggers: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Output file
    #[arg(short, long, help = "Write to this file instead of stdout")]
    pub output: Option<PathBuf>,
}

/// `--log-format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable lines
    Text,
    /// One JSON object per record
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// `--profile` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    /// Tables, keys and constraints, scripted in one batch
    Canonical,
    /// Also indexes and triggers, one table at a time
    Legacy,
}

impl From<ProfileArg> for ScriptProfile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Canonical => Self::Canonical,
            ProfileArg::Legacy => Self::Legacy,
        }
    }
}

/// `--format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// A JSON report with metadata
    Json,
}

impl Cli {
    /// Extractor configuration from the timeout flags and, for `script`,
    /// the option flags.
    pub fn extractor_config(&self) -> ExtractorConfig {
        let config = ExtractorConfig::new()
            .with_connect_timeout(Duration::from_secs(self.timeouts.connect_timeout))
            .with_query_timeout(Duration::from_secs(self.timeouts.query_timeout))
            .with_script_timeout(Duration::from_secs(self.timeouts.script_timeout));

        match &self.command {
            Command::Script(args) => config
                .with_profile(args.profile.into())
                .with_resolution_mode(if args.strict {
                    ResolutionMode::Strict
                } else {
                    ResolutionMode::Permissive
                })
                .with_indexes(args.include_indexes)
                .with_triggers(args.include_triggers),
            Command::Test | Command::List(_) => config,
        }
    }
}

/// Resolves the connection target from the flags and environment.
///
/// # Errors
/// `DdlError::Configuration` when no connection string is given, otherwise
/// whatever resolution reports.
pub fn resolve_target(args: &ConnectionArgs) -> ddlextract_core::Result<ConnectionTarget> {
    let connection = args
        .connection
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| {
            DdlError::configuration(
                "a connection string is required (--connection or DDLEXTRACT_CONNECTION)",
            )
        })?;
    ConnectionTarget::resolve_with(connection, args.user.clone(), args.password.clone())
}

/// Whether the password should be read interactively.
pub fn needs_password_prompt(
    args: &ConnectionArgs,
    target: &ConnectionTarget,
    interactive: bool,
) -> bool {
    if args.prompt_password {
        return true;
    }
    interactive
        && !target.credentials().username().is_empty()
        && !target.credentials().has_password()
}

/// JSON shape of `list --format json`.
#[derive(Debug, Serialize)]
pub struct TableListReport {
    /// When the listing finished
    pub generated_at: DateTime<Utc>,
    /// Redacted server URL
    pub server: String,
    /// Initial catalog
    pub database: String,
    /// Schema filter, when one was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// `schema.name` entries in listing order
    pub tables: Vec<String>,
}

/// JSON shape of `script --format json`.
#[derive(Debug, Serialize)]
pub struct ScriptReport {
    /// When scripting finished
    pub generated_at: DateTime<Utc>,
    /// Redacted server URL
    pub server: String,
    /// Initial catalog
    pub database: String,
    /// Requested tables
    pub tables: Vec<String>,
    /// Cleaned DDL
    pub script: String,
}

/// Formats a table listing for output.
///
/// # Errors
/// Fails only if JSON serialization fails.
pub fn render_table_list(
    target: &ConnectionTarget,
    schema: Option<&str>,
    tables: Vec<String>,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(tables.join("\n")),
        OutputFormat::Json => {
            let report = TableListReport {
                generated_at: Utc::now(),
                server: target.to_safe_string(),
                database: target.database().to_string(),
                schema: schema.map(str::to_string),
                tables,
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}

/// Formats a script for output.
///
/// # Errors
/// Fails only if JSON serialization fails.
pub fn render_script(
    target: &ConnectionTarget,
    tables: Vec<String>,
    script: String,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(script),
        OutputFormat::Json => {
            let report = ScriptReport {
                generated_at: Utc::now(),
                server: target.to_safe_string(),
                database: target.database().to_string(),
                tables,
                script,
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}

/// Writes `content` to `path`, or to stdout when no path is given.
///
/// Non-empty content is terminated with a newline.
///
/// # Errors
/// Returns `DdlError::Io` when the file cannot be written.
pub async fn write_output(path: Option<&Path>, content: &str) -> ddlextract_core::Result<()> {
    let mut text = content.to_string();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }

    match path {
        Some(path) => {
            tokio::fs::write(path, text)
                .await
                .map_err(|e| DdlError::Io {
                    context: format!("Failed to write to {}", path.display()),
                    source: e,
                })?;
            tracing::info!(path = %path.display(), "Output written");
        }
        None => print!("{}", text),
    }
    Ok(())
}

/// Process exit code for a failed run.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<DdlError>() {
        Some(DdlError::Configuration { .. }) => 2,
        Some(DdlError::Connection { .. }) => 3,
        Some(DdlError::Query { .. } | DdlError::Scripting { .. }) => 4,
        Some(DdlError::UnresolvedTables { .. }) => 5,
        Some(DdlError::Timeout { .. }) => 6,
        Some(DdlError::Busy) => 7,
        Some(DdlError::Io { .. }) => 8,
        Some(DdlError::Cancelled { .. }) => 130,
        None => 1,
    }
}

/// Logs how long each operation took, as `m:ss.mmm`.
#[derive(Debug, Default)]
pub struct ElapsedReporter;

impl ExtractionObserver for ElapsedReporter {
    fn on_event(&self, event: &ExtractionEvent) {
        match event {
            ExtractionEvent::Started { operation } => {
                tracing::debug!(%operation, "Started");
            }
            ExtractionEvent::Finished {
                operation,
                duration,
            } => {
                tracing::info!(%operation, elapsed = %format_elapsed(*duration), "Completed");
            }
            ExtractionEvent::Failed { operation, .. } => {
                tracing::debug!(%operation, "Failed");
            }
        }
    }
}
