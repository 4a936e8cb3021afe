//! ddlextract command line entry point.

use anyhow::{Context, Result};
use clap::Parser;
use ddlextract::{
    Cli, Command, ElapsedReporter, ListArgs, ScriptArgs, exit_code, needs_password_prompt,
    render_script, render_table_list, resolve_target, write_output,
};
use ddlextract_core::logging::init_logging;
use ddlextract_core::{ConnectionTarget, DdlError, DdlExtractor, ExtractorConfig};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(
        cli.global.verbose,
        cli.global.quiet,
        cli.global.log_format.into(),
    ) {
        eprintln!("Error: {}", e);
        return ExitCode::from(1);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let target = connection_target(&cli)?;
    let config = cli.extractor_config();
    let extractor = build_extractor(target, config)?.with_observer(Arc::new(ElapsedReporter));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    match &cli.command {
        Command::Test => test_connection(&extractor, &cancel).await,
        Command::List(args) => list_tables(&extractor, args, &cancel).await,
        Command::Script(args) => script_tables(&extractor, args, &cancel).await,
    }
}

fn connection_target(cli: &Cli) -> Result<ConnectionTarget> {
    let target = resolve_target(&cli.connection)?;
    if !needs_password_prompt(&cli.connection, &target, std::io::stdin().is_terminal()) {
        return Ok(target);
    }

    let prompt = format!("Password for {}: ", target.credentials().username());
    let password = rpassword::prompt_password(prompt).map_err(|e| DdlError::Io {
        context: "Failed to read password".to_string(),
        source: e,
    })?;

    let connection = cli.connection.connection.as_deref().unwrap_or_default();
    Ok(ConnectionTarget::resolve_with(
        connection,
        cli.connection.user.clone(),
        Some(password),
    )?)
}

#[cfg(feature = "mssql")]
fn build_extractor(target: ConnectionTarget, config: ExtractorConfig) -> Result<DdlExtractor> {
    Ok(DdlExtractor::sql_server(target, config)?)
}

#[cfg(not(feature = "mssql"))]
fn build_extractor(_target: ConnectionTarget, _config: ExtractorConfig) -> Result<DdlExtractor> {
    Err(DdlError::configuration("ddlextract was built without SQL Server support").into())
}

async fn test_connection(extractor: &DdlExtractor, cancel: &CancellationToken) -> Result<()> {
    info!(server = %extractor.target().to_safe_string(), "Testing connection");
    extractor.test_connection(cancel).await?;
    println!("Connection to {} successful", extractor.target().to_safe_string());
    Ok(())
}

async fn list_tables(
    extractor: &DdlExtractor,
    args: &ListArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let tables = extractor.list_tables(args.schema.as_deref(), cancel).await?;
    info!(count = tables.len(), "Listed tables");

    let output = render_table_list(extractor.target(), args.schema.as_deref(), tables, args.format)?;
    write_output(args.output.as_deref(), &output).await?;
    Ok(())
}

async fn script_tables(
    extractor: &DdlExtractor,
    args: &ScriptArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let tables = if args.all {
        extractor
            .list_tables(args.schema.as_deref(), cancel)
            .await
            .context("Failed to list tables for --all")?
    } else {
        args.tables.clone()
    };

    if tables.is_empty() {
        if args.all {
            warn!("No tables matched, nothing to script");
        } else {
            return Err(DdlError::configuration("no tables given; pass TABLE names or --all").into());
        }
    }

    let script = extractor.extract(&tables, cancel).await?;
    if script.is_empty() && !tables.is_empty() {
        warn!(requested = tables.len(), "None of the requested tables were found");
    }

    let output = render_script(extractor.target(), tables, script, args.format)?;
    write_output(args.output.as_deref(), &output).await?;
    Ok(())
}
