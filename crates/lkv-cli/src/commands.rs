use std::path::PathBuf;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use lkv_core::{BootstrapOutcome, CoreResult, Dispatcher, ErrorBody, Path};
use lkv_ledger::{FileLedger, FileLedgerConfig, SyncMode};
use lkv_server::{open_ledger, LedgerBackend, LkvServer, ServerConfig};

use crate::cli::{CallArgs, Cli, Command, OutputFormat, ServeArgs};

const DEFAULT_LEDGER: &str = "lkv.ledger";

/// Run one command. `Ok(false)` means the operation itself failed and has
/// already been reported; `Err` is for failures before dispatch.
pub fn run_command(cli: Cli) -> anyhow::Result<bool> {
    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Init => cmd_init(&config, cli.format),
        Command::Query(args) => cmd_call(&config, Path::Query, args, cli.format),
        Command::Invoke(args) => cmd_call(&config, Path::Invoke, args, cli.format),
        Command::Serve(args) => cmd_serve(config, args),
        Command::Compact => cmd_compact(&config, cli.format),
    }
}

/// Config file first, then `--ledger` on top. With no config file the ledger
/// is `lkv.ledger` in the working directory.
fn resolve_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig {
            ledger: default_file_ledger(),
            ..ServerConfig::default()
        },
    };
    if let Some(path) = &cli.ledger {
        // Keep the sync mode a file backend in the config asked for.
        let sync = match config.ledger {
            LedgerBackend::File { sync, .. } => sync,
            LedgerBackend::Memory => SyncMode::EveryWrite,
        };
        config.ledger = LedgerBackend::File {
            path: path.clone(),
            sync,
        };
    }
    Ok(config)
}

fn default_file_ledger() -> LedgerBackend {
    LedgerBackend::File {
        path: PathBuf::from(DEFAULT_LEDGER),
        sync: SyncMode::EveryWrite,
    }
}

fn dispatcher(config: &ServerConfig) -> anyhow::Result<Dispatcher> {
    if config.ledger == LedgerBackend::Memory {
        tracing::warn!("memory ledger selected; state ends with this command");
    }
    let ledger = open_ledger(&config.ledger).context("cannot open ledger")?;
    Ok(Dispatcher::new(ledger, config.core.clone())?)
}

fn cmd_init(config: &ServerConfig, format: OutputFormat) -> anyhow::Result<bool> {
    let dispatcher = dispatcher(config)?;
    let result = dispatcher.init();
    if format == OutputFormat::Text {
        if let Ok(outcome) = &result {
            let user = config.core.seed.username.bold();
            match outcome {
                BootstrapOutcome::Created => println!("{} Created seed user {user}", "✓".green().bold()),
                BootstrapOutcome::AlreadySeeded => {
                    println!("{} Seed user {user} already present", "✓".green())
                }
            }
            return Ok(true);
        }
    }
    report(&result.map(|_| Vec::new()), format)
}

fn cmd_call(
    config: &ServerConfig,
    path: Path,
    args: CallArgs,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    let dispatcher = dispatcher(config)?;
    let result = dispatcher.dispatch(path, &args.function, &args.args);
    report(&result, format)
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<bool> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    println!("LedgerKV server on {}", config.bind_addr.to_string().bold());
    let server = LkvServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(true)
}

fn cmd_compact(config: &ServerConfig, format: OutputFormat) -> anyhow::Result<bool> {
    let LedgerBackend::File { path, sync } = &config.ledger else {
        anyhow::bail!("compaction needs a file ledger; the configured backend is in memory");
    };
    let ledger =
        FileLedger::open(path, FileLedgerConfig { sync: *sync }).context("cannot open ledger")?;
    let before = ledger.log_size()?;
    let records = ledger.compact()?;
    let after = ledger.log_size()?;
    tracing::info!(path = %path.display(), records, before, after, "ledger compacted");

    match format {
        OutputFormat::Text => println!(
            "{} Compacted {}: {records} records, {before} -> {after} bytes",
            "✓".green().bold(),
            path.display().to_string().bold()
        ),
        OutputFormat::Json => println!(
            "{}",
            json!({ "ok": true, "records": records, "before": before, "after": after })
        ),
    }
    Ok(true)
}

fn report(result: &CoreResult<Vec<u8>>, format: OutputFormat) -> anyhow::Result<bool> {
    let line = render(result, format);
    match result {
        Ok(_) => println!("{line}"),
        Err(_) => eprintln!("{line}"),
    }
    Ok(result.is_ok())
}

/// Format an operation result for the terminal.
pub fn render(result: &CoreResult<Vec<u8>>, format: OutputFormat) -> String {
    match (format, result) {
        (OutputFormat::Text, Ok(payload)) if payload.is_empty() => format!("{}", "✓".green()),
        (OutputFormat::Text, Ok(payload)) => {
            format!("{} {}", "✓".green(), String::from_utf8_lossy(payload))
        }
        (OutputFormat::Text, Err(e)) => {
            format!("{} {}: {e}", "✗".red().bold(), e.code().as_str().red())
        }
        (OutputFormat::Json, Ok(payload)) => json!({
            "ok": true,
            "payload": String::from_utf8_lossy(payload),
        })
        .to_string(),
        (OutputFormat::Json, Err(e)) => {
            let body = ErrorBody::from(e);
            json!({ "ok": false, "code": body.code, "message": body.message }).to_string()
        }
    }
}
