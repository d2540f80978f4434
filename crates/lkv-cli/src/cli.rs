use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lkv", about = "LedgerKV: key-value store and user accounts over a ledger", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Ledger file. Overrides the backend named in --config.
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    /// TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Seed the initial user account
    Init,
    /// Run a read-only operation
    Query(CallArgs),
    /// Run a state-changing operation
    Invoke(CallArgs),
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Rewrite the ledger file to hold only live values
    Compact,
}

#[derive(Args)]
pub struct CallArgs {
    /// Operation name, e.g. `read` or `createUser`
    pub function: String,
    /// Positional arguments. Put `--` first to pass values starting with `-`.
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}
