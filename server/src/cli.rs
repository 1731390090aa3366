//! # CLI Interface
//!
//! Command-line arguments for `xrpl-custody`, via `clap` derive. Four
//! subcommands: `run`, `init`, `status` and `version`. Every flag on `run`
//! is an override; anything left unset comes from the config file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Custodial signer for the XRP Ledger.
///
/// Holds account keys, enforces per-account transfer policy, and signs
/// and submits payments, trust lines and account settings on request.
#[derive(Parser, Debug)]
#[command(
    name = "xrpl-custody",
    about = "Custodial signing service for the XRP Ledger",
    version,
    propagate_version = true
)]
pub struct CustodyCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API and metrics servers.
    Run(RunArgs),
    /// Create a data directory with a default config file.
    Init(InitArgs),
    /// Ask a running server whether it is healthy.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the configuration file (TOML).
    ///
    /// When omitted, `config.toml` in the data directory is used if it
    /// exists, and built-in defaults otherwise.
    #[arg(long, short = 'c', env = "XRPL_CUSTODY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding the secret store.
    #[arg(long, short = 'd', env = "XRPL_CUSTODY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Network: mainnet, testnet or devnet.
    #[arg(long, env = "XRPL_CUSTODY_NETWORK")]
    pub network: Option<String>,

    /// Ledger JSON-RPC endpoint, overriding the network default.
    #[arg(long, env = "XRPL_CUSTODY_RPC_URL")]
    pub rpc_url: Option<String>,

    #[arg(long, env = "XRPL_CUSTODY_API_PORT")]
    pub api_port: Option<u16>,

    #[arg(long, env = "XRPL_CUSTODY_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Log output format: pretty or json.
    #[arg(long, env = "XRPL_CUSTODY_LOG_FORMAT")]
    pub log_format: Option<String>,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Data directory to create.
    #[arg(long, short = 'd', env = "XRPL_CUSTODY_DATA_DIR", default_value = "./custody-data")]
    pub data_dir: PathBuf,

    /// Network to configure: mainnet, testnet or devnet.
    #[arg(long, default_value = "testnet")]
    pub network: String,

    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Base URL of the running server.
    #[arg(long, default_value = "http://127.0.0.1:8420")]
    pub url: String,
}
