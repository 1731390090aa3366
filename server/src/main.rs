// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # XRPL Custody Server
//!
//! Entry point for the `xrpl-custody` binary. Parses CLI arguments, loads
//! configuration, initializes logging and metrics, and serves the HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — serve the API and metrics endpoints
//! - `init`    — create a data directory with a default config file
//! - `status`  — query a running server's health endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use xrpl_custody::config::{CustodyConfig, Network};
use xrpl_custody::CustodyService;

use cli::{Commands, CustodyCli};
use logging::LogFormat;
use metrics::CustodyMetrics;

const CONFIG_FILE_NAME: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CustodyCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Init(args) => init_data_dir(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Explicit `--config`, else `config.toml` in the data directory if present,
/// else defaults. CLI flags override whatever was loaded.
fn load_config(args: &cli::RunArgs) -> Result<CustodyConfig> {
    let candidate = match &args.config {
        Some(path) => Some(path.clone()),
        None => {
            let data_dir = args
                .data_dir
                .clone()
                .unwrap_or_else(|| CustodyConfig::default().data_dir);
            let path = data_dir.join(CONFIG_FILE_NAME);
            path.exists().then_some(path)
        }
    };

    let mut config = match candidate {
        Some(path) => CustodyConfig::from_toml_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => CustodyConfig::default(),
    };

    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(network) = &args.network {
        config.network = network.parse::<Network>()?;
    }
    if let Some(rpc_url) = &args.rpc_url {
        config.rpc_url = Some(rpc_url.clone());
    }
    if let Some(port) = args.api_port {
        config.api_port = port;
    }
    if let Some(port) = args.metrics_port {
        config.metrics_port = port;
    }
    if let Some(format) = &args.log_format {
        config.log_format = format.clone();
    }
    Ok(config)
}

/// Serves the API and metrics endpoints until SIGINT or SIGTERM.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    logging::init_logging(&config.log_level, LogFormat::from_str_lossy(&config.log_format));

    tracing::info!(
        network = %config.network,
        rpc_url = config.rpc_endpoint(),
        faucet = config.faucet_endpoint().unwrap_or("disabled"),
        api_port = config.api_port,
        metrics_port = config.metrics_port,
        data_dir = %config.data_dir.display(),
        "starting xrpl-custody"
    );

    // --- Secret store, ledger client, faucet ---
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("failed to create data directory: {}", config.data_dir.display())
    })?;
    let service = CustodyService::from_config(&config).with_context(|| {
        format!(
            "failed to open secret store at {}",
            config.store_path().display()
        )
    })?;
    tracing::info!(path = %config.store_path().display(), "secret store opened");

    // --- Metrics ---
    let custody_metrics =
        Arc::new(CustodyMetrics::new().context("failed to register prometheus metrics")?);

    // --- Application state ---
    let app_state = api::AppState {
        service: Arc::new(service),
        metrics: Arc::clone(&custody_metrics),
        network: config.network.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", config.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {api_addr}"))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&custody_metrics));
    let metrics_addr = format!("0.0.0.0:{}", config.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {metrics_addr}"))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("xrpl-custody stopped");
    Ok(())
}

/// Creates the data directory and writes a default config file for the
/// chosen network.
fn init_data_dir(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("info", LogFormat::Pretty);

    let network: Network = args.network.parse()?;
    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), %network, "initializing data directory");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let config_path = data_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            config_path.display()
        );
    }

    let config = default_config_for(network, data_dir);
    write_config(&config, &config_path)?;

    println!("Data directory initialized.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Network        : {}", network);
    println!("  Ledger RPC     : {}", config.rpc_endpoint());
    println!(
        "  Faucet funding : {}",
        config.faucet_endpoint().unwrap_or("disabled")
    );
    println!("  Config file    : {}", config_path.display());

    Ok(())
}

fn default_config_for(network: Network, data_dir: &Path) -> CustodyConfig {
    let mut config = CustodyConfig {
        network,
        data_dir: data_dir.to_path_buf(),
        ..CustodyConfig::default()
    };
    if network == Network::Mainnet {
        config.funding.enabled = false;
    }
    config
}

fn write_config(config: &CustodyConfig, path: &Path) -> Result<()> {
    let rendered = config.to_toml_string().context("failed to render config")?;
    std::fs::write(path, rendered)
        .with_context(|| format!("failed to write config to {}", path.display()))?;
    tracing::info!(path = %path.display(), "config written");
    Ok(())
}

/// Queries a running server's health endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/health", args.url.trim_end_matches('/'));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("failed to reach {url}"))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .context("failed to read status response")?;

    println!("{}", body);
    if !status.is_success() {
        anyhow::bail!("server answered {status}");
    }
    Ok(())
}

fn print_version() {
    println!("xrpl-custody {}", env!("CARGO_PKG_VERSION"));
    println!("rustc        {}", rustc_version());
}

fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that branch never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
