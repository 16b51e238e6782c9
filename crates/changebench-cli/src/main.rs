//! changebench CLI
//!
//! Benchmarks a change feed consumer with and without full documents embedded
//! in update events.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a workload feed: drop, 1000 inserts, 10000 updates
//! changebench produce --store bench.db --out feed.ndjson
//!
//! # Measure with a keyed lookup per batch
//! changebench consume --store bench.db --feed feed.ndjson \
//!     --full-document default --batch-size 100
//!
//! # Measure with the documents carried in the events
//! changebench consume --feed feed.ndjson --full-document updateLookup --batch-size 100
//!
//! # Live: pipe the producer straight into the consumer
//! changebench produce --store bench.db --update-interval-ms 1 \
//!     | changebench consume --store bench.db --full-document default --batch-size 100
//! ```
//!
//! ## Configuration
//!
//! Flags take precedence over `CHANGEBENCH_*` environment variables, which
//! take precedence over the `--config` TOML file.
//!
//! ## Exit Status
//!
//! - `0`: report printed
//! - `2`: no measured event before the seeding timeout
//! - `130`: interrupted before measurement started
//! - `1`: any other failure
//!
//! Logs go to stderr. Stdout carries only the feed (`produce`) or the report
//! (`consume`).

use anyhow::{Context, Result};
use changebench_client::{ClientError, EXIT_FAILURE, EXIT_SUCCESS};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

mod commands;
mod config;

use commands::consume::ConsumeArgs;
use commands::produce::ProduceArgs;
use config::FileConfig;

#[derive(Parser)]
#[command(name = "changebench")]
#[command(about = "Change feed consumer benchmark", long_about = None)]
struct Cli {
    /// TOML config file with [consume] and [produce] sections
    #[arg(long, global = true, env = "CHANGEBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, env = "CHANGEBENCH_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Serve Prometheus metrics at http://<addr>/metrics
    #[arg(long, global = true, env = "CHANGEBENCH_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume a change feed and print the benchmark report
    Consume(ConsumeArgs),
    /// Generate the workload and write its change feed
    Produce(ProduceArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    changebench_observability::init(&cli.log_level);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start tokio runtime: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    let result = runtime.block_on(run(cli));
    // A blocked stdin read must not hold the process open.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file = FileConfig::load(cli.config.as_deref())?;

    if let Some(addr) = cli.metrics_addr {
        let bound = changebench_observability::exporter::spawn_metrics_server(addr)
            .await
            .with_context(|| format!("Failed to bind metrics server on {}", addr))?;
        info!(addr = %bound, "Serving metrics");
    }

    match cli.command {
        Commands::Consume(args) => {
            let settings = args.resolve(&file.consume)?;
            commands::consume::run(settings).await
        }
        Commands::Produce(args) => {
            let settings = args.resolve(&file.produce)?;
            commands::produce::run(settings).await
        }
    }
}

fn exit_code(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<ClientError>()
        .map(ClientError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}
