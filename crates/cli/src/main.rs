//! Stock allocation CLI - run the allocation engine against scenario files.
//!
//! # Usage
//!
//! ```bash
//! # Allocate the quantity in a scenario
//! stock-alloc allocate fixtures/amoxicillin.yaml
//!
//! # Allocate 3 packs of 10, as JSON, including the save payload
//! stock-alloc --format json allocate fixtures/amoxicillin.yaml -q 3 --pack-size 10 --save
//!
//! # Allocate doses of a vaccine
//! stock-alloc allocate fixtures/vaccine.yaml -q 40 --doses
//!
//! # List pack sizes offered for the item
//! stock-alloc pack-sizes fixtures/amoxicillin.yaml
//!
//! # Show row classification for a scanned batch
//! stock-alloc rows fixtures/amoxicillin.yaml --scanned-batch B1
//! ```
//!
//! # Commands
//!
//! - `allocate` - Allocate a quantity and report lines, alerts and save payload
//! - `pack-sizes` - List pack-size options
//! - `rows` - Show row classification
//!
//! Allocation settings come from `STOCK_ALLOC_*` environment variables (see
//! [`config`]). Logs go to stderr and honour `RUST_LOG`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stock_allocation_core::PackSizeChoice;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod config;
mod error;
mod output;
mod scenario;

use commands::Selection;
use config::AllocationConfig;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "stock-alloc")]
#[command(author, version, about = "Stock allocation for outbound shipments and prescriptions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate a quantity across the scenario's batches
    Allocate {
        /// Scenario file (YAML)
        scenario: PathBuf,

        /// Requested quantity, in units, packs or doses
        #[arg(short, long)]
        quantity: Option<String>,

        /// Pack size (`any` or a number)
        #[arg(short, long)]
        pack_size: Option<PackSizeChoice>,

        /// Enter the quantity in doses
        #[arg(long)]
        doses: bool,

        /// Restrict allocation to a scanned batch
        #[arg(long)]
        scanned_batch: Option<String>,

        /// Include the save payload
        #[arg(long)]
        save: bool,
    },
    /// List the pack sizes offered for the item
    PackSizes {
        /// Scenario file (YAML)
        scenario: PathBuf,
    },
    /// Show how each batch is classified
    Rows {
        /// Scenario file (YAML)
        scenario: PathBuf,

        /// Pack size (`any` or a number)
        #[arg(short, long)]
        pack_size: Option<PackSizeChoice>,

        /// Scanned batch
        #[arg(long)]
        scanned_batch: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stock_alloc=info,stock_allocation_core=warn".into());

    let json_layer = cli.json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!cli.json_logs)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli);

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = AllocationConfig::from_env()?;
    tracing::debug!(?config, "loaded allocation config");

    match cli.command {
        Commands::Allocate {
            scenario,
            quantity,
            pack_size,
            doses,
            scanned_batch,
            save,
        } => {
            let selection = Selection {
                pack_size,
                allocate_in_doses: doses,
                scanned_batch,
            };
            commands::allocate::run(
                &scenario,
                &config,
                selection,
                quantity.as_deref(),
                save,
                cli.format,
            )?;
        }
        Commands::PackSizes { scenario } => {
            commands::pack_sizes::run(&scenario, &config, cli.format)?;
        }
        Commands::Rows {
            scenario,
            pack_size,
            scanned_batch,
        } => {
            let selection = Selection {
                pack_size,
                scanned_batch,
                ..Selection::default()
            };
            commands::rows::run(&scenario, &config, selection, cli.format)?;
        }
    }
    Ok(())
}
