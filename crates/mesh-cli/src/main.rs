//! mesh-dataset: build graph datasets from wind-tunnel simulation folders.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=mesh_dataset=info` - Stage summaries and finished folders
//! - `RUST_LOG=mesh_dataset=debug` - Per-folder mesh state
//! - `RUST_LOG=mesh_dataset::timing=info` - Performance timing
//! - `RUST_LOG=debug` - All debug output
//!
//! # Example
//!
//! ```bash
//! # Build arrays for every folder under ./simulations
//! mesh-dataset process simulations -o dataset
//!
//! # Clean and align object meshes before simulating
//! RUST_LOG=mesh_dataset=info mesh-dataset prepare raw/*.stl -o objects
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{info, prepare, process};

/// mesh-dataset - turn simulation outputs into graph dataset records.
///
/// Samples the solver's surface pressure onto each object mesh and writes
/// nodes, edges and pressures per simulation folder.
#[derive(Parser)]
#[command(name = "mesh-dataset")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one dataset record per simulation folder
    Process {
        /// Directory holding one subdirectory per simulation
        data_dir: PathBuf,

        /// Output directory for records
        #[arg(short, long)]
        output: PathBuf,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// File listing the folder ids to process, one per line
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Maximum distance from an object vertex to the field mesh
        #[arg(long)]
        tolerance: Option<f64>,

        /// Name of the field to sample
        #[arg(long)]
        field: Option<String>,

        /// Value for vertices with no field data within tolerance
        #[arg(long)]
        fallback: Option<f64>,

        /// Write one JSON document per folder instead of .npy arrays
        #[arg(long)]
        json: bool,

        /// Keep only the largest connected region of each object mesh
        #[arg(long)]
        largest: bool,

        /// Worker threads (default: all cores)
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Clean and align object meshes
    Prepare {
        /// Input mesh files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip principal-axis alignment
        #[arg(long)]
        no_align: bool,

        /// Keep every connected region
        #[arg(long)]
        no_largest: bool,

        /// Skip welding coincident vertices
        #[arg(long)]
        no_clean: bool,

        /// Extension of the written meshes (obj, stl, ply)
        #[arg(long)]
        extension: Option<String>,
    },

    /// Display mesh statistics and fields
    Info {
        /// Input mesh file
        input: PathBuf,

        /// Also check indices, coordinates and field lengths
        #[arg(long)]
        detailed: bool,
    },
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "mesh_dataset=info",
            2 => "mesh_dataset=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Process {
            data_dir,
            output,
            config,
            manifest,
            tolerance,
            field,
            fallback,
            json,
            largest,
            threads,
        } => process::run(
            &process::ProcessArgs {
                data_dir,
                out_dir: output,
                config: config.as_deref(),
                manifest: manifest.as_deref(),
                tolerance: *tolerance,
                field: field.as_deref(),
                fallback: *fallback,
                json: *json,
                largest: *largest,
                threads: *threads,
            },
            &cli,
        ),
        Commands::Prepare {
            inputs,
            output,
            config,
            no_align,
            no_largest,
            no_clean,
            extension,
        } => prepare::run(
            &prepare::PrepareArgs {
                inputs,
                out_dir: output,
                config: config.as_deref(),
                no_align: *no_align,
                no_largest: *no_largest,
                no_clean: *no_clean,
                extension: extension.as_deref(),
            },
            &cli,
        ),
        Commands::Info { input, detailed } => info::run(input, *detailed, &cli),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            if let Some(mesh_err) = e.downcast_ref::<mesh_dataset::MeshError>() {
                eprintln!("{}: {}", "Error".red().bold(), mesh_err);
                eprintln!("  {}: {}", "Code".cyan(), mesh_err.code());
                eprintln!(
                    "  {}: {}",
                    "Suggestion".green(),
                    mesh_err.recovery_suggestion()
                );
                if let Some(location) = mesh_err.location() {
                    eprintln!("  {}: {}", "Location".yellow(), location);
                }
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
