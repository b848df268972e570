//! Subcommand implementations.

pub mod info;
pub mod prepare;
pub mod process;

use colored::Colorize;
use mesh_dataset::{BatchProgress, BatchReport, FolderOutcome};

use crate::{Cli, OutputFormat};

/// Progress tracker that prints one line per finished item in text mode.
pub fn progress_for(total: usize, cli: &Cli) -> BatchProgress {
    if cli.quiet || matches!(cli.format, OutputFormat::Json) {
        return BatchProgress::new(total);
    }
    BatchProgress::with_callback(total, |p| {
        eprintln!("  [{}/{}] {}", p.current, p.total, p.message.dimmed());
        true
    })
}

/// Print per-item outcomes that need attention, then the totals.
pub fn print_report<T>(report: &BatchReport<T>, cli: &Cli) {
    if cli.quiet {
        return;
    }
    for (id, outcome) in &report.results {
        match outcome {
            FolderOutcome::Skipped(reason) => {
                println!("  {} {}: {}", "skipped".yellow(), id, reason);
            }
            FolderOutcome::Failed(error) => {
                println!(
                    "  {} {}: [{}] {}",
                    "failed".red(),
                    id,
                    error.code(),
                    error
                );
            }
            FolderOutcome::Cancelled => {
                println!("  {} {}", "cancelled".dimmed(), id);
            }
            FolderOutcome::Succeeded(_) => {}
        }
    }
    println!("  {}: {}", "Result".cyan(), report);
}
