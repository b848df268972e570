//! mesh-dataset prepare command - clean and align object meshes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use mesh_dataset::{FolderOutcome, PrepareConfig, prepare_batch};

use super::{print_report, progress_for};
use crate::{Cli, OutputFormat, output};

pub struct PrepareArgs<'a> {
    pub inputs: &'a [PathBuf],
    pub out_dir: &'a Path,
    pub config: Option<&'a Path>,
    pub no_align: bool,
    pub no_largest: bool,
    pub no_clean: bool,
    pub extension: Option<&'a str>,
}

fn resolve_config(args: &PrepareArgs<'_>) -> Result<PrepareConfig> {
    let mut config = match args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            PrepareConfig::from_toml_str(&text)
                .with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => PrepareConfig::default(),
    };

    if args.no_align {
        config.align = None;
    }
    if args.no_largest {
        config.keep_largest_region = false;
    }
    if args.no_clean {
        config.clean_epsilon = None;
    }
    if let Some(ext) = args.extension {
        config.output_extension = ext.trim_start_matches('.').to_string();
    }

    config.validate()?;
    Ok(config)
}

pub fn run(args: &PrepareArgs<'_>, cli: &Cli) -> Result<()> {
    let config = resolve_config(args)?;

    output::info(
        &format!("Preparing {} meshes", args.inputs.len()),
        cli.format,
        cli.quiet,
    );
    if config.align.is_none() {
        output::warning("Alignment disabled", cli.format, cli.quiet);
    }

    let progress = progress_for(args.inputs.len(), cli);
    let report = prepare_batch(args.inputs, args.out_dir, &config, Some(&progress))?;

    match cli.format {
        OutputFormat::Json => output::print_value(&report.to_json(), cli.quiet),
        OutputFormat::Text => {
            print_report(&report, cli);
            let degenerate = report
                .results
                .iter()
                .filter(|(_, outcome)| match outcome {
                    FolderOutcome::Succeeded(summary) => summary.degenerate_alignment,
                    _ => false,
                })
                .count();
            if degenerate > 0 {
                output::warning(
                    &format!("{} meshes have no unique principal axes", degenerate),
                    cli.format,
                    cli.quiet,
                );
            }
            if !report.succeeded().is_empty() {
                output::success(
                    &format!("Meshes written to {}", args.out_dir.display()),
                    cli.format,
                    cli.quiet,
                );
            }
        }
    }

    if report.has_failures() {
        bail!(
            "{} of {} meshes failed",
            report.failed().len(),
            args.inputs.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args<'a>() -> PrepareArgs<'a> {
        PrepareArgs {
            inputs: &[],
            out_dir: Path::new("out"),
            config: None,
            no_align: false,
            no_largest: false,
            no_clean: false,
            extension: None,
        }
    }

    #[test]
    fn test_flags_disable_steps() {
        let config = resolve_config(&PrepareArgs {
            no_align: true,
            no_largest: true,
            no_clean: true,
            extension: Some(".ply"),
            ..args()
        })
        .unwrap();
        assert!(config.align.is_none());
        assert!(!config.keep_largest_region);
        assert!(config.clean_epsilon.is_none());
        assert_eq!(config.output_extension, "ply");
    }

    #[test]
    fn test_defaults_clean_and_align() {
        let config = resolve_config(&args()).unwrap();
        assert!(config.align.is_some());
        assert!(config.clean_epsilon.is_some());
    }

    #[test]
    fn test_unwritable_extension_is_rejected() {
        assert!(
            resolve_config(&PrepareArgs {
                extension: Some("vtk"),
                ..args()
            })
            .is_err()
        );
    }
}
