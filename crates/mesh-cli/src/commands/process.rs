//! mesh-dataset process command - build records from simulation folders.

use std::path::Path;

use anyhow::{Context, Result, bail};
use mesh_dataset::{
    DatasetConfig, Manifest, OutputFormat as RecordFormat, discover_folders, process_batch,
};

use super::{print_report, progress_for};
use crate::{Cli, OutputFormat, output};

pub struct ProcessArgs<'a> {
    pub data_dir: &'a Path,
    pub out_dir: &'a Path,
    pub config: Option<&'a Path>,
    pub manifest: Option<&'a Path>,
    pub tolerance: Option<f64>,
    pub field: Option<&'a str>,
    pub fallback: Option<f64>,
    pub json: bool,
    pub largest: bool,
    pub threads: Option<usize>,
}

/// Configuration file first, then command-line overrides.
fn resolve_config(args: &ProcessArgs<'_>) -> Result<DatasetConfig> {
    let mut config = match args.config {
        Some(path) => DatasetConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => DatasetConfig::default(),
    };

    if let Some(tolerance) = args.tolerance {
        config.sampling.tolerance = tolerance;
    }
    if let Some(field) = args.field {
        config.sampling.field_name = field.to_string();
    }
    if let Some(fallback) = args.fallback {
        config.sampling.fallback_value = fallback;
    }
    if args.json {
        config.output.format = RecordFormat::Json;
    }
    if args.largest {
        config.keep_largest_region = true;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }

    config.validate()?;
    Ok(config)
}

pub fn run(args: &ProcessArgs<'_>, cli: &Cli) -> Result<()> {
    let config = resolve_config(args)?;

    let folders = match args.manifest {
        Some(path) => {
            let manifest = Manifest::from_file(path)
                .with_context(|| format!("Failed to read manifest {:?}", path))?;
            manifest.resolve(args.data_dir)
        }
        None => discover_folders(args.data_dir)
            .with_context(|| format!("Failed to list folders in {:?}", args.data_dir))?,
    };

    output::info(
        &format!(
            "Processing {} folders from {}",
            folders.len(),
            args.data_dir.display()
        ),
        cli.format,
        cli.quiet,
    );

    let progress = progress_for(folders.len(), cli);
    let report = process_batch(&folders, &config, args.out_dir, Some(&progress))?;

    match cli.format {
        OutputFormat::Json => output::print_value(&report.to_json(), cli.quiet),
        OutputFormat::Text => {
            print_report(&report, cli);
            if !report.succeeded().is_empty() {
                output::success(
                    &format!("Records written to {}", args.out_dir.display()),
                    cli.format,
                    cli.quiet,
                );
            }
        }
    }

    if report.has_failures() {
        bail!("{} of {} folders failed", report.failed().len(), folders.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args<'a>() -> ProcessArgs<'a> {
        ProcessArgs {
            data_dir: Path::new("data"),
            out_dir: Path::new("out"),
            config: None,
            manifest: None,
            tolerance: None,
            field: None,
            fallback: None,
            json: false,
            largest: false,
            threads: None,
        }
    }

    #[test]
    fn test_defaults_without_overrides() {
        assert_eq!(resolve_config(&args()).unwrap(), DatasetConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.toml");
        std::fs::write(&path, "[sampling]\ntolerance = 0.5\nfield_name = \"Cp\"\n").unwrap();

        let config = resolve_config(&ProcessArgs {
            config: Some(path.as_path()),
            tolerance: Some(2.0),
            json: true,
            threads: Some(2),
            ..args()
        })
        .unwrap();

        assert_eq!(config.sampling.tolerance, 2.0);
        assert_eq!(config.sampling.field_name, "Cp");
        assert_eq!(config.output.format, RecordFormat::Json);
        assert_eq!(config.threads, Some(2));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let result = resolve_config(&ProcessArgs {
            tolerance: Some(-1.0),
            ..args()
        });
        assert!(result.is_err());
    }
}
