//! mesh-dataset info command - display mesh statistics and fields.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mesh_dataset::{Mesh, MeshReport, ValidationOptions, validate_mesh_data};
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct MeshInfo {
    path: String,
    #[serde(flatten)]
    report: MeshReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundsInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Vec<String>>,
}

#[derive(Serialize)]
struct BoundsInfo {
    min: [f64; 3],
    max: [f64; 3],
}

pub fn run(input: &Path, detailed: bool, cli: &Cli) -> Result<()> {
    let mesh =
        Mesh::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;

    let report = mesh.validate();
    let bounds = report.bounds.map(|(min, max)| BoundsInfo {
        min: [min.x, min.y, min.z],
        max: [max.x, max.y, max.z],
    });

    let issues = if detailed {
        let result = validate_mesh_data(&mesh, &ValidationOptions::collect_all())?;
        Some(result.issues.iter().map(|i| i.to_string()).collect())
    } else {
        None
    };

    let info = MeshInfo {
        path: input.display().to_string(),
        report,
        bounds,
        issues,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&info, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                print_text(&info);
            }
        }
    }

    Ok(())
}

fn print_text(info: &MeshInfo) {
    let report = &info.report;
    println!("{}", "Mesh Information".bold().underline());
    println!("  {}: {}", "File".cyan(), info.path);
    println!("  {}: {}", "Vertices".cyan(), report.vertex_count);
    println!("  {}: {}", "Cells".cyan(), report.face_count);
    println!(
        "  {}: {} (largest has {} cells)",
        "Regions".cyan(),
        report.region_count,
        report.largest_region_cells
    );

    if let Some((dx, dy, dz)) = report.dimensions {
        println!(
            "  {}: {:.3} x {:.3} x {:.3}",
            "Dimensions".cyan(),
            dx,
            dy,
            dz
        );
    }
    if let Some(ref b) = info.bounds {
        println!(
            "  {}: ({:.3}, {:.3}, {:.3})",
            "Min bounds".cyan(),
            b.min[0],
            b.min[1],
            b.min[2]
        );
        println!(
            "  {}: ({:.3}, {:.3}, {:.3})",
            "Max bounds".cyan(),
            b.max[0],
            b.max[1],
            b.max[2]
        );
    }
    println!("  {}: {:.3}", "Surface area".cyan(), report.surface_area);

    if report.fields.is_empty() {
        println!("  {}: none", "Fields".cyan());
    } else {
        println!("  {}:", "Fields".cyan());
        for field in &report.fields {
            let range = field
                .range
                .map(|(lo, hi)| format!(" [{:.4}, {:.4}]", lo, hi))
                .unwrap_or_default();
            println!(
                "    {} ({:?}, {} components){}",
                field.name.bold(),
                field.support,
                field.components,
                range
            );
        }
    }

    if let Some(ref issues) = info.issues {
        if issues.is_empty() {
            println!("  {}: none", "Issues".green());
        } else {
            println!("  {}: {}", "Issues".yellow(), issues.len());
            for issue in issues {
                println!("    - {}", issue);
            }
        }
    }
}
