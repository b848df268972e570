//! Fluent API for the mesh preparation path.
//!
//! The preparation path turns a raw object mesh into the canonical input of
//! a simulation: weld coincident vertices, keep the largest connected
//! region, rotate it onto its principal axes with the fixed corrective
//! rotations, and save it. Every stage works in memory.
//!
//! # Example
//!
//! ```no_run
//! use mesh_dataset::Pipeline;
//! use mesh_dataset::align::AlignParams;
//!
//! let result = Pipeline::load("raw/car.stl")
//!     .unwrap()
//!     .keep_largest_region()
//!     .unwrap()
//!     .align(&AlignParams::wind_tunnel())
//!     .unwrap()
//!     .save("prepared/car.obj")
//!     .unwrap();
//!
//! println!("Prepared mesh with {} cells", result.mesh.face_count());
//! ```

use std::path::Path;

use tracing::info;

use crate::Mesh;
use crate::align::{AlignParams, PrincipalAxes, align_to_principal_axes};
use crate::clean::clean_mesh;
use crate::components::{label_regions, largest_connected_region};
use crate::config::PrepareConfig;
use crate::error::MeshResult;
use crate::io::{load_mesh, save_mesh};
use crate::validate::{log_report, validate_mesh};

/// Result of a pipeline execution.
#[derive(Debug)]
pub struct PipelineResult {
    /// The processed mesh.
    pub mesh: Mesh,
    /// Principal axes found by the alignment stage, if it ran.
    pub axes: Option<PrincipalAxes>,
    /// Number of pipeline stages executed.
    pub stages_executed: usize,
    /// Log of operations performed.
    pub operation_log: Vec<String>,
}

/// A mesh preparation pipeline.
///
/// Each stage consumes the pipeline and returns it, so stages chain.
pub struct Pipeline {
    mesh: Mesh,
    axes: Option<PrincipalAxes>,
    stages_executed: usize,
    operation_log: Vec<String>,
}

impl Pipeline {
    /// Start a pipeline with an existing mesh.
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            axes: None,
            stages_executed: 0,
            operation_log: Vec::new(),
        }
    }

    /// Start a pipeline by loading a mesh from a file.
    pub fn load(path: impl AsRef<Path>) -> MeshResult<Self> {
        let path = path.as_ref();
        let mesh = load_mesh(path)?;
        log_report(&validate_mesh(&mesh));
        let mut pipeline = Self::new(mesh);
        pipeline.log(format!("Loaded mesh from {}", path.display()));
        Ok(pipeline)
    }

    /// Keep only the connected region with the most cells.
    pub fn keep_largest_region(mut self) -> MeshResult<Self> {
        let regions = label_regions(&self.mesh).region_count();
        let before = self.mesh.face_count();
        self.mesh = largest_connected_region(&self.mesh)?;
        self.log(format!(
            "Kept largest of {} regions: {} of {} cells",
            regions,
            self.mesh.face_count(),
            before
        ));
        self.stages_executed += 1;
        Ok(self)
    }

    /// Merge coincident vertices and drop degenerate cells.
    pub fn clean(mut self, merge_epsilon: f64) -> Self {
        let report = clean_mesh(&mut self.mesh, merge_epsilon);
        self.log(format!(
            "Cleaned: merged {} vertices, dropped {} cells",
            report.merged_vertices, report.degenerate_cells
        ));
        self.stages_executed += 1;
        self
    }

    /// Rotate onto the principal axes, with the configured fixed rotations.
    pub fn align(mut self, params: &AlignParams) -> MeshResult<Self> {
        let result = align_to_principal_axes(&self.mesh, params)?;
        self.log(format!(
            "Aligned to principal axes (eigenvalues {:.4e}, {:.4e}, {:.4e}{})",
            result.axes.eigenvalues[0],
            result.axes.eigenvalues[1],
            result.axes.eigenvalues[2],
            if result.axes.degenerate {
                ", degenerate"
            } else {
                ""
            }
        ));
        self.mesh = result.mesh;
        self.axes = Some(result.axes);
        self.stages_executed += 1;
        Ok(self)
    }

    /// Run the stages a [`PrepareConfig`] enables.
    ///
    /// Welding runs first so that cells sharing only coincident corners
    /// count as connected.
    pub fn run_config(self, config: &PrepareConfig) -> MeshResult<Self> {
        let pipeline = match config.clean_epsilon {
            Some(epsilon) => self.clean(epsilon),
            None => self,
        };
        let pipeline = if config.keep_largest_region {
            pipeline.keep_largest_region()?
        } else {
            pipeline
        };
        match &config.align {
            Some(params) => pipeline.align(params),
            None => Ok(pipeline),
        }
    }

    /// Save the mesh to a file, with the format taken from its extension.
    pub fn save(mut self, path: impl AsRef<Path>) -> MeshResult<PipelineResult> {
        let path = path.as_ref();
        save_mesh(&self.mesh, path)?;
        self.log(format!("Saved mesh to {}", path.display()));
        self.stages_executed += 1;
        info!(
            path = %path.display(),
            stages = self.stages_executed,
            "Pipeline finished"
        );
        Ok(self.finish())
    }

    /// Finish the pipeline and return the result without saving.
    pub fn finish(self) -> PipelineResult {
        PipelineResult {
            mesh: self.mesh,
            axes: self.axes,
            stages_executed: self.stages_executed,
            operation_log: self.operation_log,
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn log_entries(&self) -> &[String] {
        &self.operation_log
    }

    pub fn stages_executed(&self) -> usize {
        self.stages_executed
    }

    fn log(&mut self, message: String) {
        self.operation_log.push(message);
    }
}
