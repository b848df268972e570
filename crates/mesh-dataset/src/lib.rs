//! Build graph-structured datasets from wind-tunnel simulation outputs.
//!
//! Each simulation folder holds a surface mesh carrying the solver's
//! pressure field and the object mesh the simulation was run on. This crate
//! samples the pressure onto the object's vertices and writes one record
//! per folder: node positions, unique undirected edges, one pressure per
//! node, and an optional free-stream flow vector.
//!
//! # Components
//!
//! - **Loading** ([`io`]): OBJ, STL, PLY and VTK (legacy and XML, PolyData
//!   and UnstructuredGrid) into a polygonal [`Mesh`] with point and cell
//!   fields
//! - **Connectivity** ([`components`]): label regions of cells sharing a
//!   vertex and keep the largest
//! - **Alignment** ([`align`]): rotate a mesh onto its principal axes, with
//!   fixed corrective rotations before and after
//! - **Sampling** ([`interpolate`]): resample a field onto another mesh's
//!   vertices within a distance tolerance
//! - **Graph** ([`graph`]): nodes and unique edges of a mesh wireframe
//! - **Batch** ([`batch`]): run all of the above over many folders in
//!   parallel, with per-folder outcomes
//!
//! # Coordinate System
//!
//! Right-handed. After [`align::AlignParams::wind_tunnel`] alignment the
//! longest principal axis of the object lies along X. Units are whatever
//! the solver used; the sampling tolerance is in the same units.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use mesh_dataset::{DatasetConfig, discover_folders, process_batch};
//!
//! let config = DatasetConfig::default();
//! let folders = discover_folders(Path::new("simulations")).unwrap();
//! let report = process_batch(&folders, &config, Path::new("dataset"), None).unwrap();
//!
//! println!("{}", report);
//! for id in report.failed() {
//!     eprintln!("failed: {}", id);
//! }
//! ```
//!
//! # Single Folder
//!
//! ```no_run
//! use mesh_dataset::{Mesh, SampleParams, extract_graph, sample_field};
//!
//! let source = Mesh::load("sim/pressure_field.vtk").unwrap();
//! let target = Mesh::load("sim/object.obj").unwrap();
//!
//! let sampled = sample_field(&source, &target, &SampleParams::with_tolerance(0.5)).unwrap();
//! let graph = extract_graph(&sampled.mesh);
//! assert_eq!(graph.node_count(), sampled.values.len());
//! ```

mod error;
mod types;

pub mod align;
pub mod batch;
pub mod clean;
pub mod components;
pub mod config;
pub mod graph;
pub mod interpolate;
pub mod io;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod tracing_ext;
pub mod validate;

// Re-export core types at crate root
pub use error::{
    ErrorCode, IssueSeverity, MeshError, MeshLocation, MeshResult, RecoverySuggestion,
    ValidationIssue,
};
pub use types::{Field, FieldSupport, FieldValues, Mesh, Triangle};

pub use align::{
    AlignParams, AlignResult, Axis, AxisRotation, PrincipalAxes, SignConvention,
    align_to_principal_axes, principal_axes,
};
pub use batch::{
    BatchReport, FolderOutcome, Manifest, PrepareSummary, RecordStats, RecordSummary,
    SimulationFolder, SkipReason, build_record, discover_folders, prepare_batch, prepare_object,
    process_batch, process_folder,
};
pub use clean::{CleanReport, clean_mesh};
pub use components::{RegionLabels, label_regions, largest_connected_region, split_into_regions};
pub use config::{DatasetConfig, OutputFormat, OutputLayout, PrepareConfig};
pub use graph::{Edge, MeshGraph, extract_edges, extract_graph};
pub use interpolate::{SampleParams, SampleResult, sample_field};
pub use io::{MeshFormat, load_mesh, save_mesh, save_obj, save_ply, save_stl};
pub use pipeline::{Pipeline, PipelineResult};
pub use progress::{BatchProgress, Progress};
pub use record::{SimulationRecord, load_flow_vector};
pub use validate::{
    DataValidationResult, MeshReport, ValidationOptions, validate_mesh, validate_mesh_data,
};

impl Mesh {
    /// Load a mesh from a file, with the format taken from its extension.
    pub fn load(path: impl AsRef<std::path::Path>) -> MeshResult<Self> {
        load_mesh(path.as_ref())
    }

    /// Save the mesh, with the format taken from the extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> MeshResult<()> {
        save_mesh(self, path.as_ref())
    }

    /// Summary report: counts, bounds, regions and fields.
    pub fn validate(&self) -> MeshReport {
        validate_mesh(self)
    }

    /// Connected regions of cells.
    pub fn regions(&self) -> RegionLabels {
        label_regions(self)
    }

    /// The connected region with the most cells, as a new mesh.
    pub fn largest_region(&self) -> MeshResult<Mesh> {
        largest_connected_region(self)
    }

    /// Merge coincident vertices and drop degenerate cells in place.
    pub fn clean(&mut self, merge_epsilon: f64) -> CleanReport {
        clean_mesh(self, merge_epsilon)
    }

    /// A copy rotated onto its principal axes.
    pub fn aligned(&self, params: &AlignParams) -> MeshResult<Mesh> {
        align_to_principal_axes(self, params).map(|result| result.mesh)
    }

    /// Nodes and unique edges.
    pub fn graph(&self) -> MeshGraph {
        extract_graph(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_convenience_methods_agree_with_functions() {
        let mut mesh = Mesh::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 0.0),
            ],
            &[[0, 1, 2]],
        );
        assert_eq!(mesh.clean(1e-6).unreferenced_vertices, 1);
        assert_eq!(mesh.regions().region_count(), 1);
        assert_eq!(mesh.graph(), extract_graph(&mesh));
        assert_eq!(mesh.largest_region().unwrap().face_count(), 1);
        assert_eq!(mesh.validate().face_count, 1);
    }

    #[test]
    fn test_load_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.stl");
        let mesh = Mesh::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2]],
        );
        mesh.save(&path).unwrap();
        let loaded = Mesh::load(&path).unwrap();
        assert_eq!(loaded.face_count(), 1);
    }
}
