//! Batch driver: turn a directory of simulation folders into dataset
//! records, one folder at a time on a rayon pool.
//!
//! Each folder ends in exactly one [`FolderOutcome`]. A folder missing a
//! required file is skipped with a warning, any error while processing it
//! fails only that folder, and folders not yet started when the batch is
//! cancelled are reported as cancelled. The batch itself only fails on
//! setup errors (bad configuration, unwritable output directory).

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};

use hashbrown::HashSet;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::components::largest_connected_region;
use crate::config::{DatasetConfig, PrepareConfig};
use crate::error::{MeshError, MeshResult};
use crate::graph::extract_graph;
use crate::interpolate::sample_field;
use crate::io::load_mesh;
use crate::pipeline::Pipeline;
use crate::progress::BatchProgress;
use crate::record::{SimulationRecord, load_flow_vector};
use crate::tracing_ext::{OperationTimer, log_folder_outcome, log_mesh_stats};

/// One simulation folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationFolder {
    /// Folder name, used as the record id.
    pub id: String,
    pub path: PathBuf,
    /// Set when the folder is reported as skipped without being opened.
    pub rejected: Option<SkipReason>,
}

impl SimulationFolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            id,
            path,
            rejected: None,
        }
    }
}

/// Every subdirectory of `data_dir`, sorted by name.
pub fn discover_folders(data_dir: &Path) -> MeshResult<Vec<SimulationFolder>> {
    let entries = std::fs::read_dir(data_dir).map_err(|e| MeshError::io_read(data_dir, e))?;
    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MeshError::io_read(data_dir, e))?;
        if entry.path().is_dir() {
            folders.push(SimulationFolder::new(entry.path()));
        }
    }
    folders.sort_by(|a, b| a.id.cmp(&b.id));
    debug!(
        dir = %data_dir.display(),
        count = folders.len(),
        "Discovered simulation folders"
    );
    Ok(folders)
}

/// A list of folder ids, one per line.
///
/// Blank lines are ignored and `#` starts a comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub ids: Vec<String>,
}

impl Manifest {
    pub fn parse(text: &str) -> Self {
        let ids = text
            .lines()
            .map(|line| line.split('#').next().unwrap_or("").trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        Self { ids }
    }

    pub fn from_file(path: &Path) -> MeshResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MeshError::io_read(path, e))?;
        Ok(Self::parse(&text))
    }

    /// Folders for the listed ids under `data_dir`, in manifest order.
    ///
    /// Ids are not checked for existence; a missing folder is skipped when
    /// the batch runs. An id that is not a single plain folder name, or that
    /// repeats an earlier id, is marked rejected and never opened.
    pub fn resolve(&self, data_dir: &Path) -> Vec<SimulationFolder> {
        let mut seen = HashSet::new();
        self.ids
            .iter()
            .map(|id| {
                let rejected = if !is_plain_folder_name(id) {
                    Some(SkipReason::InvalidId)
                } else if !seen.insert(id.as_str()) {
                    Some(SkipReason::DuplicateId)
                } else {
                    None
                };
                if let Some(reason) = &rejected {
                    warn!(id = %id, "Manifest entry rejected: {}", reason);
                }
                let path = match rejected {
                    Some(_) => data_dir.to_path_buf(),
                    None => data_dir.join(id),
                };
                SimulationFolder {
                    id: id.clone(),
                    path,
                    rejected,
                }
            })
            .collect()
    }
}

fn is_plain_folder_name(id: &str) -> bool {
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Why a folder was not processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A required file is absent.
    MissingFile(String),
    /// Manifest id is not a plain folder name.
    InvalidId,
    /// Manifest id already listed.
    DuplicateId,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingFile(name) => write!(f, "missing file {}", name),
            SkipReason::InvalidId => write!(f, "not a plain folder name"),
            SkipReason::DuplicateId => write!(f, "duplicate manifest entry"),
        }
    }
}

/// What one folder produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub nodes: usize,
    pub edges: usize,
    /// Nodes that received the fallback pressure.
    pub gaps: usize,
    /// `gaps` as a fraction of `nodes`.
    pub gap_fraction: f64,
    /// Nodes with no incident edge.
    pub isolated_nodes: usize,
    pub has_flow_vector: bool,
    pub files: Vec<PathBuf>,
}

impl fmt::Display for RecordSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} nodes, {} edges", self.nodes, self.edges)?;
        if self.gaps > 0 {
            write!(f, ", {} gaps ({:.1}%)", self.gaps, self.gap_fraction * 100.0)?;
        }
        if self.isolated_nodes > 0 {
            write!(f, ", {} isolated", self.isolated_nodes)?;
        }
        Ok(())
    }
}

/// Sampling and connectivity figures for one record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecordStats {
    pub gaps: usize,
    pub gap_fraction: f64,
    pub isolated_nodes: usize,
}

/// What one prepared mesh looks like.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepareSummary {
    pub vertices: usize,
    pub cells: usize,
    /// Alignment ran but the principal axes were not unique.
    pub degenerate_alignment: bool,
    pub output: PathBuf,
}

impl fmt::Display for PrepareSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vertices, {} cells -> {}",
            self.vertices,
            self.cells,
            self.output.display()
        )?;
        if self.degenerate_alignment {
            write!(f, " (degenerate alignment)")?;
        }
        Ok(())
    }
}

/// Result of processing one folder.
#[derive(Debug)]
pub enum FolderOutcome<T = RecordSummary> {
    Succeeded(T),
    Skipped(SkipReason),
    Failed(MeshError),
    Cancelled,
}

impl<T> FolderOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, FolderOutcome::Succeeded(_))
    }

    /// Lowercase status name.
    pub fn status(&self) -> &'static str {
        match self {
            FolderOutcome::Succeeded(_) => "succeeded",
            FolderOutcome::Skipped(_) => "skipped",
            FolderOutcome::Failed(_) => "failed",
            FolderOutcome::Cancelled => "cancelled",
        }
    }
}

/// Outcomes of a batch, in input order.
#[derive(Debug)]
pub struct BatchReport<T = RecordSummary> {
    pub results: Vec<(String, FolderOutcome<T>)>,
}

impl<T> BatchReport<T> {
    fn ids_where(&self, status: &str) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, outcome)| outcome.status() == status)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn succeeded(&self) -> Vec<&str> {
        self.ids_where("succeeded")
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.ids_where("skipped")
    }

    pub fn failed(&self) -> Vec<&str> {
        self.ids_where("failed")
    }

    pub fn cancelled(&self) -> Vec<&str> {
        self.ids_where("cancelled")
    }

    pub fn has_failures(&self) -> bool {
        self.results
            .iter()
            .any(|(_, outcome)| matches!(outcome, FolderOutcome::Failed(_)))
    }

    /// Outcome for one folder id.
    pub fn outcome(&self, id: &str) -> Option<&FolderOutcome<T>> {
        self.results
            .iter()
            .find(|(folder, _)| folder == id)
            .map(|(_, outcome)| outcome)
    }
}

impl<T: Serialize> BatchReport<T> {
    /// JSON summary listing every folder with its status and reason.
    pub fn to_json(&self) -> serde_json::Value {
        let folders: Vec<serde_json::Value> = self
            .results
            .iter()
            .map(|(id, outcome)| {
                let mut entry = serde_json::json!({
                    "id": id,
                    "status": outcome.status(),
                });
                match outcome {
                    FolderOutcome::Succeeded(summary) => {
                        entry["summary"] =
                            serde_json::to_value(summary).unwrap_or(serde_json::Value::Null);
                    }
                    FolderOutcome::Skipped(reason) => {
                        entry["reason"] = reason.to_string().into();
                    }
                    FolderOutcome::Failed(error) => {
                        entry["code"] = error.code().as_str().into();
                        entry["reason"] = error.to_string().into();
                    }
                    FolderOutcome::Cancelled => {}
                }
                entry
            })
            .collect();
        serde_json::json!({
            "succeeded": self.succeeded().len(),
            "skipped": self.skipped().len(),
            "failed": self.failed().len(),
            "cancelled": self.cancelled().len(),
            "folders": folders,
        })
    }
}

impl<T> fmt::Display for BatchReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {} failed, {} cancelled",
            self.succeeded().len(),
            self.skipped().len(),
            self.failed().len(),
            self.cancelled().len()
        )
    }
}

/// Load both meshes of a folder and build its record.
///
/// Returns the record with its gap and isolated-node counts.
pub fn build_record(
    folder: &Path,
    config: &DatasetConfig,
) -> MeshResult<(SimulationRecord, RecordStats)> {
    let source = load_mesh(&folder.join(&config.field_mesh_name))?;
    log_mesh_stats(&source, "field mesh");
    let mut target = load_mesh(&folder.join(&config.target_mesh_name))?;
    log_mesh_stats(&target, "target mesh");
    if target.faces.is_empty() {
        return Err(MeshError::empty_mesh(format!(
            "{} has no cells",
            config.target_mesh_name
        )));
    }

    if config.keep_largest_region {
        target = largest_connected_region(&target)?;
    }

    let sampled = sample_field(&source, &target, &config.sampling)?;
    let graph = extract_graph(&sampled.mesh);
    let stats = RecordStats {
        gaps: sampled.gaps,
        gap_fraction: sampled.gap_fraction(),
        isolated_nodes: graph.degrees().iter().filter(|&&d| d == 0).count(),
    };
    if stats.isolated_nodes > 0 {
        warn!(
            isolated = stats.isolated_nodes,
            "Record has nodes without edges"
        );
    }

    let flow_path = folder.join(&config.flow_vector_name);
    let flow_vector = if flow_path.is_file() {
        Some(load_flow_vector(&flow_path)?)
    } else {
        debug!(path = %flow_path.display(), "No flow vector");
        None
    };

    let record = SimulationRecord::new(graph, sampled.values, flow_vector)?;
    Ok((record, stats))
}

fn missing_file(dir: &Path, names: &[&str]) -> Option<SkipReason> {
    names
        .iter()
        .find(|name| !dir.join(name).is_file())
        .map(|name| SkipReason::MissingFile((*name).to_string()))
}

/// Process one folder and write its record under `out_dir/<id>`.
pub fn process_folder(
    folder: &SimulationFolder,
    config: &DatasetConfig,
    out_dir: &Path,
) -> FolderOutcome {
    let _timer = OperationTimer::new("process_folder");

    if let Some(reason) = missing_file(&folder.path, &config.required_files()) {
        warn!(folder = %folder.id, "Skipping folder: {}", reason);
        return FolderOutcome::Skipped(reason);
    }

    let written = build_record(&folder.path, config).and_then(|(record, stats)| {
        let files = record.write(&out_dir.join(&folder.id), &config.output)?;
        Ok(RecordSummary {
            nodes: record.node_count(),
            edges: record.edge_count(),
            gaps: stats.gaps,
            gap_fraction: stats.gap_fraction,
            isolated_nodes: stats.isolated_nodes,
            has_flow_vector: record.flow_vector.is_some(),
            files,
        })
    });

    match written {
        Ok(summary) => FolderOutcome::Succeeded(summary),
        Err(e) => FolderOutcome::Failed(e),
    }
}

fn thread_pool(threads: Option<usize>) -> MeshResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| MeshError::invalid_config(format!("cannot start worker pool: {}", e)))
}

/// Run `work` for every folder on a pool, honoring cancellation.
///
/// A panic inside `work` fails only that folder.
fn run_batch<T: Send + fmt::Display>(
    folders: &[SimulationFolder],
    threads: Option<usize>,
    progress: Option<&BatchProgress>,
    work: impl Fn(&SimulationFolder) -> FolderOutcome<T> + Sync,
) -> MeshResult<BatchReport<T>> {
    let pool = thread_pool(threads)?;
    let results: Vec<(String, FolderOutcome<T>)> = pool.install(|| {
        folders
            .par_iter()
            .map(|folder| {
                if progress.is_some_and(BatchProgress::is_cancelled) {
                    return (folder.id.clone(), FolderOutcome::Cancelled);
                }
                let outcome = match &folder.rejected {
                    Some(reason) => FolderOutcome::Skipped(reason.clone()),
                    None => panic::catch_unwind(AssertUnwindSafe(|| work(folder)))
                        .unwrap_or_else(|payload| {
                            FolderOutcome::Failed(MeshError::panicked(
                                &folder.id,
                                payload.as_ref(),
                            ))
                        }),
                };
                log_folder_outcome(&folder.id, &outcome);
                if let Some(progress) = progress {
                    progress.finish_one(&folder.id);
                }
                (folder.id.clone(), outcome)
            })
            .collect()
    });
    Ok(BatchReport { results })
}

/// Build records for every folder.
///
/// `progress` carries the cancellation flag and an optional callback.
pub fn process_batch(
    folders: &[SimulationFolder],
    config: &DatasetConfig,
    out_dir: &Path,
    progress: Option<&BatchProgress>,
) -> MeshResult<BatchReport> {
    config.validate()?;
    std::fs::create_dir_all(out_dir).map_err(|e| MeshError::io_write(out_dir, e))?;

    info!(
        folders = folders.len(),
        out_dir = %out_dir.display(),
        "Processing simulation folders"
    );
    let report = run_batch(folders, config.threads, progress, |folder| {
        process_folder(folder, config, out_dir)
    })?;
    info!("Batch finished: {}", report);
    Ok(report)
}

/// Prepare one object mesh and write it to `output`.
pub fn prepare_object(
    input: &Path,
    output: &Path,
    config: &PrepareConfig,
) -> MeshResult<PrepareSummary> {
    let _timer = OperationTimer::new("prepare_object");
    let result = Pipeline::load(input)?.run_config(config)?.save(output)?;
    for entry in &result.operation_log {
        debug!(input = %input.display(), "{}", entry);
    }
    let degenerate_alignment = result.axes.as_ref().is_some_and(|axes| axes.degenerate);
    if degenerate_alignment {
        warn!(input = %input.display(), "Prepared mesh has no unique principal axes");
    }
    Ok(PrepareSummary {
        vertices: result.mesh.vertex_count(),
        cells: result.mesh.face_count(),
        degenerate_alignment,
        output: output.to_path_buf(),
    })
}

/// Prepare every input mesh into `out_dir`, named `<stem>.<extension>`.
pub fn prepare_batch(
    inputs: &[PathBuf],
    out_dir: &Path,
    config: &PrepareConfig,
    progress: Option<&BatchProgress>,
) -> MeshResult<BatchReport<PrepareSummary>> {
    config.validate()?;
    std::fs::create_dir_all(out_dir).map_err(|e| MeshError::io_write(out_dir, e))?;

    let jobs: Vec<SimulationFolder> = inputs.iter().map(SimulationFolder::new).collect();
    let report = run_batch(&jobs, config.threads, progress, |job| {
        if !job.path.is_file() {
            warn!(input = %job.path.display(), "Skipping missing input");
            return FolderOutcome::Skipped(SkipReason::MissingFile(job.id.clone()));
        }
        let stem = job
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| job.id.clone());
        let output = out_dir.join(format!("{}.{}", stem, config.output_extension));
        match prepare_object(&job.path, &output, config) {
            Ok(summary) => FolderOutcome::Succeeded(summary),
            Err(e) => FolderOutcome::Failed(e),
        }
    })?;
    info!("Preparation finished: {}", report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parse() {
        let manifest = Manifest::parse("# header\nsim_a\n\n  sim_b  # trailing\n#sim_c\n");
        assert_eq!(manifest.ids, vec!["sim_a", "sim_b"]);

        let folders = manifest.resolve(Path::new("/data"));
        assert_eq!(folders[1].id, "sim_b");
        assert_eq!(folders[1].path, Path::new("/data/sim_b"));
    }

    #[test]
    fn test_manifest_rejects_paths_and_duplicates() {
        let manifest = Manifest::parse("a\n/etc\n..\nx/../a\n.\na\nb\n");
        let folders = manifest.resolve(Path::new("/data"));
        let rejected: Vec<Option<SkipReason>> =
            folders.iter().map(|f| f.rejected.clone()).collect();
        assert_eq!(
            rejected,
            vec![
                None,
                Some(SkipReason::InvalidId),
                Some(SkipReason::InvalidId),
                Some(SkipReason::InvalidId),
                Some(SkipReason::InvalidId),
                Some(SkipReason::DuplicateId),
                None,
            ]
        );
        assert_eq!(folders[6].path, Path::new("/data/b"));
        assert!(folders.iter().all(|f| f.path.starts_with("/data")));
    }

    #[test]
    fn test_discover_folders_sorted_dirs_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let folders = discover_folders(dir.path()).unwrap();
        let ids: Vec<&str> = folders.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_file_skips() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pressure_field.vtk"), "").unwrap();
        let folder = SimulationFolder::new(dir.path());
        let outcome = process_folder(&folder, &DatasetConfig::default(), dir.path());
        match outcome {
            FolderOutcome::Skipped(SkipReason::MissingFile(name)) => assert_eq!(name, "object.obj"),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_input_fails_folder() {
        let dir = tempfile::tempdir().unwrap();
        let sim = dir.path().join("sim");
        std::fs::create_dir(&sim).unwrap();
        std::fs::write(sim.join("pressure_field.vtk"), "not a vtk file").unwrap();
        std::fs::write(sim.join("object.obj"), "v 0 0 0\n").unwrap();

        let outcome = process_folder(
            &SimulationFolder::new(&sim),
            &DatasetConfig::default(),
            &dir.path().join("out"),
        );
        match outcome {
            FolderOutcome::Failed(e) => assert!(e.is_load_error()),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_record_stats_count_gaps_and_isolated_nodes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("field.ply"),
            "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\n\
             property float z\nproperty float p\nelement face 1\n\
             property list uchar int vertex_indices\nend_header\n\
             0 0 0 1\n1 0 0 1\n0 1 0 1\n3 0 1 2\n",
        )
        .unwrap();
        // Fourth vertex is far from the field and used by no cell.
        std::fs::write(
            dir.path().join("object.ply"),
            "ply\nformat ascii 1.0\nelement vertex 4\nproperty float x\nproperty float y\n\
             property float z\nelement face 1\nproperty list uchar int vertex_indices\n\
             end_header\n0 0 0\n1 0 0\n0 1 0\n40 40 40\n3 0 1 2\n",
        )
        .unwrap();
        let mut config = DatasetConfig {
            field_mesh_name: "field.ply".to_string(),
            target_mesh_name: "object.ply".to_string(),
            ..DatasetConfig::default()
        };
        config.sampling.clean_target = false;

        let (record, stats) = build_record(dir.path(), &config).unwrap();
        assert_eq!(record.node_count(), 4);
        assert_eq!(stats.gaps, 1);
        assert!((stats.gap_fraction - 0.25).abs() < 1e-12);
        assert_eq!(stats.isolated_nodes, 1);

        let summary = process_folder(
            &SimulationFolder::new(dir.path()),
            &config,
            &dir.path().join("out"),
        );
        match summary {
            FolderOutcome::Succeeded(summary) => {
                assert_eq!(summary.isolated_nodes, 1);
                assert!(summary.to_string().contains("1 gaps (25.0%)"), "{}", summary);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_target_without_cells_fails_folder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("points.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\n").unwrap();
        let config = DatasetConfig {
            field_mesh_name: "points.obj".to_string(),
            target_mesh_name: "points.obj".to_string(),
            ..DatasetConfig::default()
        };

        match build_record(dir.path(), &config) {
            Err(MeshError::EmptyMesh { .. }) => {}
            other => panic!("expected EmptyMesh, got {:?}", other.map(|(r, _)| r.node_count())),
        }
    }

    #[test]
    fn test_cancelled_batch_reports_every_folder() {
        let dir = tempfile::tempdir().unwrap();
        let folders: Vec<SimulationFolder> = ["a", "b", "c"]
            .iter()
            .map(|id| SimulationFolder::new(dir.path().join(id)))
            .collect();
        let progress = BatchProgress::new(folders.len());
        progress.cancel();

        let report = process_batch(
            &folders,
            &DatasetConfig::default(),
            &dir.path().join("out"),
            Some(&progress),
        )
        .unwrap();
        assert_eq!(report.cancelled(), vec!["a", "b", "c"]);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_panicking_folder_fails_alone() {
        let dir = tempfile::tempdir().unwrap();
        let folders: Vec<SimulationFolder> = ["ok", "boom", "fine"]
            .iter()
            .map(|id| SimulationFolder::new(dir.path().join(id)))
            .collect();

        let report = run_batch(&folders, Some(2), None, |folder| {
            if folder.id == "boom" {
                panic!("bad cell in {}", folder.id);
            }
            FolderOutcome::Succeeded(folder.id.len())
        })
        .unwrap();

        assert_eq!(report.succeeded(), vec!["ok", "fine"]);
        match report.outcome("boom") {
            Some(FolderOutcome::Failed(e)) => {
                assert_eq!(e.code(), crate::error::ErrorCode::Panicked);
                assert!(e.to_string().contains("bad cell in boom"), "{}", e);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_rejected_folder_is_skipped_without_work() {
        let folders = Manifest::parse("../outside\nsim\nsim\n").resolve(Path::new("/data"));
        let report = run_batch(&folders, None, None, |folder| {
            FolderOutcome::Succeeded(folder.id.clone())
        })
        .unwrap();
        assert_eq!(report.succeeded(), vec!["sim"]);
        assert_eq!(report.skipped(), vec!["../outside", "sim"]);
        assert!(matches!(
            report.results[0].1,
            FolderOutcome::Skipped(SkipReason::InvalidId)
        ));
        assert!(matches!(
            report.results[2].1,
            FolderOutcome::Skipped(SkipReason::DuplicateId)
        ));
    }

    #[test]
    fn test_invalid_config_aborts_before_work() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig {
            threads: Some(0),
            ..DatasetConfig::default()
        };
        let err = process_batch(&[], &config, dir.path(), None).unwrap_err();
        assert!(matches!(err, MeshError::InvalidConfig { .. }));
    }

    #[test]
    fn test_report_json() {
        let report: BatchReport = BatchReport {
            results: vec![
                (
                    "a".to_string(),
                    FolderOutcome::Skipped(SkipReason::MissingFile("object.obj".to_string())),
                ),
                ("b".to_string(), FolderOutcome::Cancelled),
            ],
        };
        let json = report.to_json();
        assert_eq!(json["skipped"], 1);
        assert_eq!(json["folders"][0]["reason"], "missing file object.obj");
        assert_eq!(json["folders"][1]["status"], "cancelled");
        assert_eq!(report.to_string(), "0 succeeded, 1 skipped, 0 failed, 1 cancelled");
    }
}
