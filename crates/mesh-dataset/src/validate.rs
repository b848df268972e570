//! Mesh validation and reporting.

use nalgebra::Point3;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::components::label_regions;
use crate::error::{MeshError, MeshResult, ValidationIssue};
use crate::types::{Field, FieldSupport, Mesh};

/// Summary of one field carried by a mesh.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSummary {
    pub name: String,
    pub support: FieldSupport,
    pub components: usize,
    /// (min, max) over the scalar view of the field, if it has values.
    pub range: Option<(f64, f64)>,
}

impl FieldSummary {
    fn new(field: &Field, support: FieldSupport) -> Self {
        let range = (0..field.values.len())
            .map(|i| field.values.scalar_at(i))
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            });
        Self {
            name: field.name.clone(),
            support,
            components: field.values.components(),
            range,
        }
    }
}

/// Descriptive report for a mesh.
#[derive(Debug, Clone, Serialize)]
pub struct MeshReport {
    /// Total vertex count.
    pub vertex_count: usize,

    /// Total cell count.
    pub face_count: usize,

    /// Bounding box as (min_corner, max_corner).
    #[serde(skip)]
    pub bounds: Option<(Point3<f64>, Point3<f64>)>,

    /// Dimensions (x, y, z).
    pub dimensions: Option<(f64, f64, f64)>,

    /// Total surface area of all cells.
    pub surface_area: f64,

    /// Number of vertex-connected regions.
    pub region_count: usize,

    /// Cell count of the largest region.
    pub largest_region_cells: usize,

    /// Fields carried by the mesh.
    pub fields: Vec<FieldSummary>,
}

impl MeshReport {
    /// Check if mesh passes basic validity checks.
    pub fn is_valid(&self) -> bool {
        self.vertex_count > 0 && self.face_count > 0
    }
}

/// Build a descriptive report for a mesh.
pub fn validate_mesh(mesh: &Mesh) -> MeshReport {
    let bounds = mesh.bounds();
    let dimensions = bounds.map(|(min, max)| {
        let d = max - min;
        (d.x, d.y, d.z)
    });
    let labels = label_regions(mesh);

    let fields = mesh
        .point_data
        .iter()
        .map(|f| FieldSummary::new(f, FieldSupport::Point))
        .chain(
            mesh.cell_data
                .iter()
                .map(|f| FieldSummary::new(f, FieldSupport::Cell)),
        )
        .collect();

    MeshReport {
        vertex_count: mesh.vertex_count(),
        face_count: mesh.face_count(),
        bounds,
        dimensions,
        surface_area: mesh.surface_area(),
        region_count: labels.region_count(),
        largest_region_cells: labels.largest().map_or(0, |r| labels.cell_counts[r]),
        fields,
    }
}

/// Log a summary of a mesh report.
pub fn log_report(report: &MeshReport) {
    let dims = report
        .dimensions
        .map(|d| format!("{:.3}x{:.3}x{:.3}", d.0, d.1, d.2))
        .unwrap_or_default();
    info!(
        "Mesh: {} verts, {} cells, {}",
        report.vertex_count, report.face_count, dims
    );
    if report.region_count > 1 {
        warn!(
            "Mesh has {} disconnected regions; largest has {} cells",
            report.region_count, report.largest_region_cells
        );
    }
}

/// Options for mesh data validation.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Whether to reject the mesh on finding invalid data (default: true).
    /// If false, issues are collected but validation continues.
    pub reject_on_invalid: bool,
    /// Maximum number of issues to collect before stopping (default: 100).
    pub max_issues: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            reject_on_invalid: true,
            max_issues: 100,
        }
    }
}

impl ValidationOptions {
    /// Create options that collect all issues without rejecting.
    pub fn collect_all() -> Self {
        Self {
            reject_on_invalid: false,
            max_issues: 1000,
        }
    }
}

/// Result of mesh data validation.
#[derive(Debug, Clone, Default)]
pub struct DataValidationResult {
    /// List of issues found during validation.
    pub issues: Vec<ValidationIssue>,
    /// Number of invalid vertex indices found.
    pub invalid_index_count: usize,
    /// Number of NaN or infinite coordinates found.
    pub bad_coordinate_count: usize,
    /// Number of cells with fewer than three distinct vertices.
    pub degenerate_face_count: usize,
    /// Number of fields whose length does not match their support.
    pub field_length_count: usize,
}

impl DataValidationResult {
    /// Check if validation passed with no issues.
    pub fn is_valid(&self) -> bool {
        self.issue_count() == 0
    }

    /// Get total number of issues found, including those past `max_issues`.
    pub fn issue_count(&self) -> usize {
        self.invalid_index_count
            + self.bad_coordinate_count
            + self.degenerate_face_count
            + self.field_length_count
    }

    /// Keep `issue` unless `max_issues` are already listed. Counters are
    /// updated by the caller either way.
    fn record(&mut self, options: &ValidationOptions, issue: ValidationIssue) {
        if self.issues.len() < options.max_issues {
            self.issues.push(issue);
        }
    }
}

impl std::fmt::Display for DataValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            return write!(f, "Data validation passed: no issues found");
        }
        writeln!(f, "Data validation found {} issue(s):", self.issue_count())?;
        if self.invalid_index_count > 0 {
            writeln!(f, "  - {} invalid vertex indices", self.invalid_index_count)?;
        }
        if self.bad_coordinate_count > 0 {
            writeln!(f, "  - {} non-finite coordinates", self.bad_coordinate_count)?;
        }
        if self.degenerate_face_count > 0 {
            writeln!(f, "  - {} degenerate cells", self.degenerate_face_count)?;
        }
        if self.field_length_count > 0 {
            writeln!(f, "  - {} fields with wrong length", self.field_length_count)?;
        }
        Ok(())
    }
}

/// Validate mesh data for invalid indices, coordinates and field lengths.
///
/// With `reject_on_invalid`, the first error-severity issue is returned as a
/// [`MeshError`]. Degenerate cells are only ever reported as warnings.
pub fn validate_mesh_data(
    mesh: &Mesh,
    options: &ValidationOptions,
) -> MeshResult<DataValidationResult> {
    let mut result = DataValidationResult::default();
    let vertex_count = mesh.vertices.len();

    for (vertex_idx, p) in mesh.vertices.iter().enumerate() {
        for (coordinate, value) in [("x", p.x), ("y", p.y), ("z", p.z)] {
            if value.is_finite() {
                continue;
            }
            result.bad_coordinate_count += 1;
            if options.reject_on_invalid {
                return Err(MeshError::InvalidCoordinate {
                    vertex_index: vertex_idx,
                    coordinate,
                    value,
                });
            }
            result.record(options, if value.is_nan() {
                ValidationIssue::NaNCoordinate {
                    vertex_index: vertex_idx,
                    coordinate,
                }
            } else {
                ValidationIssue::InfiniteCoordinate {
                    vertex_index: vertex_idx,
                    coordinate,
                    value,
                }
            });
        }
    }

    for (face_idx, face) in mesh.faces.iter().enumerate() {
        for &vertex_idx in face {
            if (vertex_idx as usize) < vertex_count {
                continue;
            }
            result.invalid_index_count += 1;
            if options.reject_on_invalid {
                return Err(MeshError::invalid_vertex_index(
                    face_idx,
                    vertex_idx,
                    vertex_count,
                ));
            }
            result.record(
                options,
                ValidationIssue::InvalidVertexIndex {
                    face_index: face_idx,
                    vertex_index: vertex_idx,
                    vertex_count,
                },
            );
        }

        let mut distinct = face.clone();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 3 {
            result.degenerate_face_count += 1;
            result.record(options, ValidationIssue::DegenerateFace { face_index: face_idx });
        }
    }

    let supports = [
        (&mesh.point_data, vertex_count),
        (&mesh.cell_data, mesh.faces.len()),
    ];
    for (fields, expected) in supports {
        for field in fields {
            let actual = field.values.len();
            if actual == expected {
                continue;
            }
            result.field_length_count += 1;
            if options.reject_on_invalid {
                return Err(MeshError::FieldLengthMismatch {
                    name: field.name.clone(),
                    expected,
                    actual,
                });
            }
            result.record(
                options,
                ValidationIssue::FieldLength {
                    name: field.name.clone(),
                    expected,
                    actual,
                },
            );
        }
    }

    if result.is_valid() {
        debug!("Mesh data validation passed");
    } else {
        warn!(
            "Mesh data validation found {} issue(s): {} invalid indices, {} non-finite, {} degenerate",
            result.issue_count(),
            result.invalid_index_count,
            result.bad_coordinate_count,
            result.degenerate_face_count
        );
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssueSeverity;
    use crate::types::Field;

    fn single_triangle() -> Mesh {
        Mesh::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2]],
        )
    }

    #[test]
    fn test_valid_mesh_passes() {
        let mesh = single_triangle();
        let result = validate_mesh_data(&mesh, &ValidationOptions::default()).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut mesh = single_triangle();
        mesh.faces.push(vec![0, 1, 5]);
        let err = validate_mesh_data(&mesh, &ValidationOptions::default()).unwrap_err();
        match err {
            MeshError::InvalidVertexIndex {
                face_index,
                vertex_index,
                vertex_count,
            } => {
                assert_eq!(face_index, 1);
                assert_eq!(vertex_index, 5);
                assert_eq!(vertex_count, 3);
            }
            other => panic!("expected InvalidVertexIndex, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_coordinate_rejected() {
        let mut mesh = single_triangle();
        mesh.vertices[1].y = f64::NAN;
        let err = validate_mesh_data(&mesh, &ValidationOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            MeshError::InvalidCoordinate {
                vertex_index: 1,
                coordinate: "y",
                ..
            }
        ));
    }

    #[test]
    fn test_field_length_mismatch_rejected() {
        let mut mesh = single_triangle();
        mesh.set_point_field(Field::scalar("p", vec![1.0, 2.0]));
        let err = validate_mesh_data(&mesh, &ValidationOptions::default()).unwrap_err();
        assert!(matches!(err, MeshError::FieldLengthMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn test_collect_all_gathers_issues() {
        let mut mesh = single_triangle();
        mesh.vertices[0].x = f64::INFINITY;
        mesh.faces.push(vec![0, 0, 1]);
        mesh.faces.push(vec![0, 1, 9]);

        let result = validate_mesh_data(&mesh, &ValidationOptions::collect_all()).unwrap();
        assert_eq!(result.bad_coordinate_count, 1);
        assert_eq!(result.invalid_index_count, 1);
        assert_eq!(result.degenerate_face_count, 1);
        assert!(
            result
                .issues
                .iter()
                .any(|i| i.severity() == IssueSeverity::Warning)
        );
        assert!(result.to_string().contains("degenerate"));
    }

    #[test]
    fn test_bad_index_after_many_degenerate_cells_rejected() {
        let mut mesh = single_triangle();
        mesh.faces = vec![vec![0, 0, 1]; 150];
        mesh.faces.push(vec![0, 1, 50]);
        let err = validate_mesh_data(&mesh, &ValidationOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            MeshError::InvalidVertexIndex {
                face_index: 150,
                vertex_index: 50,
                ..
            }
        ));
    }

    #[test]
    fn test_listed_issues_are_capped_but_counted() {
        let mut mesh = single_triangle();
        mesh.faces = vec![vec![0, 0, 1]; 10];
        mesh.faces.push(vec![0, 1, 7]);
        let options = ValidationOptions {
            max_issues: 4,
            ..ValidationOptions::collect_all()
        };
        let result = validate_mesh_data(&mesh, &options).unwrap();
        assert_eq!(result.issues.len(), 4);
        assert_eq!(result.degenerate_face_count, 10);
        assert_eq!(result.invalid_index_count, 1);
        assert_eq!(result.issue_count(), 11);
        assert!(!result.is_valid());
    }

    #[test]
    fn test_degenerate_face_is_not_rejected() {
        let mut mesh = single_triangle();
        mesh.faces.push(vec![0, 1, 1]);
        let result = validate_mesh_data(&mesh, &ValidationOptions::default()).unwrap();
        assert_eq!(result.degenerate_face_count, 1);
    }

    #[test]
    fn test_report_counts_regions_and_fields() {
        let mut mesh = single_triangle();
        mesh.vertices.extend([
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 0.0),
        ]);
        mesh.faces.push(vec![3, 4, 5]);
        mesh.set_point_field(Field::scalar("p", vec![-1.0, 0.0, 1.0, 2.0, 3.0, 4.0]));

        let report = validate_mesh(&mesh);
        assert!(report.is_valid());
        assert_eq!(report.region_count, 2);
        assert_eq!(report.largest_region_cells, 1);
        assert_eq!(report.fields.len(), 1);
        assert_eq!(report.fields[0].range, Some((-1.0, 4.0)));
        assert!((report.surface_area - 1.0).abs() < 1e-12);
    }
}
