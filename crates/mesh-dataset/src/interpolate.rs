//! Tolerance-based resampling of a scalar field from a source mesh onto the
//! vertices of a target mesh.
//!
//! For each target vertex the nearest point on the source surface is looked
//! up. If it lies within `tolerance`, the value is the barycentric
//! interpolation of a point field on the nearest triangle, or the value of
//! the owning cell for a cell field. Sources without cells are sampled by
//! inverse-distance weighting of the source points within tolerance.
//! Vertices with nothing in range are gaps and get `fallback_value`.

use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use parry3d_f64::query::PointQuery;
use parry3d_f64::shape::{FeatureId, TriMesh};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clean::{CleanReport, clean_mesh};
use crate::error::{MeshError, MeshResult};
use crate::tracing_ext::{OperationTimer, log_perf_section};
use crate::types::{Field, FieldSupport, Mesh, Triangle};

/// Parameters for [`sample_field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleParams {
    /// Name of the source field to sample.
    pub field_name: String,
    /// Maximum distance from a target vertex to the source surface.
    pub tolerance: f64,
    /// Value written for target vertices with no source within tolerance.
    pub fallback_value: f64,
    /// Distance under which target vertices are merged during cleaning.
    pub merge_epsilon: f64,
    /// Clean the target mesh before sampling.
    pub clean_target: bool,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            field_name: "p".to_string(),
            tolerance: 1.5,
            fallback_value: 0.0,
            merge_epsilon: 1e-6,
            clean_target: true,
        }
    }
}

impl SampleParams {
    /// Default parameters with a different tolerance.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    /// Validate parameters.
    pub fn validate(&self) -> MeshResult<()> {
        if self.field_name.is_empty() {
            return Err(MeshError::invalid_config("sampling.field_name is empty"));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(MeshError::invalid_config(format!(
                "sampling.tolerance must be a finite non-negative number, got {}",
                self.tolerance
            )));
        }
        if !self.fallback_value.is_finite() {
            return Err(MeshError::invalid_config("sampling.fallback_value must be finite"));
        }
        if !(self.merge_epsilon.is_finite() && self.merge_epsilon >= 0.0) {
            return Err(MeshError::invalid_config(format!(
                "sampling.merge_epsilon must be a finite non-negative number, got {}",
                self.merge_epsilon
            )));
        }
        Ok(())
    }
}

/// Output of [`sample_field`].
#[derive(Debug, Clone)]
pub struct SampleResult {
    /// The (cleaned) target mesh, with the sampled values attached as a
    /// point field named after the source field.
    pub mesh: Mesh,
    /// One value per vertex of `mesh`.
    pub values: Vec<f64>,
    /// Vertices that found a source within tolerance.
    pub hits: usize,
    /// Vertices that received the fallback value.
    pub gaps: usize,
    /// What cleaning removed from the target.
    pub clean: CleanReport,
}

impl SampleResult {
    /// Fraction of target vertices that are gaps.
    pub fn gap_fraction(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.gaps as f64 / self.values.len() as f64
        }
    }
}

/// Resample `params.field_name` from `source` onto the vertices of `target`.
///
/// The returned values are aligned with the vertex order of the cleaned
/// target, which is `result.mesh`. Fails with [`MeshError::EmptyField`] if
/// the source has no field of that name.
pub fn sample_field(
    source: &Mesh,
    target: &Mesh,
    params: &SampleParams,
) -> MeshResult<SampleResult> {
    params.validate()?;
    let _timer =
        OperationTimer::with_context("sample_field", target.face_count(), target.vertex_count());

    let Some((support, field)) = source.field(&params.field_name) else {
        return Err(MeshError::empty_field(
            params.field_name.clone(),
            source.field_names(),
        ));
    };
    if field.values.components() != 1 {
        debug!(
            "Field '{}' has {} components, sampling its magnitude",
            field.name,
            field.values.components()
        );
    }

    let mut mesh = target.clone();
    let clean = if params.clean_target {
        clean_mesh(&mut mesh, params.merge_epsilon)
    } else {
        CleanReport::default()
    };

    let samples: Vec<Option<f64>> = match (SurfaceIndex::build(source), support) {
        (Some(index), _) => mesh
            .vertices
            .par_iter()
            .map(|p| index.sample(source, field, support, p, params.tolerance))
            .collect(),
        (None, FieldSupport::Point) => {
            let kdtree = build_kdtree(&source.vertices);
            mesh.vertices
                .par_iter()
                .map(|p| inverse_distance(&kdtree, field, p, params.tolerance))
                .collect()
        }
        (None, FieldSupport::Cell) => {
            return Err(MeshError::empty_field(
                format!("{} (cell field on a mesh without cells)", params.field_name),
                source.field_names(),
            ));
        }
    };

    let hits = samples.iter().filter(|s| s.is_some()).count();
    let gaps = samples.len() - hits;
    let values: Vec<f64> = samples
        .into_iter()
        .map(|s| s.unwrap_or(params.fallback_value))
        .collect();

    if gaps > 0 {
        warn!(
            gaps,
            total = values.len(),
            tolerance = params.tolerance,
            "Some target vertices have no source within tolerance, using fallback {}",
            params.fallback_value
        );
    }
    info!(
        field = %params.field_name,
        hits,
        gaps,
        "Sampled field onto {} target vertices",
        values.len()
    );

    mesh.set_point_field(Field::scalar(params.field_name.clone(), values.clone()));

    Ok(SampleResult {
        mesh,
        values,
        hits,
        gaps,
        clean,
    })
}

/// Source surface for closest-point queries.
///
/// Zero-area triangles are left out. `triangles[i]` is the owning cell and
/// corner indices of parry triangle `i`.
struct SurfaceIndex {
    trimesh: TriMesh,
    triangles: Vec<(usize, [u32; 3])>,
    /// Slack on the tolerance test that absorbs projection round-off.
    snap: f64,
}

impl SurfaceIndex {
    /// `None` if the source has no triangle with non-zero area.
    fn build(source: &Mesh) -> Option<Self> {
        let _section = log_perf_section("surface_index");
        let triangles: Vec<(usize, [u32; 3])> = source
            .triangle_indices()
            .filter(|&(_, t)| triangle_of(source, t).area() > 0.0)
            .collect();
        if triangles.is_empty() {
            return None;
        }

        let vertices: Vec<parry3d_f64::math::Point<f64>> = source
            .vertices
            .iter()
            .map(|v| parry3d_f64::math::Point::new(v.x, v.y, v.z))
            .collect();
        let indices: Vec<[u32; 3]> = triangles.iter().map(|&(_, t)| t).collect();
        let trimesh = TriMesh::new(vertices, indices);

        let diag = source
            .bounds()
            .map(|(min, max)| (max - min).norm())
            .unwrap_or(0.0);

        debug!(triangles = triangles.len(), "Built source surface index");
        Some(Self {
            trimesh,
            triangles,
            snap: 1e-12 * diag.max(1.0),
        })
    }

    fn sample(
        &self,
        source: &Mesh,
        field: &Field,
        support: FieldSupport,
        p: &Point3<f64>,
        tolerance: f64,
    ) -> Option<f64> {
        let query = parry3d_f64::math::Point::new(p.x, p.y, p.z);
        let (projection, feature) = self.trimesh.project_local_point_and_get_feature(&query);

        let tri_idx = match feature {
            FeatureId::Face(idx) => idx as usize,
            other => {
                debug!(?other, "Projection did not land on a face");
                return None;
            }
        };
        let &(cell, [i0, i1, i2]) = self.triangles.get(tri_idx)?;

        let q = Point3::new(projection.point.x, projection.point.y, projection.point.z);
        if (q - p).norm() > tolerance + self.snap {
            return None;
        }

        match support {
            FieldSupport::Cell => Some(field.values.scalar_at(cell)),
            FieldSupport::Point => {
                let tri = triangle_of(source, [i0, i1, i2]);
                let [u, v, w] = compute_barycentric(&q, &tri.v0, &tri.v1, &tri.v2);
                Some(
                    u * field.values.scalar_at(i0 as usize)
                        + v * field.values.scalar_at(i1 as usize)
                        + w * field.values.scalar_at(i2 as usize),
                )
            }
        }
    }
}

fn build_kdtree(points: &[Point3<f64>]) -> KdTree<f64, 3> {
    let mut kdtree = KdTree::new();
    for (i, p) in points.iter().enumerate() {
        kdtree.add(&[p.x, p.y, p.z], i as u64);
    }
    kdtree
}

/// Inverse-square-distance weighting of source points within `tolerance`.
///
/// A point at the query position wins outright; among several, the lowest
/// index.
fn inverse_distance(
    kdtree: &KdTree<f64, 3>,
    field: &Field,
    p: &Point3<f64>,
    tolerance: f64,
) -> Option<f64> {
    let neighbors = kdtree.within::<SquaredEuclidean>(&[p.x, p.y, p.z], tolerance * tolerance);

    let mut weight_sum = 0.0;
    let mut value_sum = 0.0;
    let mut exact: Option<u64> = None;

    for neighbor in &neighbors {
        if neighbor.distance < 1e-24 {
            if exact.is_none_or(|j| neighbor.item < j) {
                exact = Some(neighbor.item);
            }
            continue;
        }
        let w = 1.0 / neighbor.distance;
        weight_sum += w;
        value_sum += w * field.values.scalar_at(neighbor.item as usize);
    }

    match exact {
        Some(i) => Some(field.values.scalar_at(i as usize)),
        None if weight_sum > 0.0 => Some(value_sum / weight_sum),
        None => None,
    }
}

fn triangle_of(mesh: &Mesh, [i0, i1, i2]: [u32; 3]) -> Triangle {
    Triangle::new(
        mesh.vertices[i0 as usize],
        mesh.vertices[i1 as usize],
        mesh.vertices[i2 as usize],
    )
}

/// Barycentric coordinates of `p` in triangle (p0, p1, p2), clamped to the
/// triangle and normalized to sum to 1.
pub fn compute_barycentric(
    p: &Point3<f64>,
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
) -> [f64; 3] {
    let v0 = p1 - p0;
    let v1 = p2 - p0;
    let v2 = p - p0;

    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-20 {
        return [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];
    }

    let v = ((d11 * d20 - d01 * d21) / denom).clamp(0.0, 1.0);
    let w = ((d00 * d21 - d01 * d20) / denom).clamp(0.0, 1.0);
    let u = (1.0 - v - w).clamp(0.0, 1.0);
    let sum = u + v + w;
    [u / sum, v / sum, w / sum]
}
