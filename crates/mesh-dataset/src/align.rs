//! Principal-axis alignment.
//!
//! The mesh is rotated about its centroid so that the directions of
//! greatest, middle and least vertex variance land on X, Y and Z. Fixed
//! corrective rotations can be applied before and after. Centroid and scale
//! are unchanged.

use nalgebra::{Matrix3, Point3, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult};
use crate::tracing_ext::OperationTimer;
use crate::types::Mesh;

/// A coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn unit(self) -> Unit<Vector3<f64>> {
        match self {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        }
    }
}

/// A fixed rotation about a coordinate axis, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRotation {
    pub axis: Axis,
    pub degrees: f64,
}

impl AxisRotation {
    pub fn new(axis: Axis, degrees: f64) -> Self {
        Self { axis, degrees }
    }

    pub fn to_rotation(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&self.axis.unit(), self.degrees.to_radians())
    }
}

/// How eigenvector signs are chosen.
///
/// An eigenvector is only defined up to sign. Either convention is followed
/// by flipping the third axis if needed so the basis is a proper rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    /// Keep whatever signs the eigen solver returns.
    Unpinned,
    /// Flip each axis so its largest-magnitude component is positive.
    #[default]
    LargestComponentPositive,
}

/// Parameters for [`align_to_principal_axes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignParams {
    /// Rotations applied, in order, before the principal-axis rotation.
    pub pre_rotations: Vec<AxisRotation>,
    /// Rotations applied, in order, after the principal-axis rotation.
    pub post_rotations: Vec<AxisRotation>,
    pub sign_convention: SignConvention,
    /// An eigenvalue at or below `degenerate_ratio * largest` counts as zero.
    pub degenerate_ratio: f64,
}

impl Default for AlignParams {
    fn default() -> Self {
        Self {
            pre_rotations: Vec::new(),
            post_rotations: Vec::new(),
            sign_convention: SignConvention::default(),
            degenerate_ratio: 1e-9,
        }
    }
}

impl AlignParams {
    /// Wind-tunnel preset: yaw 180° about Y first, then tilt −90° about X
    /// after alignment.
    pub fn wind_tunnel() -> Self {
        Self {
            pre_rotations: vec![AxisRotation::new(Axis::Y, 180.0)],
            post_rotations: vec![AxisRotation::new(Axis::X, -90.0)],
            ..Self::default()
        }
    }

    /// Validate parameters.
    pub fn validate(&self) -> MeshResult<()> {
        if !(self.degenerate_ratio >= 0.0 && self.degenerate_ratio < 1.0) {
            return Err(MeshError::invalid_config(format!(
                "degenerate_ratio must be in [0, 1), got {}",
                self.degenerate_ratio
            )));
        }
        for r in self.pre_rotations.iter().chain(&self.post_rotations) {
            if !r.degrees.is_finite() {
                return Err(MeshError::invalid_config(format!(
                    "rotation about {:?} is not finite",
                    r.axis
                )));
            }
        }
        Ok(())
    }
}

/// Principal axes of a vertex cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalAxes {
    pub centroid: Point3<f64>,
    /// Eigenvalues in descending order.
    pub eigenvalues: Vector3<f64>,
    /// Orthonormal basis with det = +1; column `i` pairs with `eigenvalues[i]`.
    pub basis: Matrix3<f64>,
    /// Some eigenvalue is (relatively) zero, so the axes are not unique.
    pub degenerate: bool,
}

impl PrincipalAxes {
    /// Rotation taking world directions into the principal frame.
    pub fn to_local(&self) -> Rotation3<f64> {
        Rotation3::from_matrix_unchecked(self.basis.transpose())
    }
}

/// Output of [`align_to_principal_axes`].
#[derive(Debug, Clone)]
pub struct AlignResult {
    pub mesh: Mesh,
    /// Axes measured after the pre-rotations.
    pub axes: PrincipalAxes,
}

/// Sample covariance of vertex positions about `centroid`.
///
/// Normalized by N−1, or by N for a single vertex.
pub fn covariance(vertices: &[Point3<f64>], centroid: &Point3<f64>) -> Matrix3<f64> {
    let mut cov = Matrix3::zeros();
    for p in vertices {
        let d = p - centroid;
        cov += d * d.transpose();
    }
    let n = vertices.len();
    let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
    cov / denom
}

/// Compute the principal axes of a mesh's vertices.
pub fn principal_axes(mesh: &Mesh, params: &AlignParams) -> MeshResult<PrincipalAxes> {
    let Some(centroid) = mesh.centroid() else {
        return Err(MeshError::empty_mesh("cannot align a mesh with no vertices"));
    };
    let cov = covariance(&mesh.vertices, &centroid);
    let eigen = cov.symmetric_eigen();

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let eigenvalues = Vector3::new(
        eigen.eigenvalues[order[0]],
        eigen.eigenvalues[order[1]],
        eigen.eigenvalues[order[2]],
    );
    let mut basis = Matrix3::from_columns(&[
        eigen.eigenvectors.column(order[0]).into_owned(),
        eigen.eigenvectors.column(order[1]).into_owned(),
        eigen.eigenvectors.column(order[2]).into_owned(),
    ]);

    if params.sign_convention == SignConvention::LargestComponentPositive {
        for mut col in basis.column_iter_mut() {
            let dominant = col.iter().copied().fold(0.0f64, |best, c| {
                if c.abs() > best.abs() { c } else { best }
            });
            if dominant < 0.0 {
                col.neg_mut();
            }
        }
    }
    if basis.determinant() < 0.0 {
        basis.column_mut(2).neg_mut();
    }

    let largest = eigenvalues[0].max(0.0);
    let near_zero = eigenvalues
        .iter()
        .filter(|&&e| e <= params.degenerate_ratio * largest)
        .count();
    let degenerate = largest == 0.0 || near_zero >= 1;

    debug!(
        "Principal axes: eigenvalues [{:.4e}, {:.4e}, {:.4e}]",
        eigenvalues[0], eigenvalues[1], eigenvalues[2]
    );

    Ok(PrincipalAxes {
        centroid,
        eigenvalues,
        basis,
        degenerate,
    })
}

/// Rotate a mesh so its principal axes line up with X, Y and Z.
///
/// Pre-rotations are applied first, then the principal-axis rotation, then
/// the post-rotations, all about the centroid. A degenerate covariance is
/// logged as a warning and the (arbitrary) axes are still applied.
pub fn align_to_principal_axes(mesh: &Mesh, params: &AlignParams) -> MeshResult<AlignResult> {
    params.validate()?;
    let _timer = OperationTimer::with_context(
        "align_to_principal_axes",
        mesh.face_count(),
        mesh.vertex_count(),
    );
    let mut aligned = mesh.clone();
    let Some(centroid) = aligned.centroid() else {
        return Err(MeshError::empty_mesh("cannot align a mesh with no vertices"));
    };

    for r in &params.pre_rotations {
        aligned.rotate_about(&r.to_rotation(), centroid);
    }

    let axes = principal_axes(&aligned, params)?;
    if axes.degenerate {
        warn!(
            eigenvalues = ?axes.eigenvalues.as_slice(),
            "Alignment degenerate: vertex covariance has rank < 3, axes are not unique"
        );
    }
    aligned.rotate_about(&axes.to_local(), centroid);

    for r in &params.post_rotations {
        aligned.rotate_about(&r.to_rotation(), centroid);
    }

    Ok(AlignResult {
        mesh: aligned,
        axes,
    })
}
