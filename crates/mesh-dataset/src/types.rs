//! Core mesh data types.

use nalgebra::{Point3, Rotation3, Vector3};
use serde::Serialize;

/// Which element array a field is aligned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSupport {
    /// One value per vertex.
    Point,
    /// One value per cell.
    Cell,
}

impl std::fmt::Display for FieldSupport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldSupport::Point => write!(f, "point"),
            FieldSupport::Cell => write!(f, "cell"),
        }
    }
}

/// Values of a named field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    /// One scalar per element.
    Scalar(Vec<f64>),
    /// One 3-vector per element.
    Vector(Vec<Vector3<f64>>),
}

impl FieldValues {
    /// Number of elements the field covers.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Scalar(v) => v.len(),
            FieldValues::Vector(v) => v.len(),
        }
    }

    /// Check if the field has no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of components per element (1 or 3).
    #[inline]
    pub fn components(&self) -> usize {
        match self {
            FieldValues::Scalar(_) => 1,
            FieldValues::Vector(_) => 3,
        }
    }

    /// Borrow as scalars, if this is a scalar field.
    pub fn as_scalar(&self) -> Option<&[f64]> {
        match self {
            FieldValues::Scalar(v) => Some(v),
            FieldValues::Vector(_) => None,
        }
    }

    /// Scalar view of element `i`: the value itself, or the magnitude of a vector.
    #[inline]
    pub fn scalar_at(&self, i: usize) -> f64 {
        match self {
            FieldValues::Scalar(v) => v[i],
            FieldValues::Vector(v) => v[i].norm(),
        }
    }

    /// Gather the values at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> FieldValues {
        match self {
            FieldValues::Scalar(v) => FieldValues::Scalar(indices.iter().map(|&i| v[i]).collect()),
            FieldValues::Vector(v) => FieldValues::Vector(indices.iter().map(|&i| v[i]).collect()),
        }
    }
}

/// A named array of per-vertex or per-cell values.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub values: FieldValues,
}

impl Field {
    /// Create a scalar field.
    pub fn scalar(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: FieldValues::Scalar(values),
        }
    }

    /// Create a vector field.
    pub fn vector(name: impl Into<String>, values: Vec<Vector3<f64>>) -> Self {
        Self {
            name: name.into(),
            values: FieldValues::Vector(values),
        }
    }
}

/// A polygonal mesh with optional point and cell fields.
///
/// Cells are polygons of three or more vertex indices. Point fields are
/// aligned 1:1 with `vertices` and cell fields with `faces`.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<Point3<f64>>,

    /// Polygonal cells as indices into the vertex array.
    pub faces: Vec<Vec<u32>>,

    /// Fields with one value per vertex.
    pub point_data: Vec<Field>,

    /// Fields with one value per cell.
    pub cell_data: Vec<Field>,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            point_data: Vec::new(),
            cell_data: Vec::new(),
        }
    }

    /// Build a mesh from positions and triangles.
    pub fn from_triangles(vertices: Vec<Point3<f64>>, triangles: &[[u32; 3]]) -> Self {
        Self {
            vertices,
            faces: triangles.iter().map(|t| t.to_vec()).collect(),
            point_data: Vec::new(),
            cell_data: Vec::new(),
        }
    }

    /// Number of vertices in the mesh.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of cells in the mesh.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if mesh is empty (no vertices or cells).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Compute the axis-aligned bounding box.
    /// Returns (min_corner, max_corner) or None if mesh has no vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        let mut min = first;
        let mut max = first;

        for p in &self.vertices[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some((min, max))
    }

    /// Mean of all vertex positions, or None if there are none.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum: Vector3<f64> = self.vertices.iter().map(|p| p.coords).sum();
        Some(Point3::from(sum / self.vertices.len() as f64))
    }

    /// Fan-triangulate every cell.
    ///
    /// Yields `(cell_index, [i0, i1, i2])` for each triangle. Cells with
    /// fewer than three indices yield nothing.
    pub fn triangle_indices(&self) -> impl Iterator<Item = (usize, [u32; 3])> + '_ {
        self.faces.iter().enumerate().flat_map(|(cell, face)| {
            let n = if face.len() >= 3 { face.len() - 2 } else { 0 };
            (0..n).map(move |k| (cell, [face[0], face[k + 1], face[k + 2]]))
        })
    }

    /// Iterate over fan triangles with concrete vertex positions.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.triangle_indices().map(|(_, [i0, i1, i2])| Triangle {
            v0: self.vertices[i0 as usize],
            v1: self.vertices[i1 as usize],
            v2: self.vertices[i2 as usize],
        })
    }

    /// Total area of all cells.
    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|tri| tri.area()).sum()
    }

    /// Look up a point field by name.
    pub fn point_field(&self, name: &str) -> Option<&Field> {
        self.point_data.iter().find(|f| f.name == name)
    }

    /// Look up a cell field by name.
    pub fn cell_field(&self, name: &str) -> Option<&Field> {
        self.cell_data.iter().find(|f| f.name == name)
    }

    /// Look up a field by name, preferring point data over cell data.
    pub fn field(&self, name: &str) -> Option<(FieldSupport, &Field)> {
        self.point_field(name)
            .map(|f| (FieldSupport::Point, f))
            .or_else(|| self.cell_field(name).map(|f| (FieldSupport::Cell, f)))
    }

    /// Names of all fields, point data first.
    pub fn field_names(&self) -> Vec<String> {
        self.point_data
            .iter()
            .chain(self.cell_data.iter())
            .map(|f| f.name.clone())
            .collect()
    }

    /// Add or replace a point field.
    pub fn set_point_field(&mut self, field: Field) {
        upsert(&mut self.point_data, field);
    }

    /// Add or replace a cell field.
    pub fn set_cell_field(&mut self, field: Field) {
        upsert(&mut self.cell_data, field);
    }

    /// Translate mesh by the given vector.
    pub fn translate(&mut self, offset: Vector3<f64>) {
        for p in &mut self.vertices {
            *p += offset;
        }
    }

    /// Rotate the mesh about `center`.
    ///
    /// Vector fields are rotated along with the geometry.
    pub fn rotate_about(&mut self, rotation: &Rotation3<f64>, center: Point3<f64>) {
        for p in &mut self.vertices {
            *p = center + rotation * (*p - center);
        }
        for field in self.point_data.iter_mut().chain(self.cell_data.iter_mut()) {
            if let FieldValues::Vector(values) = &mut field.values {
                for v in values.iter_mut() {
                    *v = rotation * *v;
                }
            }
        }
    }
}

fn upsert(fields: &mut Vec<Field>, field: Field) {
    match fields.iter_mut().find(|f| f.name == field.name) {
        Some(existing) => *existing = field,
        None => fields.push(field),
    }
}

/// A triangle with concrete vertex positions.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Compute the (unnormalized) face normal via cross product.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        e1.cross(&e2)
    }

    /// Compute the area of the triangle.
    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Compute the centroid (center of mass).
    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Check if the triangle has (near) zero area relative to its size.
    pub fn is_degenerate(&self, epsilon: f64) -> bool {
        let longest = (self.v1 - self.v0)
            .norm()
            .max((self.v2 - self.v1).norm())
            .max((self.v0 - self.v2).norm());
        if longest < epsilon {
            return true;
        }
        // Height over the longest edge.
        2.0 * self.area() / longest < epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    fn unit_square() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        mesh.faces = vec![vec![0, 1, 2, 3]];
        mesh
    }

    #[test]
    fn test_quad_fan_triangulation() {
        let mesh = unit_square();
        let tris: Vec<_> = mesh.triangle_indices().collect();
        assert_eq!(tris, vec![(0, [0, 1, 2]), (0, [0, 2, 3])]);
        assert!(approx_eq(mesh.surface_area(), 1.0));
    }

    #[test]
    fn test_short_cell_yields_no_triangles() {
        let mut mesh = unit_square();
        mesh.faces = vec![vec![0, 1]];
        assert_eq!(mesh.triangle_indices().count(), 0);
    }

    #[test]
    fn test_mesh_bounds_and_centroid() {
        let mesh = unit_square();
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 0.0));

        let c = mesh.centroid().unwrap();
        assert!(approx_eq(c.x, 0.5) && approx_eq(c.y, 0.5));

        assert!(Mesh::new().bounds().is_none());
        assert!(Mesh::new().centroid().is_none());
    }

    #[test]
    fn test_field_lookup_prefers_point_data() {
        let mut mesh = unit_square();
        mesh.set_cell_field(Field::scalar("p", vec![7.0]));
        assert_eq!(mesh.field("p").unwrap().0, FieldSupport::Cell);

        mesh.set_point_field(Field::scalar("p", vec![1.0; 4]));
        assert_eq!(mesh.field("p").unwrap().0, FieldSupport::Point);
        assert_eq!(mesh.field_names(), vec!["p".to_string(), "p".to_string()]);
        assert!(mesh.field("U").is_none());
    }

    #[test]
    fn test_set_field_replaces_existing() {
        let mut mesh = unit_square();
        mesh.set_point_field(Field::scalar("p", vec![1.0; 4]));
        mesh.set_point_field(Field::scalar("p", vec![2.0; 4]));
        assert_eq!(mesh.point_data.len(), 1);
        assert_eq!(mesh.point_field("p").unwrap().values.scalar_at(0), 2.0);
    }

    #[test]
    fn test_field_select() {
        let values = FieldValues::Scalar(vec![10.0, 11.0, 12.0]);
        assert_eq!(values.select(&[2, 0]), FieldValues::Scalar(vec![12.0, 10.0]));

        let vectors = FieldValues::Vector(vec![Vector3::new(3.0, 4.0, 0.0)]);
        assert_eq!(vectors.components(), 3);
        assert!(approx_eq(vectors.scalar_at(0), 5.0));
        assert!(vectors.as_scalar().is_none());
    }

    #[test]
    fn test_rotate_about_center_keeps_center() {
        let mut mesh = unit_square();
        mesh.set_point_field(Field::vector("U", vec![Vector3::x(); 4]));
        let center = mesh.centroid().unwrap();
        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
        mesh.rotate_about(&rot, center);

        let c = mesh.centroid().unwrap();
        assert!(approx_eq(c.x, center.x) && approx_eq(c.y, center.y));

        match &mesh.point_field("U").unwrap().values {
            FieldValues::Vector(v) => assert!((v[0] - Vector3::y()).norm() < 1e-10),
            other => panic!("expected vector field, got {:?}", other),
        }
    }

    #[test]
    fn test_triangle_degenerate() {
        let good = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert!(!good.is_degenerate(1e-9));
        assert!(approx_eq(good.area(), 0.5));

        let collinear = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        assert!(collinear.is_degenerate(1e-9));
    }
}
