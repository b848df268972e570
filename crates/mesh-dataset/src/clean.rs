//! Mesh cleaning: merge coincident vertices, drop degenerate cells, and
//! compact the vertex array.
//!
//! Every operation keeps point and cell fields aligned with the elements
//! that survive it.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, info};

use crate::types::{Field, Mesh, Triangle};

/// Counts of what [`clean_mesh`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Vertices merged into a coincident neighbor.
    pub merged_vertices: usize,
    /// Cells dropped for having zero area or fewer than 3 distinct vertices.
    pub degenerate_cells: usize,
    /// Vertices dropped because no cell referenced them.
    pub unreferenced_vertices: usize,
}

impl CleanReport {
    /// Whether cleaning changed anything.
    pub fn is_noop(&self) -> bool {
        *self == CleanReport::default()
    }
}

/// Relative area below which a cell counts as zero-area.
const AREA_EPSILON: f64 = 1e-14;

/// Clean a mesh in place.
///
/// Vertices closer than `merge_epsilon` are merged, cells that collapse or
/// have zero area are dropped, then unreferenced vertices are removed.
pub fn clean_mesh(mesh: &mut Mesh, merge_epsilon: f64) -> CleanReport {
    let merged_vertices = weld_vertices(mesh, merge_epsilon);

    let area_threshold = mesh
        .bounds()
        .map(|(min, max)| (max - min).norm_squared() * AREA_EPSILON)
        .unwrap_or(0.0);
    let degenerate_cells = remove_degenerate_cells(mesh, area_threshold);
    let unreferenced_vertices = remove_unreferenced_vertices(mesh);

    let report = CleanReport {
        merged_vertices,
        degenerate_cells,
        unreferenced_vertices,
    };
    if !report.is_noop() {
        info!(
            merged = report.merged_vertices,
            degenerate = report.degenerate_cells,
            unreferenced = report.unreferenced_vertices,
            "Cleaned mesh: {} vertices, {} cells",
            mesh.vertex_count(),
            mesh.face_count()
        );
    }
    report
}

/// Merge vertices within `epsilon` of each other.
///
/// Each cluster collapses into its lowest index, which keeps its field
/// values. Repeated indices inside a cell are collapsed. Returns the number
/// of vertices merged; merged vertices stay in the array until
/// [`remove_unreferenced_vertices`] runs.
pub fn weld_vertices(mesh: &mut Mesh, epsilon: f64) -> usize {
    if mesh.vertices.is_empty() {
        return 0;
    }

    // A zero epsilon merges only exact duplicates.
    let cell_size = if epsilon > 0.0 { epsilon * 2.0 } else { 1.0 };

    let mut spatial_hash: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, p) in mesh.vertices.iter().enumerate() {
        spatial_hash
            .entry(pos_to_cell(p, cell_size))
            .or_default()
            .push(idx as u32);
    }

    let mut vertex_remap: Vec<u32> = (0..mesh.vertices.len() as u32).collect();
    let mut merged_count = 0;

    for (idx, p) in mesh.vertices.iter().enumerate() {
        let idx = idx as u32;
        if vertex_remap[idx as usize] != idx {
            continue;
        }

        let cell = pos_to_cell(p, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = spatial_hash.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz))
                    else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= idx || vertex_remap[other as usize] != other {
                            continue;
                        }
                        if (p - mesh.vertices[other as usize]).norm() <= epsilon {
                            vertex_remap[other as usize] = idx;
                            merged_count += 1;
                        }
                    }
                }
            }
        }
    }

    if merged_count == 0 {
        return 0;
    }

    // Resolve transitive merges (A->B, B->C => A->C)
    for i in 0..vertex_remap.len() {
        let mut target = vertex_remap[i];
        while vertex_remap[target as usize] != target {
            target = vertex_remap[target as usize];
        }
        vertex_remap[i] = target;
    }

    for face in &mut mesh.faces {
        for v in face.iter_mut() {
            *v = vertex_remap[*v as usize];
        }
        face.dedup();
        while face.len() > 1 && face.first() == face.last() {
            face.pop();
        }
    }

    debug!(
        "Welded {} vertices (epsilon = {:e})",
        merged_count, epsilon
    );

    merged_count
}

/// Remove cells with fewer than 3 distinct vertices or area at most
/// `area_threshold`. Cell fields are filtered alongside.
///
/// Returns the number of cells removed.
pub fn remove_degenerate_cells(mesh: &mut Mesh, area_threshold: f64) -> usize {
    let keep: Vec<bool> = mesh
        .faces
        .iter()
        .map(|face| {
            let mut distinct = face.clone();
            distinct.sort_unstable();
            distinct.dedup();
            if distinct.len() < 3 {
                return false;
            }
            let area: f64 = (1..face.len() - 1)
                .map(|k| {
                    Triangle::new(
                        mesh.vertices[face[0] as usize],
                        mesh.vertices[face[k] as usize],
                        mesh.vertices[face[k + 1] as usize],
                    )
                    .area()
                })
                .sum();
            area > area_threshold
        })
        .collect();

    let removed = keep.iter().filter(|&&k| !k).count();
    if removed == 0 {
        return 0;
    }

    let kept_cells: Vec<usize> = keep
        .iter()
        .enumerate()
        .filter(|&(_, &k)| k)
        .map(|(i, _)| i)
        .collect();

    let mut flags = keep.iter();
    mesh.faces.retain(|_| flags.next().copied().unwrap_or(false));
    reselect(&mut mesh.cell_data, &kept_cells);

    debug!("Removed {} degenerate cells", removed);
    removed
}

/// Remove unreferenced vertices and compact the vertex array.
///
/// Surviving vertices keep their relative order. Returns the number of
/// vertices removed.
pub fn remove_unreferenced_vertices(mesh: &mut Mesh) -> usize {
    let original_count = mesh.vertices.len();

    let mut referenced = vec![false; original_count];
    for face in &mesh.faces {
        for &v in face {
            referenced[v as usize] = true;
        }
    }

    let kept: Vec<usize> = (0..original_count).filter(|&i| referenced[i]).collect();
    if kept.len() == original_count {
        return 0;
    }

    let mut remap = vec![u32::MAX; original_count];
    for (new_idx, &old_idx) in kept.iter().enumerate() {
        remap[old_idx] = new_idx as u32;
    }
    for face in &mut mesh.faces {
        for v in face.iter_mut() {
            *v = remap[*v as usize];
        }
    }

    mesh.vertices = kept.iter().map(|&i| mesh.vertices[i]).collect();
    reselect(&mut mesh.point_data, &kept);

    let removed = original_count - kept.len();
    debug!("Removed {} unreferenced vertices", removed);
    removed
}

fn reselect(fields: &mut [Field], indices: &[usize]) {
    for field in fields {
        field.values = field.values.select(indices);
    }
}

/// Convert position to spatial hash cell.
fn pos_to_cell(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValues;

    /// Two triangles forming a square, stored as a triangle soup (6 vertices).
    fn soup_square() -> Mesh {
        let mut mesh = Mesh::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2], [3, 4, 5]],
        );
        mesh.set_point_field(Field::scalar("p", vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]));
        mesh
    }

    #[test]
    fn test_weld_merges_duplicates() {
        let mut mesh = soup_square();
        let merged = weld_vertices(&mut mesh, 1e-6);
        assert_eq!(merged, 2);
        assert_eq!(mesh.faces[1], vec![0, 2, 5]);
    }

    #[test]
    fn test_clean_soup_square() {
        let mut mesh = soup_square();
        let report = clean_mesh(&mut mesh, 1e-6);

        assert_eq!(report.merged_vertices, 2);
        assert_eq!(report.unreferenced_vertices, 2);
        assert_eq!(report.degenerate_cells, 0);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![vec![0, 1, 2], vec![0, 2, 3]]);
        // Representatives keep their own values.
        assert_eq!(
            mesh.point_field("p").unwrap().values,
            FieldValues::Scalar(vec![0.0, 1.0, 2.0, 5.0])
        );
    }

    #[test]
    fn test_zero_epsilon_merges_exact_only() {
        let mut mesh = soup_square();
        mesh.vertices[3].x += 1e-9;
        let merged = weld_vertices(&mut mesh, 0.0);
        assert_eq!(merged, 1);
    }

    #[test]
    fn test_collapsed_cell_removed() {
        let mut mesh = Mesh::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, 0.0, 1e-9),
            ],
            &[[0, 1, 2], [0, 1, 3]],
        );
        mesh.set_cell_field(Field::scalar("id", vec![10.0, 20.0]));

        let report = clean_mesh(&mut mesh, 1e-6);
        assert_eq!(report.merged_vertices, 1);
        assert_eq!(report.degenerate_cells, 1);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(
            mesh.cell_field("id").unwrap().values,
            FieldValues::Scalar(vec![10.0])
        );
    }

    #[test]
    fn test_zero_area_cell_removed() {
        let mut mesh = Mesh::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2], [0, 1, 3]],
        );
        let removed = remove_degenerate_cells(&mut mesh, 0.0);
        assert_eq!(removed, 1);
        assert_eq!(mesh.faces, vec![vec![0, 1, 3]]);
    }

    #[test]
    fn test_unreferenced_vertices_compacted_in_order() {
        let mut mesh = Mesh::from_triangles(
            vec![
                Point3::new(9.0, 9.0, 9.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[[1, 2, 3]],
        );
        mesh.set_point_field(Field::scalar("p", vec![9.0, 1.0, 2.0, 3.0]));
        assert_eq!(remove_unreferenced_vertices(&mut mesh), 1);
        assert_eq!(mesh.faces, vec![vec![0, 1, 2]]);
        assert_eq!(
            mesh.point_field("p").unwrap().values,
            FieldValues::Scalar(vec![1.0, 2.0, 3.0])
        );
    }

    #[test]
    fn test_clean_is_noop_on_clean_mesh() {
        let mut mesh = soup_square();
        clean_mesh(&mut mesh, 1e-6);
        let report = clean_mesh(&mut mesh, 1e-6);
        assert!(report.is_noop());
    }
}
