//! Connected region analysis for meshes.
//!
//! Two cells belong to the same region when they share at least one vertex.
//! Region ids are dense and assigned in order of the first cell (in original
//! cell order) that belongs to each region, so "lowest id" always means
//! "encountered first".

use tracing::{debug, info};

use crate::error::{MeshError, MeshResult};
use crate::types::{Field, Mesh};

/// Per-cell region labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionLabels {
    /// Region id of each cell.
    pub cell_region: Vec<usize>,
    /// Number of cells in each region, indexed by region id.
    pub cell_counts: Vec<usize>,
}

impl RegionLabels {
    /// Number of regions found.
    pub fn region_count(&self) -> usize {
        self.cell_counts.len()
    }

    /// Check if the mesh is fully connected (single region).
    pub fn is_connected(&self) -> bool {
        self.cell_counts.len() == 1
    }

    /// The region with the most cells; ties go to the lowest region id.
    pub fn largest(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (region, &count) in self.cell_counts.iter().enumerate() {
            if best.is_none_or(|b| count > self.cell_counts[b]) {
                best = Some(region);
            }
        }
        best
    }

    /// Cell indices of `region`, in original cell order.
    pub fn cells_in(&self, region: usize) -> Vec<usize> {
        self.cell_region
            .iter()
            .enumerate()
            .filter(|&(_, &r)| r == region)
            .map(|(cell, _)| cell)
            .collect()
    }
}

impl std::fmt::Display for RegionLabels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Connected regions: {}", self.region_count())?;
        for (region, count) in self.cell_counts.iter().enumerate() {
            writeln!(f, "  Region {}: {} cells", region, count)?;
        }
        Ok(())
    }
}

/// Label every cell with its vertex-connected region.
///
/// Flood fill over a vertex → cells incidence table, started from each
/// unlabelled cell in order.
pub fn label_regions(mesh: &Mesh) -> RegionLabels {
    let cell_count = mesh.faces.len();

    // Vertex -> incident cells in CSR layout.
    let mut offsets = vec![0usize; mesh.vertices.len() + 1];
    for face in &mesh.faces {
        for &v in face {
            offsets[v as usize + 1] += 1;
        }
    }
    for i in 1..offsets.len() {
        offsets[i] += offsets[i - 1];
    }
    let mut fill = offsets.clone();
    let mut incident = vec![0usize; offsets[mesh.vertices.len()]];
    for (cell, face) in mesh.faces.iter().enumerate() {
        for &v in face {
            incident[fill[v as usize]] = cell;
            fill[v as usize] += 1;
        }
    }

    const UNLABELLED: usize = usize::MAX;
    let mut cell_region = vec![UNLABELLED; cell_count];
    let mut vertex_seen = vec![false; mesh.vertices.len()];
    let mut cell_counts = Vec::new();
    let mut stack = Vec::new();

    for start in 0..cell_count {
        if cell_region[start] != UNLABELLED {
            continue;
        }

        let region = cell_counts.len();
        let mut count = 0usize;
        cell_region[start] = region;
        stack.push(start);

        while let Some(cell) = stack.pop() {
            count += 1;
            for &v in &mesh.faces[cell] {
                let v = v as usize;
                if vertex_seen[v] {
                    continue;
                }
                vertex_seen[v] = true;
                for &neighbor in &incident[offsets[v]..offsets[v + 1]] {
                    if cell_region[neighbor] == UNLABELLED {
                        cell_region[neighbor] = region;
                        stack.push(neighbor);
                    }
                }
            }
        }

        cell_counts.push(count);
    }

    debug!(
        "Labelled {} cells into {} region(s)",
        cell_count,
        cell_counts.len()
    );

    RegionLabels {
        cell_region,
        cell_counts,
    }
}

/// Build a new mesh from a subset of cells.
///
/// Referenced vertices keep their relative order and are renumbered densely
/// from 0. Point fields follow the kept vertices and cell fields the kept
/// cells.
pub fn extract_cells(mesh: &Mesh, cells: &[usize]) -> Mesh {
    let mut used = vec![false; mesh.vertices.len()];
    for &cell in cells {
        for &v in &mesh.faces[cell] {
            used[v as usize] = true;
        }
    }

    let mut old_to_new = vec![u32::MAX; mesh.vertices.len()];
    let mut kept_vertices = Vec::new();
    for (old, _) in used.iter().enumerate().filter(|&(_, &u)| u) {
        old_to_new[old] = kept_vertices.len() as u32;
        kept_vertices.push(old);
    }

    let select = |fields: &[Field], indices: &[usize]| -> Vec<Field> {
        fields
            .iter()
            .map(|f| Field {
                name: f.name.clone(),
                values: f.values.select(indices),
            })
            .collect()
    };

    Mesh {
        vertices: kept_vertices.iter().map(|&i| mesh.vertices[i]).collect(),
        faces: cells
            .iter()
            .map(|&cell| {
                mesh.faces[cell]
                    .iter()
                    .map(|&v| old_to_new[v as usize])
                    .collect()
            })
            .collect(),
        point_data: select(&mesh.point_data, &kept_vertices),
        cell_data: select(&mesh.cell_data, cells),
    }
}

/// Extract the largest vertex-connected region of a mesh.
///
/// Ties in cell count go to the region encountered first in cell order.
/// Fails with [`MeshError::EmptyMesh`] when the mesh has no cells.
///
/// # Example
/// ```
/// use mesh_dataset::Mesh;
/// use mesh_dataset::components::largest_connected_region;
/// use nalgebra::Point3;
///
/// let mesh = Mesh::from_triangles(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///         Point3::new(10.0, 0.0, 0.0),
///         Point3::new(11.0, 0.0, 0.0),
///         Point3::new(10.0, 1.0, 0.0),
///     ],
///     &[[0, 1, 2], [3, 4, 5]],
/// );
///
/// let region = largest_connected_region(&mesh).unwrap();
/// assert_eq!(region.face_count(), 1);
/// assert_eq!(region.vertices[0], Point3::new(0.0, 0.0, 0.0));
/// ```
pub fn largest_connected_region(mesh: &Mesh) -> MeshResult<Mesh> {
    if mesh.faces.is_empty() {
        return Err(MeshError::empty_mesh(
            "cannot select a connected region from a mesh with no cells",
        ));
    }

    let labels = label_regions(mesh);
    let Some(largest) = labels.largest() else {
        return Err(MeshError::empty_mesh("mesh has no connected regions"));
    };

    if labels.is_connected() {
        debug!("Mesh is a single region of {} cells", mesh.faces.len());
    } else {
        info!(
            "Keeping region {} ({} cells), dropping {} smaller region(s)",
            largest,
            labels.cell_counts[largest],
            labels.region_count() - 1
        );
    }

    Ok(extract_cells(mesh, &labels.cells_in(largest)))
}

/// Split a mesh into one mesh per connected region, in region id order.
pub fn split_into_regions(mesh: &Mesh) -> Vec<Mesh> {
    let labels = label_regions(mesh);
    (0..labels.region_count())
        .map(|region| extract_cells(mesh, &labels.cells_in(region)))
        .collect()
}
