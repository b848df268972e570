//! Wireframe extraction: nodes and unique undirected edges of a mesh.

use hashbrown::HashSet;
use nalgebra::Point3;
use tracing::debug;

use crate::types::Mesh;

/// An undirected edge stored with the smaller vertex index first.
pub type Edge = [u32; 2];

/// Nodes and edges of a mesh wireframe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGraph {
    /// Vertex positions, in mesh order.
    pub nodes: Vec<Point3<f64>>,
    /// Unique undirected edges in first-occurrence order.
    pub edges: Vec<Edge>,
}

impl MeshGraph {
    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of edges incident to each node.
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.nodes.len()];
        for &[a, b] in &self.edges {
            degrees[a as usize] += 1;
            degrees[b as usize] += 1;
        }
        degrees
    }
}

/// Unique undirected edges over every cell boundary.
///
/// Each cell contributes the closed loop `v0-v1, v1-v2, ..., vn-v0`. Edges
/// appear in the order they are first met while walking cells in order, with
/// the smaller index first. Repeated consecutive indices never produce a
/// self-loop.
pub fn extract_edges(mesh: &Mesh) -> Vec<Edge> {
    let mut seen: HashSet<Edge> = HashSet::with_capacity(mesh.faces.len() * 2);
    let mut edges = Vec::with_capacity(mesh.faces.len() * 2);

    for face in &mesh.faces {
        let n = face.len();
        if n < 2 {
            continue;
        }
        // A two-vertex cell is a line, not a loop.
        let loop_len = if n == 2 { 1 } else { n };
        for i in 0..loop_len {
            let a = face[i];
            let b = face[(i + 1) % n];
            if a == b {
                continue;
            }
            let edge = [a.min(b), a.max(b)];
            if seen.insert(edge) {
                edges.push(edge);
            }
        }
    }

    debug!(
        cells = mesh.faces.len(),
        edges = edges.len(),
        "Extracted unique edges"
    );
    edges
}

/// Nodes (vertices in order) and unique edges of `mesh`.
///
/// ```
/// use mesh_dataset::Mesh;
/// use mesh_dataset::graph::extract_graph;
/// use nalgebra::Point3;
///
/// let mesh = Mesh::from_triangles(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ],
///     &[[0, 1, 2]],
/// );
/// let graph = extract_graph(&mesh);
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.edges, vec![[0, 1], [1, 2], [0, 2]]);
/// ```
pub fn extract_graph(mesh: &Mesh) -> MeshGraph {
    MeshGraph {
        nodes: mesh.vertices.clone(),
        edges: extract_edges(mesh),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Mesh {
        Mesh::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_single_triangle() {
        let mesh = Mesh::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[[2, 0, 1]],
        );
        let graph = extract_graph(&mesh);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edges, vec![[0, 2], [0, 1], [1, 2]]);
    }

    #[test]
    fn test_shared_edge_once() {
        let graph = extract_graph(&square());
        assert_eq!(graph.edge_count(), 5);
        assert_eq!(graph.edges, vec![[0, 1], [1, 2], [0, 2], [2, 3], [0, 3]]);
        assert_eq!(graph.degrees(), vec![3, 2, 3, 2]);
    }

    #[test]
    fn test_quad_gives_four_edges() {
        let mut mesh = Mesh::new();
        mesh.vertices = square().vertices;
        mesh.faces = vec![vec![0, 1, 2, 3]];
        assert_eq!(extract_edges(&mesh), vec![[0, 1], [1, 2], [2, 3], [0, 3]]);
    }

    #[test]
    fn test_no_self_loops_from_repeated_indices() {
        let mut mesh = Mesh::new();
        mesh.vertices = square().vertices;
        mesh.faces = vec![vec![0, 0, 1, 2], vec![3, 3]];
        let edges = extract_edges(&mesh);
        assert!(edges.iter().all(|&[a, b]| a < b));
        assert_eq!(edges, vec![[0, 1], [1, 2], [0, 2]]);
    }

    #[test]
    fn test_line_cell() {
        let mut mesh = Mesh::new();
        mesh.vertices = square().vertices;
        mesh.faces = vec![vec![3, 1]];
        assert_eq!(extract_edges(&mesh), vec![[1, 3]]);
    }

    #[test]
    fn test_empty_mesh() {
        let graph = extract_graph(&Mesh::new());
        assert_eq!(graph, MeshGraph::default());
    }
}
