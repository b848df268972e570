//! The per-folder dataset record and its persistence.
//!
//! A record is written either as one NumPy `.npy` file per array or as a
//! single JSON document `{nodes, edges, wind_pressures, wind_vector?}`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{OutputFormat, OutputLayout};
use crate::error::{MeshError, MeshResult};
use crate::graph::{Edge, MeshGraph};

/// Graph-structured record for one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    /// Node positions.
    pub nodes: Vec<[f64; 3]>,
    /// Undirected edges, smaller index first, each pair once.
    pub edges: Vec<Edge>,
    /// One pressure per node.
    #[serde(rename = "wind_pressures")]
    pub pressures: Vec<f64>,
    /// Free-stream flow vector, when the folder provides one.
    #[serde(
        rename = "wind_vector",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub flow_vector: Option<[f64; 3]>,
}

impl SimulationRecord {
    /// Build a record from a mesh graph and per-node pressures.
    ///
    /// Fails with [`MeshError::InvalidRecord`] if the parts are inconsistent.
    pub fn new(
        graph: MeshGraph,
        pressures: Vec<f64>,
        flow_vector: Option<[f64; 3]>,
    ) -> MeshResult<Self> {
        let record = Self {
            nodes: graph.nodes.iter().map(|p| [p.x, p.y, p.z]).collect(),
            edges: graph.edges,
            pressures,
            flow_vector,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check the record invariants: one pressure per node, edge endpoints
    /// in range, no self-loops, no duplicate unordered pairs, finite
    /// coordinates and flow vector.
    pub fn validate(&self) -> MeshResult<()> {
        if self.pressures.len() != self.nodes.len() {
            return Err(MeshError::invalid_record(format!(
                "{} pressures for {} nodes",
                self.pressures.len(),
                self.nodes.len()
            )));
        }
        if let Some(i) = self
            .nodes
            .iter()
            .position(|n| n.iter().any(|c| !c.is_finite()))
        {
            return Err(MeshError::invalid_record(format!(
                "node {} has a non-finite coordinate",
                i
            )));
        }

        let node_count = self.nodes.len();
        let mut seen: HashSet<Edge> = HashSet::with_capacity(self.edges.len());
        for (i, &[a, b]) in self.edges.iter().enumerate() {
            if a as usize >= node_count || b as usize >= node_count {
                return Err(MeshError::invalid_record(format!(
                    "edge {} ({}, {}) references a node outside 0..{}",
                    i, a, b, node_count
                )));
            }
            if a == b {
                return Err(MeshError::invalid_record(format!(
                    "edge {} is a self-loop on node {}",
                    i, a
                )));
            }
            if !seen.insert([a.min(b), a.max(b)]) {
                return Err(MeshError::invalid_record(format!(
                    "edge {} ({}, {}) is a duplicate",
                    i, a, b
                )));
            }
        }

        if let Some(v) = self.flow_vector {
            if v.iter().any(|c| !c.is_finite()) {
                return Err(MeshError::invalid_record("flow vector is not finite"));
            }
        }
        Ok(())
    }

    /// Write the record into `dir` according to `layout`.
    ///
    /// Returns the files written.
    pub fn write(&self, dir: &Path, layout: &OutputLayout) -> MeshResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).map_err(|e| MeshError::io_write(dir, e))?;
        match layout.format {
            OutputFormat::Arrays => self.write_arrays(dir, layout),
            OutputFormat::Json => {
                let path = dir.join(&layout.json_name);
                self.write_json(&path)?;
                Ok(vec![path])
            }
        }
    }

    /// Write the record as a JSON document.
    pub fn write_json(&self, path: &Path) -> MeshResult<()> {
        let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)
            .map_err(|e| MeshError::io_write(path, std::io::Error::other(e)))?;
        writer.flush().map_err(|e| MeshError::io_write(path, e))?;
        debug!(path = %path.display(), nodes = self.nodes.len(), "Wrote JSON record");
        Ok(())
    }

    /// Read a JSON record and check its invariants.
    pub fn read_json(path: &Path) -> MeshResult<Self> {
        let file = File::open(path).map_err(|e| MeshError::io_read(path, e))?;
        let record: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| MeshError::parse_error(path, e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Write one `.npy` file per array: nodes `<f8` (N, 3), edges `<i8`
    /// (M, 2), pressures `<f8` (N,), and the flow vector `<f8` (3,) if
    /// present.
    pub fn write_arrays(&self, dir: &Path, layout: &OutputLayout) -> MeshResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(4);

        let path = dir.join(&layout.nodes_name);
        let nodes: Vec<f64> = self.nodes.iter().flatten().copied().collect();
        write_npy_f64(&path, &[self.nodes.len(), 3], &nodes)?;
        written.push(path);

        let path = dir.join(&layout.edges_name);
        let edges: Vec<i64> = self.edges.iter().flatten().map(|&v| i64::from(v)).collect();
        write_npy_i64(&path, &[self.edges.len(), 2], &edges)?;
        written.push(path);

        let path = dir.join(&layout.pressures_name);
        write_npy_f64(&path, &[self.pressures.len()], &self.pressures)?;
        written.push(path);

        if let Some(flow) = &self.flow_vector {
            let path = dir.join(&layout.flow_vector_name);
            write_npy_f64(&path, &[3], flow)?;
            written.push(path);
        }

        debug!(dir = %dir.display(), files = written.len(), "Wrote array record");
        Ok(written)
    }
}

/// Read a flow vector stored as a JSON array of three numbers.
pub fn load_flow_vector(path: &Path) -> MeshResult<[f64; 3]> {
    let text = std::fs::read_to_string(path).map_err(|e| MeshError::io_read(path, e))?;
    let values: Vec<f64> = serde_json::from_str(&text)
        .map_err(|e| MeshError::invalid_flow_vector(path, e.to_string()))?;
    let vector: [f64; 3] = values.as_slice().try_into().map_err(|_| {
        MeshError::invalid_flow_vector(path, format!("expected 3 numbers, found {}", values.len()))
    })?;
    if vector.iter().any(|c| !c.is_finite()) {
        return Err(MeshError::invalid_flow_vector(path, "components must be finite"));
    }
    Ok(vector)
}

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const NPY_ALIGN: usize = 64;

/// Version 1.0 `.npy` header for a C-ordered array.
fn npy_header(descr: &str, shape: &[usize]) -> Vec<u8> {
    let shape = match shape {
        [n] => format!("({},)", n),
        dims => format!(
            "({})",
            dims.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        descr, shape
    );
    // magic + version + u16 length + dict + newline
    let unpadded = NPY_MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (NPY_ALIGN - unpadded % NPY_ALIGN) % NPY_ALIGN;
    dict.extend(std::iter::repeat_n(' ', padding));
    dict.push('\n');

    let mut header = Vec::with_capacity(unpadded + padding);
    header.extend_from_slice(NPY_MAGIC);
    header.extend_from_slice(&[1, 0]);
    header.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    header.extend_from_slice(dict.as_bytes());
    header
}

fn write_npy_f64(path: &Path, shape: &[usize], data: &[f64]) -> MeshResult<()> {
    write_npy(path, &npy_header("<f8", shape), data.iter().map(|v| v.to_le_bytes()))
}

fn write_npy_i64(path: &Path, shape: &[usize], data: &[i64]) -> MeshResult<()> {
    write_npy(path, &npy_header("<i8", shape), data.iter().map(|v| v.to_le_bytes()))
}

fn write_npy(
    path: &Path,
    header: &[u8],
    values: impl Iterator<Item = [u8; 8]>,
) -> MeshResult<()> {
    let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(header)
        .map_err(|e| MeshError::io_write(path, e))?;
    for bytes in values {
        writer
            .write_all(&bytes)
            .map_err(|e| MeshError::io_write(path, e))?;
    }
    writer.flush().map_err(|e| MeshError::io_write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn triangle_record() -> SimulationRecord {
        let graph = MeshGraph {
            nodes: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            edges: vec![[0, 1], [1, 2], [0, 2]],
        };
        SimulationRecord::new(graph, vec![1.0, 2.0, 3.0], Some([10.0, 0.0, 0.0])).unwrap()
    }

    /// Split an `.npy` file into its header dict and payload.
    fn read_npy(path: &Path) -> (String, Vec<u8>) {
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[..6], NPY_MAGIC);
        assert_eq!(&bytes[6..8], &[1, 0]);
        let len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + len) % NPY_ALIGN, 0);
        let dict = String::from_utf8(bytes[10..10 + len].to_vec()).unwrap();
        (dict, bytes[10 + len..].to_vec())
    }

    #[test]
    fn test_invariants_rejected() {
        let mut record = triangle_record();
        record.pressures.pop();
        assert!(matches!(record.validate(), Err(MeshError::InvalidRecord { .. })));

        let mut record = triangle_record();
        record.edges.push([1, 3]);
        assert!(record.validate().is_err());

        let mut record = triangle_record();
        record.edges.push([2, 2]);
        assert!(record.validate().is_err());

        let mut record = triangle_record();
        record.edges.push([2, 1]);
        assert!(record.validate().is_err());

        let mut record = triangle_record();
        record.flow_vector = Some([f64::NAN, 0.0, 0.0]);
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_json_keys() {
        let record = triangle_record();
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("wind_pressures").is_some());
        assert_eq!(value["wind_vector"], serde_json::json!([10.0, 0.0, 0.0]));
        assert_eq!(value["edges"][2], serde_json::json!([0, 2]));

        let mut without_flow = record;
        without_flow.flow_vector = None;
        let value = serde_json::to_value(&without_flow).unwrap();
        assert!(value.get("wind_vector").is_none());
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let record = triangle_record();
        let written = record.write(dir.path(), &OutputLayout::json()).unwrap();
        assert_eq!(written, vec![dir.path().join("record.json")]);
        assert_eq!(SimulationRecord::read_json(&written[0]).unwrap(), record);
    }

    #[test]
    fn test_read_json_checks_invariants() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"nodes": [[0,0,0],[1,0,0]], "edges": [[0,5]], "wind_pressures": [0,0]}"#,
        )
        .unwrap();
        assert!(matches!(
            SimulationRecord::read_json(&path),
            Err(MeshError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_npy_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let record = triangle_record();
        let written = record.write(dir.path(), &OutputLayout::default()).unwrap();
        assert_eq!(written.len(), 4);

        let (dict, payload) = read_npy(&dir.path().join("nodes.npy"));
        assert!(dict.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (3, 3), }"));
        assert!(dict.ends_with('\n'));
        assert_eq!(payload.len(), 9 * 8);
        assert_eq!(f64::from_le_bytes(payload[24..32].try_into().unwrap()), 1.0);

        let (dict, payload) = read_npy(&dir.path().join("edges.npy"));
        assert!(dict.contains("'descr': '<i8'"));
        assert!(dict.contains("'shape': (3, 2)"));
        let last = i64::from_le_bytes(payload[40..48].try_into().unwrap());
        assert_eq!(last, 2);

        let (dict, payload) = read_npy(&dir.path().join("wind_pressures.npy"));
        assert!(dict.contains("'shape': (3,)"));
        assert_eq!(payload.len(), 3 * 8);

        let (dict, _) = read_npy(&dir.path().join("flow_velocity.npy"));
        assert!(dict.contains("'shape': (3,)"));
    }

    #[test]
    fn test_no_flow_vector_file_without_vector() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = triangle_record();
        record.flow_vector = None;
        let written = record.write(dir.path(), &OutputLayout::default()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(!dir.path().join("flow_velocity.npy").exists());
    }

    #[test]
    fn test_empty_edges_shape() {
        let header = npy_header("<i8", &[0, 2]);
        let dict = String::from_utf8(header[10..].to_vec()).unwrap();
        assert!(dict.contains("'shape': (0, 2)"));
        assert_eq!(header.len() % NPY_ALIGN, 0);
    }

    #[test]
    fn test_load_flow_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow_velocity.json");

        std::fs::write(&path, "[12.5, 0, -1]").unwrap();
        assert_eq!(load_flow_vector(&path).unwrap(), [12.5, 0.0, -1.0]);

        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            load_flow_vector(&path),
            Err(MeshError::InvalidFlowVector { .. })
        ));

        std::fs::write(&path, "{\"x\": 1}").unwrap();
        assert!(matches!(
            load_flow_vector(&path),
            Err(MeshError::InvalidFlowVector { .. })
        ));

        assert!(matches!(
            load_flow_vector(&dir.path().join("missing.json")),
            Err(MeshError::IoRead { .. })
        ));
    }
}
