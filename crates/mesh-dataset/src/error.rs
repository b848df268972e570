//! Error types for dataset construction with rich diagnostics.
//!
//! Every error carries:
//! - A machine-readable code (`MESH-XXXX`)
//! - Optional location information (file, vertex, face)
//! - A recovery suggestion
//! - Terminal-friendly help text via miette
//!
//! # Error Codes
//!
//! - `MESH-1xxx`: I/O errors (reading, writing, parsing)
//! - `MESH-2xxx`: Mesh data errors (indices, coordinates, empty meshes)
//! - `MESH-3xxx`: Field and record errors (missing fields, broken records)
//! - `MESH-4xxx`: Format and configuration errors
//! - `MESH-5xxx`: Internal errors
//!
//! The load-error family (`IoRead`, `ParseError`, `UnsupportedFormat`,
//! `InvalidVertexIndex`, `InvalidCoordinate`) is what a loader returns for
//! unreadable or corrupt input; see [`MeshError::is_load_error`].

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mesh and dataset operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // I/O errors (1xxx)
    /// MESH-1001: Failed to read file
    IoRead = 1001,
    /// MESH-1002: Failed to write file
    IoWrite = 1002,
    /// MESH-1003: Failed to parse file format
    ParseError = 1003,

    // Mesh data errors (2xxx)
    /// MESH-2001: Face references invalid vertex index
    InvalidVertexIndex = 2001,
    /// MESH-2002: Vertex has NaN or Infinity coordinate
    InvalidCoordinate = 2002,
    /// MESH-2003: Mesh has no cells
    EmptyMesh = 2003,

    // Field and record errors (3xxx)
    /// MESH-3001: Expected field is missing
    EmptyField = 3001,
    /// MESH-3002: Field length does not match its support
    FieldLengthMismatch = 3002,
    /// MESH-3003: Flow vector file is malformed
    InvalidFlowVector = 3003,
    /// MESH-3004: Record violates its invariants
    InvalidRecord = 3004,

    // Format and configuration errors (4xxx)
    /// MESH-4001: Unsupported file format
    UnsupportedFormat = 4001,
    /// MESH-4002: Invalid configuration
    InvalidConfig = 4002,

    // Internal errors (5xxx)
    /// MESH-5001: Work on one item panicked
    Panicked = 5001,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `MESH-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IoRead => "MESH-1001",
            ErrorCode::IoWrite => "MESH-1002",
            ErrorCode::ParseError => "MESH-1003",
            ErrorCode::InvalidVertexIndex => "MESH-2001",
            ErrorCode::InvalidCoordinate => "MESH-2002",
            ErrorCode::EmptyMesh => "MESH-2003",
            ErrorCode::EmptyField => "MESH-3001",
            ErrorCode::FieldLengthMismatch => "MESH-3002",
            ErrorCode::InvalidFlowVector => "MESH-3003",
            ErrorCode::InvalidRecord => "MESH-3004",
            ErrorCode::UnsupportedFormat => "MESH-4001",
            ErrorCode::InvalidConfig => "MESH-4002",
            ErrorCode::Panicked => "MESH-5001",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Re-export the file from the producing tool.
    ReexportFile { format: Option<String> },
    /// Use a different file format.
    UseDifferentFormat { suggested: Vec<String> },
    /// Check the input data for issues.
    CheckSourceData { checks: Vec<String> },
    /// Adjust configuration values.
    AdjustParameters { parameters: Vec<(String, String)> },
    /// No automatic recovery available.
    None,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::ReexportFile { format } => {
                if let Some(fmt) = format {
                    write!(f, "Try re-exporting the file as {} from the producing tool", fmt)
                } else {
                    write!(f, "Try re-exporting the file from the producing tool")
                }
            }
            RecoverySuggestion::UseDifferentFormat { suggested } => {
                write!(f, "Try using a different format: {}", suggested.join(", "))
            }
            RecoverySuggestion::CheckSourceData { checks } => {
                write!(f, "Check the input data for: {}", checks.join(", "))
            }
            RecoverySuggestion::AdjustParameters { parameters } => {
                let params: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "Try adjusting: {}", params.join(", "))
            }
            RecoverySuggestion::None => write!(f, "No automatic recovery available"),
        }
    }
}

/// Location information for errors.
#[derive(Debug, Clone)]
pub enum MeshLocation {
    /// Error at a specific vertex.
    Vertex { index: usize },
    /// Error at a specific face.
    Face { index: usize },
    /// Error in a file.
    File { path: PathBuf },
}

impl std::fmt::Display for MeshLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshLocation::Vertex { index } => write!(f, "vertex {}", index),
            MeshLocation::Face { index } => write!(f, "face {}", index),
            MeshLocation::File { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Errors that can occur while loading meshes and building dataset records.
#[derive(Debug, Error, Diagnostic)]
pub enum MeshError {
    /// Error reading from a file.
    #[error("failed to read {path}")]
    #[diagnostic(
        code(mesh::io::read),
        help("Check that the file exists and is readable. Try: ls -la {}", path.display())
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing to a file.
    #[error("failed to write {path}")]
    #[diagnostic(
        code(mesh::io::write),
        help("Check that the output directory exists and is writable")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a file.
    #[error("failed to parse {path}: {details}")]
    #[diagnostic(
        code(mesh::parse::error),
        help("The file may be corrupted or in an unsupported variant of its format.")
    )]
    ParseError { path: PathBuf, details: String },

    /// Unsupported file format.
    #[error("unsupported mesh format: {extension:?}")]
    #[diagnostic(
        code(mesh::format::unsupported),
        help("Supported formats: OBJ, STL, PLY, VTK (legacy), VTP, VTU")
    )]
    UnsupportedFormat { extension: Option<String> },

    /// Mesh has nothing to work on.
    #[error("mesh is empty: {details}")]
    #[diagnostic(
        code(mesh::validation::empty),
        help("Check that the producing tool exported geometry.")
    )]
    EmptyMesh { details: String },

    /// Invalid vertex index in cell data.
    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, but mesh only has {vertex_count} vertices"
    )]
    #[diagnostic(
        code(mesh::validation::vertex_index),
        help("The file is structurally corrupt. Re-export it from the producing tool.")
    )]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    /// Invalid coordinate value (NaN or Infinity).
    #[error("invalid coordinate at vertex {vertex_index}: {coordinate} is {value}")]
    #[diagnostic(
        code(mesh::validation::coordinate),
        help("Check the solver output for numerical blow-up.")
    )]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    /// Expected field is missing on the source mesh.
    #[error("mesh has no field named '{name}' (available: {available:?})")]
    #[diagnostic(
        code(mesh::field::missing),
        help("Set `sampling.field_name` to one of the available fields.")
    )]
    EmptyField { name: String, available: Vec<String> },

    /// Field array length does not match the vertex or cell count.
    #[error("field '{name}' has {actual} values, expected {expected}")]
    #[diagnostic(code(mesh::field::length))]
    FieldLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Flow vector file could not be interpreted.
    #[error("invalid flow vector in {path}: {details}")]
    #[diagnostic(
        code(mesh::flow::invalid),
        help("The flow vector file must contain a JSON array of three numbers, e.g. [30.0, 0.0, 0.0]")
    )]
    InvalidFlowVector { path: PathBuf, details: String },

    /// A simulation record violates its invariants.
    #[error("invalid simulation record: {details}")]
    #[diagnostic(code(mesh::record::invalid))]
    InvalidRecord { details: String },

    /// Invalid configuration value.
    #[error("invalid configuration: {details}")]
    #[diagnostic(code(mesh::config::invalid))]
    InvalidConfig { details: String },

    /// Processing one batch item panicked.
    #[error("processing {item} panicked: {details}")]
    #[diagnostic(
        code(mesh::internal::panic),
        help("This is a bug. The other items in the batch were not affected.")
    )]
    Panicked { item: String, details: String },
}

impl MeshError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeshError::IoRead { .. } => ErrorCode::IoRead,
            MeshError::IoWrite { .. } => ErrorCode::IoWrite,
            MeshError::ParseError { .. } => ErrorCode::ParseError,
            MeshError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            MeshError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            MeshError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            MeshError::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            MeshError::EmptyField { .. } => ErrorCode::EmptyField,
            MeshError::FieldLengthMismatch { .. } => ErrorCode::FieldLengthMismatch,
            MeshError::InvalidFlowVector { .. } => ErrorCode::InvalidFlowVector,
            MeshError::InvalidRecord { .. } => ErrorCode::InvalidRecord,
            MeshError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            MeshError::Panicked { .. } => ErrorCode::Panicked,
        }
    }

    /// Whether this error means the input could not be loaded at all.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            MeshError::IoRead { .. }
                | MeshError::ParseError { .. }
                | MeshError::UnsupportedFormat { .. }
                | MeshError::InvalidVertexIndex { .. }
                | MeshError::InvalidCoordinate { .. }
                | MeshError::FieldLengthMismatch { .. }
        )
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            MeshError::IoRead { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["file exists".into(), "file permissions".into()],
            },
            MeshError::IoWrite { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["output directory exists".into(), "write permissions".into()],
            },
            MeshError::ParseError { .. } | MeshError::InvalidVertexIndex { .. } => {
                RecoverySuggestion::ReexportFile {
                    format: Some("OBJ or legacy VTK".into()),
                }
            }
            MeshError::UnsupportedFormat { .. } => RecoverySuggestion::UseDifferentFormat {
                suggested: vec!["OBJ".into(), "STL".into(), "PLY".into(), "VTK".into()],
            },
            MeshError::EmptyMesh { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["mesh has cells".into(), "solver finished".into()],
            },
            MeshError::InvalidCoordinate { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["coordinate values".into(), "solver convergence".into()],
            },
            MeshError::EmptyField { .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![("sampling.field_name".into(), "an available field".into())],
            },
            MeshError::FieldLengthMismatch { .. } => RecoverySuggestion::ReexportFile {
                format: None,
            },
            MeshError::InvalidFlowVector { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["flow vector is a JSON array of 3 numbers".into()],
            },
            MeshError::InvalidRecord { .. } | MeshError::Panicked { .. } => {
                RecoverySuggestion::None
            }
            MeshError::InvalidConfig { .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![("configuration file".into(), "see the error message".into())],
            },
        }
    }

    /// Returns location information if available.
    pub fn location(&self) -> Option<MeshLocation> {
        match self {
            MeshError::InvalidVertexIndex { face_index, .. } => {
                Some(MeshLocation::Face { index: *face_index })
            }
            MeshError::InvalidCoordinate { vertex_index, .. } => Some(MeshLocation::Vertex {
                index: *vertex_index,
            }),
            MeshError::IoRead { path, .. }
            | MeshError::IoWrite { path, .. }
            | MeshError::ParseError { path, .. }
            | MeshError::InvalidFlowVector { path, .. } => {
                Some(MeshLocation::File { path: path.clone() })
            }
            _ => None,
        }
    }

    // Constructor helpers for common error patterns

    /// Create an IoRead error.
    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshError::IoRead {
            path: path.into(),
            source,
        }
    }

    /// Create an IoWrite error.
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshError::IoWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a ParseError.
    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        MeshError::ParseError {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Create an EmptyMesh error.
    pub fn empty_mesh(details: impl Into<String>) -> Self {
        MeshError::EmptyMesh {
            details: details.into(),
        }
    }

    /// Create an InvalidVertexIndex error.
    pub fn invalid_vertex_index(face_index: usize, vertex_index: u32, vertex_count: usize) -> Self {
        MeshError::InvalidVertexIndex {
            face_index,
            vertex_index,
            vertex_count,
        }
    }

    /// Create an EmptyField error.
    pub fn empty_field(name: impl Into<String>, available: Vec<String>) -> Self {
        MeshError::EmptyField {
            name: name.into(),
            available,
        }
    }

    /// Create an InvalidFlowVector error.
    pub fn invalid_flow_vector(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        MeshError::InvalidFlowVector {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Create an InvalidRecord error.
    pub fn invalid_record(details: impl Into<String>) -> Self {
        MeshError::InvalidRecord {
            details: details.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(details: impl Into<String>) -> Self {
        MeshError::InvalidConfig {
            details: details.into(),
        }
    }

    /// Create a Panicked error from a caught panic payload.
    pub fn panicked(item: impl Into<String>, payload: &(dyn std::any::Any + Send)) -> Self {
        let details = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        MeshError::Panicked {
            item: item.into(),
            details,
        }
    }

    /// Create an UnsupportedFormat error.
    pub fn unsupported_format(extension: Option<String>) -> Self {
        MeshError::UnsupportedFormat { extension }
    }
}

/// Issues collected during mesh validation.
///
/// Unlike `MeshError`, these may be warnings, and several can be collected
/// without stopping validation.
#[derive(Debug, Clone)]
pub enum ValidationIssue {
    /// Face references a vertex index that doesn't exist.
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },
    /// Vertex has NaN coordinate.
    NaNCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
    },
    /// Vertex has infinite coordinate.
    InfiniteCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },
    /// Face has fewer than three distinct vertices.
    DegenerateFace { face_index: usize },
    /// Field array has the wrong length for its support.
    FieldLength {
        name: String,
        expected: usize,
        actual: usize,
    },
}

impl ValidationIssue {
    /// Returns a severity level for the issue.
    pub fn severity(&self) -> IssueSeverity {
        match self {
            ValidationIssue::InvalidVertexIndex { .. } => IssueSeverity::Error,
            ValidationIssue::NaNCoordinate { .. } => IssueSeverity::Error,
            ValidationIssue::InfiniteCoordinate { .. } => IssueSeverity::Error,
            ValidationIssue::FieldLength { .. } => IssueSeverity::Error,
            ValidationIssue::DegenerateFace { .. } => IssueSeverity::Warning,
        }
    }

    /// Returns an error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationIssue::InvalidVertexIndex { .. } => "MESH-2001",
            ValidationIssue::NaNCoordinate { .. } => "MESH-2002",
            ValidationIssue::InfiniteCoordinate { .. } => "MESH-2002",
            ValidationIssue::DegenerateFace { .. } => "MESH-2005",
            ValidationIssue::FieldLength { .. } => "MESH-3002",
        }
    }
}

/// Severity levels for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IssueSeverity {
    /// Informational, no action needed.
    Info,
    /// Warning, mesh may have issues.
    Warning,
    /// Error, mesh is invalid.
    Error,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::InvalidVertexIndex {
                face_index,
                vertex_index,
                vertex_count,
            } => write!(
                f,
                "face {} references vertex {}, but mesh only has {} vertices",
                face_index, vertex_index, vertex_count
            ),
            ValidationIssue::NaNCoordinate {
                vertex_index,
                coordinate,
            } => write!(f, "vertex {} has NaN {} coordinate", vertex_index, coordinate),
            ValidationIssue::InfiniteCoordinate {
                vertex_index,
                coordinate,
                value,
            } => write!(
                f,
                "vertex {} has infinite {} coordinate ({})",
                vertex_index, coordinate, value
            ),
            ValidationIssue::DegenerateFace { face_index } => {
                write!(f, "face {} has fewer than 3 distinct vertices", face_index)
            }
            ValidationIssue::FieldLength {
                name,
                expected,
                actual,
            } => write!(
                f,
                "field '{}' has {} values, expected {}",
                name, actual, expected
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = MeshError::invalid_vertex_index(5, 100, 50);
        assert_eq!(err.code(), ErrorCode::InvalidVertexIndex);
        assert_eq!(err.code().as_str(), "MESH-2001");

        let err = MeshError::empty_field("p", vec!["U".into()]);
        assert_eq!(err.code().to_string(), "MESH-3001");
    }

    #[test]
    fn test_load_error_family() {
        assert!(MeshError::parse_error("a.vtk", "bad header").is_load_error());
        assert!(MeshError::unsupported_format(Some("xyz".into())).is_load_error());
        assert!(MeshError::invalid_vertex_index(0, 9, 3).is_load_error());
        assert!(!MeshError::empty_mesh("no cells").is_load_error());
        assert!(!MeshError::empty_field("p", Vec::new()).is_load_error());
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = MeshError::empty_field("p", vec!["pressure".into()]);
        match err.recovery_suggestion() {
            RecoverySuggestion::AdjustParameters { parameters } => {
                assert_eq!(parameters[0].0, "sampling.field_name");
            }
            other => panic!("Expected AdjustParameters suggestion, got {:?}", other),
        }
    }

    #[test]
    fn test_location_info() {
        let err = MeshError::invalid_vertex_index(5, 100, 50);
        match err.location() {
            Some(MeshLocation::Face { index }) => assert_eq!(index, 5),
            other => panic!("Expected Face location, got {:?}", other),
        }

        let err = MeshError::invalid_flow_vector("sim/flow_velocity.json", "not an array");
        assert!(matches!(err.location(), Some(MeshLocation::File { .. })));
    }

    #[test]
    fn test_error_display() {
        let err = MeshError::invalid_vertex_index(5, 100, 50);
        let display = format!("{}", err);
        assert!(display.contains("face 5"));
        assert!(display.contains("vertex 100"));
        assert!(display.contains("50 vertices"));

        let err = MeshError::empty_field("p", vec!["U".into(), "k".into()]);
        let display = err.to_string();
        assert!(display.contains("'p'"));
        assert!(display.contains("\"U\""));
    }

    #[test]
    fn test_validation_issue_severity() {
        let issue = ValidationIssue::DegenerateFace { face_index: 0 };
        assert_eq!(issue.severity(), IssueSeverity::Warning);

        let issue = ValidationIssue::InvalidVertexIndex {
            face_index: 0,
            vertex_index: 100,
            vertex_count: 50,
        };
        assert_eq!(issue.severity(), IssueSeverity::Error);
    }
}
