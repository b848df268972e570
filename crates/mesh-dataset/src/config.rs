//! Dataset and preparation configuration.
//!
//! Both configurations serialize to TOML so a batch can be rerun with the
//! same settings. Every field has a default, so a config file only needs the
//! keys it changes:
//!
//! ```toml
//! target_mesh_name = "object.obj"
//! threads = 8
//!
//! [sampling]
//! tolerance = 0.5
//!
//! [output]
//! format = "json"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::align::AlignParams;
use crate::error::{MeshError, MeshResult};
use crate::interpolate::SampleParams;

/// How a record is written to its output folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `.npy` file per array.
    #[default]
    Arrays,
    /// A single JSON document.
    Json,
}

/// Output format and file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    pub format: OutputFormat,
    pub nodes_name: String,
    pub edges_name: String,
    pub pressures_name: String,
    pub flow_vector_name: String,
    pub json_name: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            format: OutputFormat::Arrays,
            nodes_name: "nodes.npy".to_string(),
            edges_name: "edges.npy".to_string(),
            pressures_name: "wind_pressures.npy".to_string(),
            flow_vector_name: "flow_velocity.npy".to_string(),
            json_name: "record.json".to_string(),
        }
    }
}

impl OutputLayout {
    /// JSON output with default file names.
    pub fn json() -> Self {
        Self {
            format: OutputFormat::Json,
            ..Self::default()
        }
    }

    fn file_names(&self) -> Vec<&str> {
        match self.format {
            OutputFormat::Arrays => vec![
                self.nodes_name.as_str(),
                self.edges_name.as_str(),
                self.pressures_name.as_str(),
                self.flow_vector_name.as_str(),
            ],
            OutputFormat::Json => vec![self.json_name.as_str()],
        }
    }
}

/// Settings for building dataset records from simulation folders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Mesh carrying the solver's pressure field.
    pub field_mesh_name: String,
    /// Mesh whose vertices become the record's nodes.
    pub target_mesh_name: String,
    /// Optional JSON file with the free-stream flow vector.
    pub flow_vector_name: String,
    pub sampling: SampleParams,
    /// Keep only the largest connected region of the target before sampling.
    pub keep_largest_region: bool,
    pub output: OutputLayout,
    /// Worker threads; `None` uses every core.
    pub threads: Option<usize>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            field_mesh_name: "pressure_field.vtk".to_string(),
            target_mesh_name: "object.obj".to_string(),
            flow_vector_name: "flow_velocity.json".to_string(),
            sampling: SampleParams::default(),
            keep_largest_region: false,
            output: OutputLayout::default(),
            threads: None,
        }
    }
}

impl DatasetConfig {
    /// Parse a TOML document. The result is validated.
    pub fn from_toml_str(toml_str: &str) -> MeshResult<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| MeshError::invalid_config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> MeshResult<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| MeshError::io_read(path, e))?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> MeshResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| MeshError::invalid_config(format!("cannot serialize config: {}", e)))
    }

    /// Write the configuration to a TOML file.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> MeshResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml()?).map_err(|e| MeshError::io_write(path, e))
    }

    /// Files a simulation folder must contain to be processed.
    pub fn required_files(&self) -> [&str; 2] {
        [self.field_mesh_name.as_str(), self.target_mesh_name.as_str()]
    }

    /// Check names and parameters.
    pub fn validate(&self) -> MeshResult<()> {
        let names = [
            ("field_mesh_name", self.field_mesh_name.as_str()),
            ("target_mesh_name", self.target_mesh_name.as_str()),
            ("flow_vector_name", self.flow_vector_name.as_str()),
        ];
        for (key, name) in names {
            check_file_name(key, name)?;
        }
        for name in self.output.file_names() {
            check_file_name("output", name)?;
        }
        self.sampling.validate()?;
        if self.threads == Some(0) {
            return Err(MeshError::invalid_config("threads must be at least 1"));
        }
        Ok(())
    }
}

/// Settings for the mesh preparation path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Principal-axis alignment; `None` skips alignment.
    pub align: Option<AlignParams>,
    pub keep_largest_region: bool,
    /// Merge distance for vertex welding before alignment; `None` skips cleaning.
    pub clean_epsilon: Option<f64>,
    /// Extension of the written mesh, which picks its format.
    pub output_extension: String,
    pub threads: Option<usize>,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            align: Some(AlignParams::wind_tunnel()),
            keep_largest_region: true,
            clean_epsilon: Some(1e-6),
            output_extension: "obj".to_string(),
            threads: None,
        }
    }
}

impl PrepareConfig {
    /// Parse a TOML document. The result is validated.
    pub fn from_toml_str(toml_str: &str) -> MeshResult<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| MeshError::invalid_config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MeshResult<()> {
        if let Some(align) = &self.align {
            align.validate()?;
        }
        if let Some(epsilon) = self.clean_epsilon {
            if !(epsilon.is_finite() && epsilon >= 0.0) {
                return Err(MeshError::invalid_config(format!(
                    "clean_epsilon must be a finite non-negative number, got {}",
                    epsilon
                )));
            }
        }
        let file_name = format!("mesh.{}", self.output_extension);
        match crate::io::MeshFormat::from_path(Path::new(&file_name)) {
            Some(format) if format.can_write() => {}
            _ => {
                return Err(MeshError::invalid_config(format!(
                    "cannot write meshes with extension '{}'",
                    self.output_extension
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(MeshError::invalid_config("threads must be at least 1"));
        }
        Ok(())
    }
}

fn check_file_name(key: &str, name: &str) -> MeshResult<()> {
    if matches!(name, "" | "." | "..") || name.contains(['/', '\\']) {
        return Err(MeshError::invalid_config(format!(
            "{} must be a plain file name, got '{}'",
            key, name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_folder_layout() {
        let config = DatasetConfig::default();
        assert_eq!(config.required_files(), ["pressure_field.vtk", "object.obj"]);
        assert_eq!(config.sampling.tolerance, 1.5);
        assert_eq!(config.sampling.field_name, "p");
        assert_eq!(config.output.format, OutputFormat::Arrays);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DatasetConfig::from_toml_str(
            r#"
            threads = 4

            [sampling]
            tolerance = 0.25

            [output]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.sampling.tolerance, 0.25);
        assert_eq!(config.sampling.field_name, "p");
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.json_name, "record.json");
        assert_eq!(config.target_mesh_name, "object.obj");
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = DatasetConfig::default();
        config.keep_largest_region = true;
        config.sampling.fallback_value = -1.0;
        let text = config.to_toml().unwrap();
        assert_eq!(DatasetConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for text in [
            "threads = 0",
            "target_mesh_name = \"\"",
            "field_mesh_name = \"a/b.vtk\"",
            "[sampling]\ntolerance = -2.0",
            "[output]\nformat = \"parquet\"",
        ] {
            let err = DatasetConfig::from_toml_str(text).unwrap_err();
            assert!(matches!(err, MeshError::InvalidConfig { .. }), "{}", text);
        }
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.toml");
        let config = DatasetConfig {
            output: OutputLayout::json(),
            ..DatasetConfig::default()
        };
        config.save_toml(&path).unwrap();
        assert_eq!(DatasetConfig::from_toml_file(&path).unwrap(), config);
    }

    #[test]
    fn test_prepare_config() {
        let config = PrepareConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.align, Some(AlignParams::wind_tunnel()));

        let ply = PrepareConfig::from_toml_str("output_extension = \"ply\"").unwrap();
        assert_eq!(ply.output_extension, "ply");
        assert!(ply.keep_largest_region);

        let err = PrepareConfig::from_toml_str("output_extension = \"vtk\"").unwrap_err();
        assert!(matches!(err, MeshError::InvalidConfig { .. }));
    }

    #[test]
    fn test_prepare_clean_epsilon() {
        assert_eq!(PrepareConfig::default().clean_epsilon, Some(1e-6));
        let config = PrepareConfig::from_toml_str("clean_epsilon = 0.01").unwrap();
        assert_eq!(config.clean_epsilon, Some(0.01));
        assert!(PrepareConfig::from_toml_str("clean_epsilon = -1.0").is_err());
    }

    #[test]
    fn test_dot_file_names_rejected() {
        for name in [".", "..", "", "a/b"] {
            let config = DatasetConfig {
                target_mesh_name: name.to_string(),
                ..DatasetConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(MeshError::InvalidConfig { .. })),
                "{:?}",
                name
            );
        }
        let mut config = DatasetConfig::default();
        config.output.nodes_name = "..".to_string();
        assert!(config.validate().is_err());
    }
}
