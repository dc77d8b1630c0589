use crate::error::ConfigError;
use crate::polygonize::{PolygonSet, PolygonizerConfig};
use crate::writer::{DataWriter, IfExists, VectorDatabaseOptions, VectorFileDataWriter, VectorFormat};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct PolygonizeToolConfig {
    pub inputs: Vec<InputConfig>,
    #[serde(default)]
    pub polygonizer: PolygonizerConfig,
    pub output: SinkConfig,
    /// Worker threads; unset or 1 runs inline.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_true")]
    pub convert_to_world_coords: bool,
    #[serde(default)]
    pub report_json: Option<PathBuf>,
}

/// One probability image, optionally with its crossfield image.
#[derive(Debug, Deserialize)]
pub struct InputConfig {
    pub seg: PathBuf,
    #[serde(default)]
    pub crossfield: Option<PathBuf>,
    /// Unit name; defaults to the file stem of `seg`.
    #[serde(default)]
    pub name: Option<String>,
}

impl InputConfig {
    pub fn unit_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.seg
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.seg.display().to_string())
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    VectorFile {
        /// May contain `{name}`.
        path: String,
        #[serde(default)]
        crs: Option<String>,
        #[serde(default)]
        format: VectorFormat,
    },
    VectorDatabase {
        host: String,
        #[serde(default = "default_port")]
        port: u16,
        user: String,
        #[serde(default)]
        password: String,
        database: String,
        table_name: String,
        #[serde(default = "default_geometry_column")]
        geometry_column: String,
        #[serde(default)]
        if_exists: IfExists,
        crs: String,
    },
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    5432
}

fn default_geometry_column() -> String {
    "geom".to_string()
}

impl SinkConfig {
    pub fn build_writer(&self) -> Result<Arc<dyn DataWriter<PolygonSet>>, ConfigError> {
        match self {
            Self::VectorFile { path, crs, format } => Ok(Arc::new(VectorFileDataWriter::new(
                path.clone(),
                crs.clone(),
                *format,
            ))),
            Self::VectorDatabase { .. } => self.build_database_writer(),
        }
    }

    pub fn database_options(&self) -> Option<VectorDatabaseOptions> {
        match self {
            Self::VectorDatabase {
                table_name,
                geometry_column,
                if_exists,
                crs,
                ..
            } => Some(VectorDatabaseOptions {
                table_name: table_name.clone(),
                geometry_column: geometry_column.clone(),
                if_exists: *if_exists,
                crs: crs.clone(),
            }),
            Self::VectorFile { .. } => None,
        }
    }

    #[cfg(feature = "postgis")]
    fn build_database_writer(&self) -> Result<Arc<dyn DataWriter<PolygonSet>>, ConfigError> {
        use crate::writer::database::PostgisConnector;
        use crate::writer::VectorDatabaseDataWriter;

        match (self, self.database_options()) {
            (
                Self::VectorDatabase {
                    host,
                    port,
                    user,
                    password,
                    database,
                    ..
                },
                Some(options),
            ) => {
                let connector = PostgisConnector::new(host, *port, user, password, database);
                Ok(Arc::new(VectorDatabaseDataWriter::new(
                    Arc::new(connector),
                    options,
                )))
            }
            _ => Err(ConfigError::invalid("output.kind", "not a database sink")),
        }
    }

    #[cfg(not(feature = "postgis"))]
    fn build_database_writer(&self) -> Result<Arc<dyn DataWriter<PolygonSet>>, ConfigError> {
        Err(ConfigError::invalid(
            "output.kind",
            "vector_database requires building with the `postgis` feature",
        ))
    }
}

impl PolygonizeToolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inputs.is_empty() {
            return Err(ConfigError::invalid("inputs", "at least one input is required"));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::invalid("workers", "must be at least 1"));
        }
        self.polygonizer.validate()
    }
}

pub fn load_config(path: &Path) -> Result<PolygonizeToolConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: PolygonizeToolConfig =
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}
