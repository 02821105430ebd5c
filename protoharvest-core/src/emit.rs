//! # Artifact Emission
//!
//! Writes a discovered [`FileSet`] to disk under an output root:
//!
//! * `<root>/<file name>`: the canonical `.proto` source of every file (see [`printer`]).
//! * `<root>/schema.lst`: every file name, one per line.
//! * `<root>/schema.routes.yaml`: the HTTP routing descriptor of every method (see [`routes`]).
//!
//! Any filesystem failure aborts the emission. Files written before the failure are left as they are.
pub mod printer;
pub mod routes;

use crate::discovery::FileSet;
use prost_reflect::FileDescriptor;
use routes::RoutingConfig;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

pub const MANIFEST_FILE: &str = "schema.lst";
pub const ROUTES_FILE: &str = "schema.routes.yaml";

/// Suffix appended to a file name to build the path of its per-file gateway configuration.
pub const GATEWAY_CONFIG_SUFFIX: &str = ".gw.yaml";

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("Failed to reset output directory '{path}': {source}")]
    PrepareRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize routing descriptor '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Failed to print '{path}': {source}")]
    Print {
        path: PathBuf,
        #[source]
        source: printer::UnsupportedSyntax,
    },
    #[error("Refusing to write '{0}': file names must be relative and stay inside the output directory")]
    UnsafePath(String),
}

/// Paths written by [`ArtifactEmitter::emit`].
#[derive(Debug, Clone, Default)]
pub struct EmitReport {
    pub schema_files: Vec<PathBuf>,
    pub manifest: PathBuf,
    pub routes: PathBuf,
}

/// Writes schema files and manifests under a single output root.
#[derive(Debug, Clone)]
pub struct ArtifactEmitter {
    root: PathBuf,
}

impl ArtifactEmitter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Removes the output root, if present, and creates it again empty.
    pub fn prepare(&self) -> Result<(), EmitError> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root).map_err(|source| EmitError::PrepareRoot {
                path: self.root.clone(),
                source,
            })?;
        }

        std::fs::create_dir_all(&self.root).map_err(|source| EmitError::PrepareRoot {
            path: self.root.clone(),
            source,
        })
    }

    /// Writes every file of `files`, then the listing and the routing descriptor.
    pub fn emit(&self, files: &FileSet) -> Result<EmitReport, EmitError> {
        let schema_files = files
            .files()
            .map(|file| self.write_schema_file(file))
            .collect::<Result<Vec<_>, _>>()?;

        let manifest = self.write_manifest(files)?;
        let routes = self.write_routes(&RoutingConfig::for_files(files), ROUTES_FILE)?;

        Ok(EmitReport {
            schema_files,
            manifest,
            routes,
        })
    }

    /// Writes the canonical source of `file` to `<root>/<file name>`.
    pub fn write_schema_file(&self, file: &FileDescriptor) -> Result<PathBuf, EmitError> {
        let path = self.resolve(file.name())?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| EmitError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        tracing::info!(path = %path.display(), "Writing file");

        let source = printer::print_file(file).map_err(|source| EmitError::Print {
            path: path.clone(),
            source,
        })?;

        std::fs::write(&path, source).map_err(|source| EmitError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }

    /// Writes the routing descriptor restricted to the services declared in `file`.
    ///
    /// # Returns
    ///
    /// The path of the descriptor relative to the root (`<file name>.gw.yaml`), as expected
    /// by `protoc` plugins running inside the root.
    pub fn write_gateway_config(&self, file: &FileDescriptor) -> Result<PathBuf, EmitError> {
        let relative = PathBuf::from(format!("{}{GATEWAY_CONFIG_SUFFIX}", file.name()));
        self.write_routes(&RoutingConfig::for_file(file), &relative.to_string_lossy())?;
        Ok(relative)
    }

    fn write_manifest(&self, files: &FileSet) -> Result<PathBuf, EmitError> {
        let path = self.root.join(MANIFEST_FILE);

        tracing::info!(path = %path.display(), "Writing index file");

        let write_err = |source| EmitError::Write {
            path: path.clone(),
            source,
        };

        let mut manifest = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(write_err)?;

        for name in files.names() {
            writeln!(manifest, "{name}").map_err(write_err)?;
        }

        Ok(path)
    }

    fn write_routes(&self, config: &RoutingConfig, name: &str) -> Result<PathBuf, EmitError> {
        let path = self.resolve(name)?;

        let yaml = config.to_yaml().map_err(|source| EmitError::Serialize {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), rules = config.rules().len(), "Writing config file");

        std::fs::write(&path, yaml).map_err(|source| EmitError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }

    /// Joins a peer-supplied file name onto the root, rejecting names that would escape it.
    fn resolve(&self, name: &str) -> Result<PathBuf, EmitError> {
        let relative = Path::new(name);

        let is_safe = !name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

        if is_safe {
            Ok(self.root.join(relative))
        } else {
            Err(EmitError::UnsafePath(name.to_string()))
        }
    }
}
