//! # Compiler Driver
//!
//! Runs `protoc` over an emitted output root. Two kinds of invocations are supported:
//!
//! 1. **[`ProtocDriver::compile`]**: compiles every emitted file with the configured plugin outputs
//!    (Go messages and gRPC stubs by default).
//! 2. **[`ProtocDriver::generate_gateway`]**: runs the `grpc-gateway` and `openapiv2` plugins for a
//!    single service file, configured through its HTTP routing descriptor.
//!
//! Invocations always run inside the output root, one at a time. A non-zero exit status is an
//! error carrying the process output verbatim.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::process::Command;

pub const DEFAULT_PROTOC: &str = "protoc";
pub const DEFAULT_PLUGIN_OUTPUTS: &[&str] = &["--go_out=.", "--go-grpc_out=."];

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' exited with {status}\n{stdout}{stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
}

/// Invokes `protoc` (or a compatible compiler) with a fixed set of include paths and outputs.
#[derive(Debug, Clone)]
pub struct ProtocDriver {
    program: PathBuf,
    include_paths: Vec<PathBuf>,
    plugin_outputs: Vec<String>,
}

impl Default for ProtocDriver {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROTOC),
            include_paths: vec![],
            plugin_outputs: DEFAULT_PLUGIN_OUTPUTS
                .iter()
                .map(|o| o.to_string())
                .collect(),
        }
    }
}

impl ProtocDriver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Adds an include path (`-I`) searched after the output root.
    pub fn include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    /// Replaces the plugin output flags passed to [`Self::compile`].
    pub fn plugin_outputs<I, T>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.plugin_outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Compiles `files` (names relative to `root`) with the configured plugin outputs.
    pub async fn compile<I, T>(&self, root: &Path, files: I) -> Result<(), CompileError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args = self
            .plugin_outputs
            .iter()
            .map(OsString::from)
            .chain(files.into_iter().map(Into::into));

        tracing::info!(root = %root.display(), "Compiling protobufs");

        self.run(root, args).await
    }

    /// Generates the REST gateway and OpenAPI document of one service file.
    ///
    /// # Arguments
    ///
    /// * `root` - The output root, used as working directory.
    /// * `file` - The service file name, relative to `root`.
    /// * `config` - The routing descriptor path, relative to `root`.
    pub async fn generate_gateway(
        &self,
        root: &Path,
        file: &str,
        config: &Path,
    ) -> Result<(), CompileError> {
        let options = format!(
            "logtostderr=true,grpc_api_configuration={}",
            config.display()
        );

        let args = [
            OsString::from(format!("--grpc-gateway_out={options}:.")),
            OsString::from(format!("--openapiv2_out={options}:.")),
            OsString::from(file),
        ];

        tracing::info!(file, config = %config.display(), "Creating gateway");

        self.run(root, args).await
    }

    async fn run<I>(&self, root: &Path, args: I) -> Result<(), CompileError>
    where
        I: IntoIterator<Item = OsString>,
    {
        let program = self.program.display().to_string();

        let mut command = Command::new(&self.program);
        command.current_dir(root).arg("-I.");

        for include in &self.include_paths {
            command.arg(format!("-I{}", include.display()));
        }

        command.args(args);

        tracing::debug!(?command, "Running compiler");

        let output = command
            .output()
            .await
            .map_err(|source| CompileError::Spawn {
                program: program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(CompileError::Failed {
                program,
                status: output.status,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
