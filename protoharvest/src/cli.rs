//! # CLI
//!
//! This module defines the command-line interface of `protoharvest` using `clap`.
//!
//! Validation that only depends on the input text (e.g. the timeout being a positive number of
//! seconds) happens here, before any connection is attempted.
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use protoharvest_core::compiler::DEFAULT_PROTOC;
use protoharvest_core::discovery::ExclusionFilter;

#[derive(Parser)]
#[command(
    name = "protoharvest",
    version,
    about = "Regenerate .proto files and REST gateways from a gRPC server exposing reflection"
)]
pub struct Cli {
    /// The server URL to connect to (e.g. http://localhost:50051)
    #[arg(env = "GRPC_URL")]
    pub url: String,

    /// Seconds to wait for the connection and for each reflection round-trip
    #[arg(long, global = true, default_value = "10", value_parser = parse_timeout)]
    pub timeout: Duration,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the schema files needed to describe every service of the server
    List {
        #[command(flatten)]
        exclusions: ExclusionArgs,
    },

    /// Write the schema files to disk and run the compiler and gateway generator over them
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// protoharvest localhost:50051 generate --out-dir gen -I third_party/googleapis
    /// ```
    Generate(GenerateArgs),
}

#[derive(Args)]
pub struct ExclusionArgs {
    /// Also skip files whose name contains MARKER (repeatable)
    #[arg(long = "exclude", value_name = "MARKER")]
    pub exclude: Vec<String>,
}

impl ExclusionArgs {
    pub fn filter(&self) -> ExclusionFilter {
        self.exclude
            .iter()
            .fold(ExclusionFilter::default(), |filter, marker| {
                filter.with_marker(marker.as_str())
            })
    }
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Output directory. Removed and recreated on every run
    #[arg(short, long, default_value = "tmp")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub exclusions: ExclusionArgs,

    /// The protobuf compiler to run
    #[arg(long, default_value = DEFAULT_PROTOC)]
    pub protoc: PathBuf,

    /// Extra include path passed to the compiler (repeatable)
    #[arg(short = 'I', long = "proto-path", value_name = "DIR")]
    pub proto_paths: Vec<PathBuf>,

    /// Compiler output flag, e.g. `--go_out=.` (repeatable, replaces the defaults)
    #[arg(long = "plugin-out", value_name = "ARG", allow_hyphen_values = true)]
    pub plugin_outputs: Vec<String>,

    /// Only write the schema files and manifests
    #[arg(long)]
    pub skip_compile: bool,

    /// Do not run the gateway generator
    #[arg(long)]
    pub skip_gateway: bool,
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: u64 = value
        .parse()
        .map_err(|_| format!("Invalid timeout: '{value}'. Expected a number of seconds"))?;

    if secs == 0 {
        return Err("Timeout must be at least one second".to_string());
    }

    Ok(Duration::from_secs(secs))
}
