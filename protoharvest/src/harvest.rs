//! # Harvest Runs
//!
//! Glue between the parsed command line and `protoharvest_core`. Every step returns a
//! [`HarvestError`] so that `main` can report any failure the same way.
use std::time::Duration;

use protoharvest_core::HarvestClient;
use protoharvest_core::client::{ClientConnectError, Discovery, DiscoveryError};
use protoharvest_core::compiler::{CompileError, ProtocDriver};
use protoharvest_core::discovery::ExclusionFilter;
use protoharvest_core::emit::{ArtifactEmitter, EmitError, EmitReport};

use crate::cli::GenerateArgs;

#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error(transparent)]
    Connect(#[from] ClientConnectError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

pub async fn discover(
    url: &str,
    timeout: Duration,
    filter: &ExclusionFilter,
) -> Result<Discovery, HarvestError> {
    let mut client = HarvestClient::connect(url, timeout).await?;
    Ok(client.discover(filter).await?)
}

/// Runs the whole pipeline: discover, emit, compile, then one gateway per service file.
pub async fn generate(
    url: &str,
    timeout: Duration,
    args: GenerateArgs,
) -> Result<EmitReport, HarvestError> {
    let discovery = discover(url, timeout, &args.exclusions.filter()).await?;

    let emitter = ArtifactEmitter::new(&args.out_dir);
    emitter.prepare()?;

    let report = emitter.emit(&discovery.files)?;

    if args.skip_compile || discovery.files.is_empty() {
        tracing::info!("Skipping compilation");
        return Ok(report);
    }

    let driver = driver(&args);

    driver
        .compile(emitter.root(), discovery.files.names())
        .await?;

    if args.skip_gateway {
        tracing::info!("Skipping gateway generation");
        return Ok(report);
    }

    for file in discovery.service_files() {
        let config = emitter.write_gateway_config(file)?;
        driver
            .generate_gateway(emitter.root(), file.name(), &config)
            .await?;
    }

    Ok(report)
}

fn driver(args: &GenerateArgs) -> ProtocDriver {
    let driver = args
        .proto_paths
        .iter()
        .fold(ProtocDriver::new(&args.protoc), |driver, path| {
            driver.include_path(path)
        });

    if args.plugin_outputs.is_empty() {
        driver
    } else {
        driver.plugin_outputs(&args.plugin_outputs)
    }
}
