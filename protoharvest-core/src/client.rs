//! # Harvest Client
//!
//! [`HarvestClient`] is the entry point of a harvest run. It talks to the server's reflection
//! service to enumerate and resolve services, and feeds the resolved descriptors into
//! [`crate::discovery`] to compute the files that have to be regenerated.
//!
//! ## Example
//!
//! ```rust,no_run
//! use protoharvest_core::HarvestClient;
//! use protoharvest_core::discovery::ExclusionFilter;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = HarvestClient::connect("localhost:50051", Duration::from_secs(10)).await?;
//!
//! let discovery = client.discover(&ExclusionFilter::default()).await?;
//!
//! for name in discovery.files.names() {
//!     println!("{name}");
//! }
//! # Ok(())
//! # }
//! ```
use crate::{
    BoxError,
    discovery::{ExclusionFilter, FileSet, discover_service_files},
    reflection::client::{ReflectionClient, ReflectionResolveError},
};
use http_body::Body as HttpBody;
use prost_reflect::{DescriptorError, DescriptorPool, FileDescriptor, ServiceDescriptor};
use std::collections::HashSet;
use std::time::Duration;
use tonic::{
    Code,
    transport::{Channel, Endpoint},
};

/// Errors that can occur when connecting to a gRPC server.
#[derive(Debug, thiserror::Error)]
pub enum ClientConnectError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, #[source] tonic::transport::Error),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
}

/// Errors that can occur when resolving a service name into its descriptor.
#[derive(Debug, thiserror::Error)]
pub enum ResolveServiceError {
    #[error("Reflection resolution of service '{service}' failed: '{source}'")]
    ReflectionResolve {
        service: String,
        #[source]
        source: ReflectionResolveError,
    },
    #[error("Failed to build the descriptor pool of service '{service}': '{source}'")]
    DescriptorError {
        service: String,
        #[source]
        source: DescriptorError,
    },
    #[error("Service '{0}' not found")]
    NotFound(String),
}

/// Errors that can occur during a full discovery run.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Failed to list services: '{0}'")]
    ListServices(#[source] ReflectionResolveError),
    #[error(transparent)]
    Resolve(#[from] ResolveServiceError),
}

/// Outcome of [`HarvestClient::discover`].
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Every service exposed by the server, in the order reported by reflection.
    pub services: Vec<ServiceDescriptor>,
    /// The merged set of files reachable from those services.
    pub files: FileSet,
}

impl Discovery {
    /// Discovered files that declare at least one of the services, in service order.
    ///
    /// Services whose file was excluded (the reflection service itself) are skipped.
    pub fn service_files(&self) -> Vec<&FileDescriptor> {
        let mut seen = HashSet::new();

        self.services
            .iter()
            .filter_map(|service| self.files.get(service.parent_file().name()))
            .filter(|file| seen.insert(file.name()))
            .collect()
    }
}

/// A client that harvests the schema of a gRPC server through reflection.
#[derive(Debug, Clone)]
pub struct HarvestClient<S = Channel> {
    reflection_client: ReflectionClient<S>,
}

impl HarvestClient<Channel> {
    /// Connects to a gRPC server.
    ///
    /// A bare `host:port` address is treated as plaintext `http://host:port`.
    ///
    /// # Arguments
    ///
    /// * `addr` - The server address (e.g., `localhost:50051` or `https://api.example.com`).
    /// * `timeout` - Applied to the connection attempt and to every reflection round-trip.
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestClient)` - The connected client.
    /// * `Err(ClientConnectError)` - If the URL is invalid or connection fails.
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self, ClientConnectError> {
        let uri = normalize_address(addr);

        let endpoint = Endpoint::new(uri.clone())
            .map_err(|e| ClientConnectError::InvalidUrl(uri.clone(), e))?
            .connect_timeout(timeout);

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientConnectError::ConnectionFailed(uri.clone(), e))?;

        tracing::info!(url = %uri, "Connected");

        Ok(Self {
            reflection_client: ReflectionClient::new(channel).with_timeout(timeout),
        })
    }
}

impl<S> HarvestClient<S>
where
    S: tonic::client::GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Creates a client from an existing Tonic service/channel.
    pub fn from_service(service: S) -> Self {
        Self {
            reflection_client: ReflectionClient::new(service),
        }
    }

    /// Bounds every reflection round-trip to `timeout`.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            reflection_client: self.reflection_client.with_timeout(timeout),
        }
    }

    /// Lists services available on the server via Reflection.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<String>)` - Fully qualified service names (e.g. `helloworld.Greeter`).
    /// * `Err(ReflectionResolveError)` - If the reflection call fails or the server doesn't support reflection.
    pub async fn list_service_names(&mut self) -> Result<Vec<String>, ReflectionResolveError> {
        self.reflection_client.list_services().await
    }

    /// Resolves a service name into its descriptor.
    ///
    /// The file declaring the service and all of its imports are fetched from the server and
    /// loaded into a fresh [`DescriptorPool`].
    pub async fn resolve_service(
        &mut self,
        name: &str,
    ) -> Result<ServiceDescriptor, ResolveServiceError> {
        let fd_set = self
            .reflection_client
            .file_descriptor_set_by_symbol(name)
            .await
            .map_err(|err| match err {
                ReflectionResolveError::ServerStreamFailure(status)
                    if status.code() == Code::NotFound =>
                {
                    ResolveServiceError::NotFound(name.to_string())
                }
                source => ResolveServiceError::ReflectionResolve {
                    service: name.to_string(),
                    source,
                },
            })?;

        let pool = DescriptorPool::from_file_descriptor_set(fd_set).map_err(|source| {
            ResolveServiceError::DescriptorError {
                service: name.to_string(),
                source,
            }
        })?;

        pool.get_service_by_name(name)
            .ok_or_else(|| ResolveServiceError::NotFound(name.to_string()))
    }

    /// Resolves every service exposed by the server and computes the files they need.
    ///
    /// Services are resolved one after the other; the first failure aborts the run.
    pub async fn discover(&mut self, filter: &ExclusionFilter) -> Result<Discovery, DiscoveryError> {
        let names = self
            .list_service_names()
            .await
            .map_err(DiscoveryError::ListServices)?;

        tracing::info!(count = names.len(), "Listed services");

        let mut services = Vec::with_capacity(names.len());

        for name in &names {
            let service = self.resolve_service(name).await?;
            let file = service.parent_file();
            tracing::info!(service = %name, file = file.name(), "Resolved service");
            services.push(service);
        }

        let files = FileSet::merge(services.iter().map(discover_service_files), filter);

        tracing::info!(files = files.len(), "Discovered schema files");

        Ok(Discovery { services, files })
    }
}

fn normalize_address(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    }
}
