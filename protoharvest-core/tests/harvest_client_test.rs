use futures_util::stream::{Pending, pending};
use prost_types::FileDescriptorSet;
use protoharvest_core::HarvestClient;
use protoharvest_core::client::{DiscoveryError, ResolveServiceError};
use protoharvest_core::discovery::ExclusionFilter;
use protoharvest_core::reflection::client::{ReflectionClient, ReflectionResolveError};
use std::time::Duration;
use tonic::{Request, Response, Status, Streaming};
use tonic_reflection::pb::v1::{ServerReflectionRequest, ServerReflectionResponse};
use tonic_reflection::server::v1::{ServerReflection, ServerReflectionServer};

mod fixtures;

fn reflection_service(fd_set: FileDescriptorSet) -> ServerReflectionServer<impl ServerReflection> {
    tonic_reflection::server::Builder::configure()
        .register_file_descriptor_set(fd_set)
        .build_v1()
        .expect("Failed to setup Reflection Service")
}

// Accepts the reflection stream but never answers on it.
struct UnresponsiveReflection;

#[tonic::async_trait]
impl ServerReflection for UnresponsiveReflection {
    type ServerReflectionInfoStream = Pending<Result<ServerReflectionResponse, Status>>;

    async fn server_reflection_info(
        &self,
        _req: Request<Streaming<ServerReflectionRequest>>,
    ) -> Result<Response<Self::ServerReflectionInfoStream>, Status> {
        Ok(Response::new(pending()))
    }
}

fn setup_client(
    fd_set: FileDescriptorSet,
) -> HarvestClient<ServerReflectionServer<impl ServerReflection>> {
    HarvestClient::from_service(reflection_service(fd_set)).with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_list_service_names() {
    let mut client = setup_client(fixtures::catalog());

    let services = client
        .list_service_names()
        .await
        .expect("Failed to list services");

    assert!(services.contains(&"inventory.Inventory".to_string()));
    assert!(services.contains(&"pricing.Pricing".to_string()));
    assert!(services.contains(&"grpc.reflection.v1.ServerReflection".to_string()));
}

#[tokio::test]
async fn test_resolve_service_fetches_imports() {
    let mut client = setup_client(fixtures::catalog());

    let service = client
        .resolve_service("inventory.Inventory")
        .await
        .expect("Failed to resolve service");

    assert_eq!(service.full_name(), "inventory.Inventory");
    assert_eq!(service.parent_file().name(), "inventory.proto");

    let get = service
        .methods()
        .find(|m| m.name() == "Get")
        .expect("Method not found");

    let prices = get
        .input()
        .get_field_by_name("prices")
        .expect("Field not found");
    assert!(prices.is_map());
}

#[tokio::test]
async fn test_resolve_unknown_service_is_named() {
    let mut client = setup_client(fixtures::catalog());

    let result = client.resolve_service("inventory.Ghost").await;

    assert!(matches!(
        result,
        Err(ResolveServiceError::NotFound(name)) if name == "inventory.Ghost"
    ));
}

#[tokio::test]
async fn test_discover_merges_all_services_and_excludes_reflection() {
    let mut client = setup_client(fixtures::catalog());

    let discovery = client
        .discover(&ExclusionFilter::default())
        .await
        .expect("Discovery failed");

    assert_eq!(discovery.services.len(), 3);

    let names: Vec<_> = discovery.files.names().map(String::as_str).collect();
    assert_eq!(
        names,
        [
            "inventory.proto",
            "labels.proto",
            "pricing.proto",
            "shared.proto",
            "tree.proto"
        ]
    );

    assert!(
        discovery
            .files
            .files()
            .all(|file| !file.package_name().starts_with("grpc.reflection")),
        "The reflection protocol's own schema must never be discovered"
    );
}

#[tokio::test]
async fn test_service_files_skip_the_reflection_service() {
    let mut client = setup_client(fixtures::catalog());

    let discovery = client
        .discover(&ExclusionFilter::default())
        .await
        .expect("Discovery failed");

    let mut names: Vec<_> = discovery
        .service_files()
        .into_iter()
        .map(|file| file.name())
        .collect();
    names.sort();

    assert_eq!(names, ["inventory.proto", "pricing.proto"]);
}

#[tokio::test]
async fn test_discover_orders_scenario() {
    let mut client = setup_client(fixtures::orders("shop.v1"));

    let discovery = client
        .discover(&ExclusionFilter::default())
        .await
        .expect("Discovery failed");

    let names: Vec<_> = discovery.files.names().map(String::as_str).collect();
    assert_eq!(
        names,
        ["common.proto", "orders.proto", "orders_types.proto"]
    );
}

#[tokio::test]
async fn test_extra_exclusions_apply_to_discovery() {
    let mut client = setup_client(fixtures::catalog());

    let filter = ExclusionFilter::default().with_marker("tree.proto");
    let discovery = client.discover(&filter).await.expect("Discovery failed");

    assert!(!discovery.files.contains("tree.proto"));
    assert!(discovery.files.contains("inventory.proto"));
}

#[tokio::test]
async fn test_server_without_reflection_fails_discovery() {
    // A server exposing only the v1alpha reflection endpoint does not answer v1 requests.
    let server = tonic_reflection::server::Builder::configure()
        .register_file_descriptor_set(fixtures::catalog())
        .build_v1alpha()
        .expect("Failed to setup Reflection Service");

    let mut client = HarvestClient::from_service(server);

    let result = client.discover(&ExclusionFilter::default()).await;

    assert!(matches!(result, Err(DiscoveryError::ListServices(_))));
}

#[tokio::test]
async fn test_reflection_client_collects_transitive_imports() {
    let mut client = ReflectionClient::new(reflection_service(fixtures::catalog()));

    let fd_set = client
        .file_descriptor_set_by_symbol("inventory.Inventory")
        .await
        .expect("Failed to fetch file descriptor set by symbol");

    let mut names: Vec<_> = fd_set.file.iter().map(|f| f.name().to_string()).collect();
    names.sort();

    assert_eq!(
        names,
        [
            "inventory.proto",
            "labels.proto",
            "shared.proto",
            "tree.proto",
            "unused.proto"
        ]
    );
}

#[tokio::test]
async fn test_unresponsive_server_hits_the_deadline() {
    let timeout = Duration::from_millis(200);
    let mut client =
        HarvestClient::from_service(ServerReflectionServer::new(UnresponsiveReflection))
            .with_timeout(timeout);

    let listed = client.list_service_names().await;
    assert!(matches!(
        listed,
        Err(ReflectionResolveError::DeadlineExceeded(d)) if d == timeout
    ));

    let resolved = client.resolve_service("inventory.Inventory").await;
    assert!(matches!(
        resolved,
        Err(ResolveServiceError::ReflectionResolve {
            source: ReflectionResolveError::DeadlineExceeded(_),
            ..
        })
    ));

    let discovered = client.discover(&ExclusionFilter::default()).await;
    assert!(matches!(
        discovered,
        Err(DiscoveryError::ListServices(ReflectionResolveError::DeadlineExceeded(_)))
    ));
}
