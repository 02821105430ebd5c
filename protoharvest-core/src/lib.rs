//! # Protoharvest Core
//!
//! `protoharvest-core` is the library behind the `protoharvest` CLI. It connects to a running gRPC
//! server that exposes the Server Reflection Protocol, works out every `.proto` file needed to
//! describe the services it publishes, writes those files back to disk and drives `protoc` over them.
//!
//! ## Pipeline
//!
//! 1. **[`HarvestClient`]:** Lists the services exposed by the server and resolves each one into a
//!    [`prost_reflect::ServiceDescriptor`].
//! 2. **[`discovery`]:** Walks every service → method → message → field edge and collects the set of
//!    files touched, deduplicated by file name. The reflection protocol's own schema is never part of it.
//! 3. **[`emit`]:** Prints each file as canonical `.proto` source under an output root, together with
//!    a `schema.lst` index and a `google.api.Service` HTTP routing descriptor.
//! 4. **[`compiler`]:** Runs `protoc` and the grpc-gateway plugins over the emitted tree.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost-reflect`, `prost-types` and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod client;
pub mod compiler;
pub mod discovery;
pub mod emit;
pub mod reflection;

pub use client::HarvestClient;

// Re-exports
pub use prost_reflect;
pub use prost_types;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
