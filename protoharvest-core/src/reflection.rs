//! # Server Reflection
//!
//! This module contains the logic necessary to interact with the gRPC Server Reflection Protocol.
//!
//! It lets `protoharvest` ask a server for its own Protobuf schema at runtime, without any
//! prior knowledge of the services it exposes.
pub mod client;
