//! # Schema Discovery
//!
//! Computes the transitive closure of `.proto` files needed to describe a set of services.
//!
//! Discovery runs in two steps:
//!
//! 1. **[`SchemaWalker`]**: For a single service, follows every method's input and output message,
//!    every field of those messages and, for map fields, their key and value types. Each visited
//!    service, method, message and enum contributes its declaring file.
//! 2. **[`FileSet::merge`]**: Combines the per-service results into one set keyed by file name,
//!    dropping the files that belong to the reflection protocol itself (see [`ExclusionFilter`]).
//!
//! Import statements are never followed: a file is part of the result only if one of the types
//! declared in it is reachable from a service.
mod file_set;
mod walker;

pub use file_set::{ExclusionFilter, FileSet};
pub use walker::{SchemaWalker, discover_service_files};
