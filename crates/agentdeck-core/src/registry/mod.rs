//! Registry-facing inputs
//!
//! Server and agent specs as published by the registry, plus the catalog
//! trait the engine uses to look them up.

pub mod catalog;
pub mod schema;

pub use catalog::{Catalog, CatalogDocument, FileCatalog};
pub use schema::{
    AgentServerRef, AgentSpec, Argument, ArgumentKind, KeyValueSpec, PackageAlternative,
    PackageTransport, RemoteAlternative, ServerSpec,
};
