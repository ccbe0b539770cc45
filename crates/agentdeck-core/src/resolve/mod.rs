//! Resolution of registry specs into concrete launch parameters
//!
//! [`params`] applies overrides, static values and defaults to argument and
//! key/value lists. [`package`] selects an alternative from a server spec
//! and turns it into a [`crate::mcp::ResolvedServer`].

pub mod package;
pub mod params;

pub use package::{Ecosystem, PackageResolver, ResolveOverrides, Selected, resolve_transport, select_alternative};
pub use params::{Overrides, resolve_arguments, resolve_key_values};
