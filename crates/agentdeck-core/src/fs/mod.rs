//! Filesystem primitives shared across features.

pub mod digest;
pub mod write;

pub use digest::content_digest;
pub use write::write_document;
