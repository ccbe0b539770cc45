//! Content digests for rendered runtime documents
//!
//! Digests are lowercase blake3 hex strings. Two renders of the same desired
//! state produce the same digest, so callers can tell whether a deployment
//! changed without diffing files.

/// Digest a single document.
pub fn content_digest(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}
