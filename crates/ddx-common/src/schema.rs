//! Schema versioning for persisted artifacts.

/// Schema version for session documents and knowledge-base files.
///
/// Bump the minor version for additive changes, the major version for
/// breaking ones. Session documents written with a different major
/// version are rejected on load.
pub const SCHEMA_VERSION: &str = "1.0.0";
