//! DDX engine common types, IDs, and errors.
//!
//! This crate provides foundational types shared across ddx-core modules:
//! - Session and catalog identity types
//! - The unified error taxonomy with stable codes
//! - Wire-contract enums (region, outcome, session state, confidence)
//! - Schema versioning

pub mod error;
pub mod id;
pub mod schema;
pub mod types;

pub use error::{format_error_human, Error, Result, StructuredError};
pub use id::{DiseaseId, SessionId, TestId};
pub use schema::SCHEMA_VERSION;
pub use types::{ConfidenceLevel, OutputFormat, Region, SessionState, TestOutcome};
