//! DDX knowledge-base loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the knowledge base (diseases, tests,
//!   epidemiology, genomics, imaging labels, treatment protocols)
//! - Built-in defaults compiled into the binary
//! - Resolution (CLI path → `DDX_KB` env → builtin)
//! - Semantic validation
//!
//! The knowledge base is immutable after load: the engine receives a
//! shared reference and never mutates it.

pub mod catalog;
pub mod defaults;
pub mod resolve;
pub mod validate;

pub use catalog::{
    Disease, DiagnosticTest, ImagingLabel, KnowledgeBase, Medication, SeasonalModifier,
    TreatmentProtocol, VariantRisk,
};
pub use resolve::{load_knowledge_base, KbSource};
pub use validate::{validate_knowledge_base, ValidationError, ValidationResult};

/// Schema version for knowledge-base files.
pub const KB_SCHEMA_VERSION: &str = ddx_common::SCHEMA_VERSION;
