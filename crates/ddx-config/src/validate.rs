//! Knowledge-base semantic validation.

use crate::catalog::KnowledgeBase;
use std::collections::BTreeSet;
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Knowledge-base validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Schema validation failed: {0}")]
    SchemaError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

fn check_probability(field: &str, value: f64) -> ValidationResult<()> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("expected probability in [0,1], got {value}"),
        });
    }
    Ok(())
}

/// Validate a knowledge base semantically.
pub fn validate_knowledge_base(kb: &KnowledgeBase) -> ValidationResult<()> {
    // Major schema version must match.
    let expected_major = crate::KB_SCHEMA_VERSION.split('.').next().unwrap_or("1");
    let actual_major = kb.schema_version.split('.').next().unwrap_or("");
    if expected_major != actual_major {
        return Err(ValidationError::VersionMismatch {
            expected: crate::KB_SCHEMA_VERSION.to_string(),
            actual: kb.schema_version.clone(),
        });
    }

    if kb.vocabulary.is_empty() {
        return Err(ValidationError::SchemaError(
            "vocabulary must not be empty".to_string(),
        ));
    }
    let vocab: BTreeSet<&str> = kb.vocabulary.iter().map(|s| s.as_str()).collect();
    for code in &kb.vocabulary {
        if code.chars().any(|c| c.is_uppercase() || c == ' ') {
            return Err(ValidationError::InvalidValue {
                field: "vocabulary".to_string(),
                message: format!("symptom codes are lowercase underscore-separated, got {code:?}"),
            });
        }
    }

    // Diseases: unique ids, symptoms drawn from the vocabulary.
    let mut disease_ids = BTreeSet::new();
    for d in &kb.diseases {
        if !disease_ids.insert(&d.id) {
            return Err(ValidationError::SemanticError(format!(
                "duplicate disease id: {}",
                d.id
            )));
        }
        for s in &d.symptoms {
            if !vocab.contains(s.as_str()) {
                return Err(ValidationError::SemanticError(format!(
                    "disease {} references unknown symptom code {s:?}",
                    d.id
                )));
            }
        }
    }

    // Tests: unique ids, valid probabilities, existing target.
    let mut test_ids = BTreeSet::new();
    for t in &kb.tests {
        if !test_ids.insert(&t.id) {
            return Err(ValidationError::SemanticError(format!(
                "duplicate test id: {}",
                t.id
            )));
        }
        check_probability(&format!("tests.{}.sensitivity", t.id), t.sensitivity)?;
        check_probability(&format!("tests.{}.specificity", t.id), t.specificity)?;
        if t.cost < 0.0 || t.cost.is_nan() {
            return Err(ValidationError::InvalidValue {
                field: format!("tests.{}.cost", t.id),
                message: format!("expected >= 0, got {}", t.cost),
            });
        }
        if !disease_ids.contains(&t.disease_id) {
            return Err(ValidationError::SemanticError(format!(
                "test {} targets unknown disease {}",
                t.id, t.disease_id
            )));
        }
    }

    for m in &kb.epidemiology {
        if !disease_ids.contains(&m.disease_id) {
            return Err(ValidationError::SemanticError(format!(
                "seasonal modifier references unknown disease {}",
                m.disease_id
            )));
        }
        if m.multiplier <= 0.0 || m.multiplier.is_nan() {
            return Err(ValidationError::InvalidValue {
                field: format!("epidemiology.{}.multiplier", m.disease_id),
                message: format!("expected > 0, got {}", m.multiplier),
            });
        }
        for month in &m.months {
            if !(1..=12).contains(month) {
                return Err(ValidationError::InvalidValue {
                    field: format!("epidemiology.{}.months", m.disease_id),
                    message: format!("expected month in 1-12, got {month}"),
                });
            }
        }
    }

    for g in &kb.genomics {
        if !disease_ids.contains(&g.disease_id) {
            return Err(ValidationError::SemanticError(format!(
                "variant {} references unknown disease {}",
                g.variant, g.disease_id
            )));
        }
        if g.multiplier <= 0.0 || g.multiplier.is_nan() {
            return Err(ValidationError::InvalidValue {
                field: format!("genomics.{}.multiplier", g.variant),
                message: format!("expected > 0, got {}", g.multiplier),
            });
        }
    }

    for l in &kb.imaging_labels {
        if !disease_ids.contains(&l.disease_id) {
            return Err(ValidationError::SemanticError(format!(
                "imaging label {:?} maps to unknown disease {}",
                l.label, l.disease_id
            )));
        }
    }

    let mut treated = BTreeSet::new();
    for t in &kb.treatments {
        if !disease_ids.contains(&t.disease_id) {
            return Err(ValidationError::SemanticError(format!(
                "treatment protocol references unknown disease {}",
                t.disease_id
            )));
        }
        if !treated.insert(&t.disease_id) {
            return Err(ValidationError::SemanticError(format!(
                "duplicate treatment protocol for {}",
                t.disease_id
            )));
        }
    }

    Ok(())
}
