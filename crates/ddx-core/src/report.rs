//! Terminal report assembly.
//!
//! The report is owned by the session that produced it and never mutated
//! afterward; `get_result` stores it alongside the trust data.

use crate::session::DiagnosticSession;
use ddx_common::{DiseaseId, Region, SessionId, TestOutcome};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PatientSummary {
    pub symptoms: Vec<String>,
    pub region: Region,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TestDetail {
    pub name: String,
    pub result: TestOutcome,
    pub for_disease: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DiagnosticJourney {
    pub tests_ordered: usize,
    pub tests: Vec<TestDetail>,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinalDiagnosis {
    pub disease: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease_id: Option<DiseaseId>,

    pub probability: f64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DifferentialEntry {
    pub name: String,
    pub probability: f64,
}

/// The terminal report artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Report {
    pub patient_summary: PatientSummary,
    pub diagnostic_journey: DiagnosticJourney,
    pub final_diagnosis: FinalDiagnosis,
    pub differential: Vec<DifferentialEntry>,
}

/// Assemble the report from the session's terminal state.
pub fn build_report(session: &DiagnosticSession) -> Report {
    let final_diagnosis = match session.candidates.first() {
        Some(top) => FinalDiagnosis {
            disease: top.name.clone(),
            disease_id: Some(top.disease_id.clone()),
            probability: top.base_probability,
            category: top.category.clone(),
        },
        None => FinalDiagnosis {
            disease: "Inconclusive".to_string(),
            disease_id: None,
            probability: 0.0,
            category: "Unknown".to_string(),
        },
    };

    Report {
        patient_summary: PatientSummary {
            symptoms: session.symptoms.clone(),
            region: session.region,
            session_id: session.id.clone(),
        },
        diagnostic_journey: DiagnosticJourney {
            tests_ordered: session.completed_tests.len(),
            tests: session
                .completed_tests
                .values()
                .map(|t| TestDetail {
                    name: t.name.clone(),
                    result: t.outcome,
                    for_disease: t.disease_name.clone(),
                })
                .collect(),
            total_cost: session.total_cost,
        },
        final_diagnosis,
        differential: session
            .candidates
            .iter()
            .take(5)
            .map(|c| DifferentialEntry {
                name: c.name.clone(),
                probability: c.base_probability,
            })
            .collect(),
    }
}
