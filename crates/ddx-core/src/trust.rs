//! Trust scoring: confidence, reasoning chain, evidence table.
//!
//! Generated exactly once, at session completion, from the full session
//! trace. The confidence thresholds are a shared contract with the
//! presentation layer (see `ddx_common::types`).

use crate::candidate::{lead_probability, top_two_gap};
use crate::engine::EngineOptions;
use crate::session::{DiagnosticSession, SessionEvent};
use ddx_common::ConfidenceLevel;
use ddx_config::KnowledgeBase;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of a contributing evidence row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Symptom,
    Test,
    Context,
}

/// One row of the evidence table.
///
/// Weights are comparable in scale for ranking by the caller; they do
/// not sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvidenceItem {
    pub factor: String,
    pub weight: f64,
    pub kind: EvidenceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// The explainable trust report for a terminal diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Trustworthiness {
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub reasoning_chain: Vec<String>,
    pub evidence: Vec<EvidenceItem>,
    pub similar_cases: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uncertainty_factors: Vec<String>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn title_case(code: &str) -> String {
    code.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn reasoning_sentence(event: &SessionEvent) -> String {
    match event {
        SessionEvent::SymptomPrior {
            symptoms,
            candidate_count,
        } => {
            let listed: Vec<String> = symptoms
                .iter()
                .take(4)
                .map(|s| s.replace('_', " "))
                .collect();
            format!(
                "Patient presented with {} symptom(s) ({}); the initial differential contained {} condition(s).",
                symptoms.len(),
                listed.join(", "),
                candidate_count
            )
        }
        SessionEvent::SeasonalModifier { region, month } => match month {
            Some(m) => format!(
                "Epidemiological patterns for {region} in month {m} adjusted the baseline probabilities."
            ),
            None => format!(
                "Epidemiological patterns for {region} adjusted the baseline probabilities."
            ),
        },
        SessionEvent::FamilyHistory { diseases } => format!(
            "Reported family history raised suspicion of {}.",
            diseases.join(", ")
        ),
        SessionEvent::GenomicModifier { variants, diseases } => format!(
            "Genetic variant(s) {} modified the risk profile for {}.",
            variants.join(", "),
            diseases.join(", ")
        ),
        SessionEvent::ImagingBoost {
            label,
            disease,
            confidence,
        } => format!(
            "Imaging finding {label} ({:.0}% confidence) reinforced {disease}.",
            confidence * 100.0
        ),
        SessionEvent::ImagingInsertion {
            label,
            disease,
            confidence,
        } => format!(
            "Imaging finding {label} ({:.0}% confidence) added {disease} to the differential.",
            confidence * 100.0
        ),
        SessionEvent::TestCompleted {
            name,
            disease,
            outcome,
            ..
        } => {
            if outcome.is_positive() {
                format!("Positive {name} raised the likelihood of {disease}.")
            } else {
                format!("Negative {name} argued against {disease}.")
            }
        }
    }
}

fn evidence_rows(session: &DiagnosticSession, kb: &KnowledgeBase) -> Vec<EvidenceItem> {
    let mut rows = Vec::new();
    let top_profile = session
        .candidates
        .first()
        .and_then(|c| kb.disease(&c.disease_id));

    for symptom in &session.symptoms {
        // Symptoms characteristic of the lead diagnosis carry more weight.
        let supports_top = top_profile.is_some_and(|d| d.symptoms.contains(symptom));
        rows.push(EvidenceItem {
            factor: format!("Symptom: {}", title_case(symptom)),
            weight: if supports_top { 0.7 } else { 0.4 },
            kind: EvidenceKind::Symptom,
            result: None,
        });
    }

    for event in &session.events {
        match event {
            SessionEvent::SeasonalModifier { region, .. } => rows.push(EvidenceItem {
                factor: format!("Seasonal pattern: {region}"),
                weight: 0.3,
                kind: EvidenceKind::Context,
                result: None,
            }),
            SessionEvent::FamilyHistory { diseases } => rows.push(EvidenceItem {
                factor: format!("Family history: {}", diseases.join(", ")),
                weight: 0.5,
                kind: EvidenceKind::Context,
                result: None,
            }),
            SessionEvent::GenomicModifier { variants, .. } => rows.push(EvidenceItem {
                factor: format!("Genetic variants: {}", variants.join(", ")),
                weight: 0.5,
                kind: EvidenceKind::Context,
                result: None,
            }),
            SessionEvent::ImagingBoost {
                label, confidence, ..
            }
            | SessionEvent::ImagingInsertion {
                label, confidence, ..
            } => rows.push(EvidenceItem {
                factor: format!("Imaging finding: {label}"),
                weight: round2(*confidence),
                kind: EvidenceKind::Context,
                result: Some(label.clone()),
            }),
            _ => {}
        }
    }

    for completed in session.completed_tests.values() {
        rows.push(EvidenceItem {
            factor: format!("Test: {}", completed.name),
            weight: if completed.outcome.is_positive() {
                0.9
            } else {
                0.3
            },
            kind: EvidenceKind::Test,
            result: Some(completed.outcome.to_string()),
        });
    }

    rows
}

/// Score a completed session's trustworthiness.
pub fn score_trust(
    session: &DiagnosticSession,
    kb: &KnowledgeBase,
    similar_cases: usize,
    retrieval_degraded: bool,
    opts: &EngineOptions,
) -> Trustworthiness {
    let top_prob = lead_probability(&session.candidates);
    let tests_completed = session.completed_tests.len();

    let raw_score = 0.5 * top_prob
        + 0.1 * (tests_completed.min(3) as f64)
        + 0.02 * (similar_cases.min(10) as f64);
    let confidence_score = round2(raw_score.min(0.95));

    let mut confidence_level = ConfidenceLevel::from_score(confidence_score);
    // A weak lead caps the level regardless of how much testing happened.
    if top_prob < opts.low_lead_threshold {
        confidence_level = ConfidenceLevel::Low;
    }
    // High confidence requires at least one corroborating signal.
    let corroborated = tests_completed > 0 || session.contextual_factors.cnn_applied;
    if confidence_level == ConfidenceLevel::High && !corroborated {
        confidence_level = ConfidenceLevel::Medium;
    }

    let mut reasoning_chain: Vec<String> = session.events.iter().map(reasoning_sentence).collect();
    if let Some(top) = session.candidates.first() {
        reasoning_chain.push(format!(
            "Based on the symptom pattern and test results, {} is the most likely diagnosis at {:.0}% probability.",
            top.name,
            top.base_probability * 100.0
        ));
    } else {
        reasoning_chain
            .push("No condition reached a meaningful probability; the differential is inconclusive.".to_string());
    }

    let mut uncertainty_factors = Vec::new();
    if session.imaging.as_ref().map_or(true, |i| i.is_empty()) {
        uncertainty_factors.push("No imaging evidence was available".to_string());
    }
    if tests_completed < 2 {
        uncertainty_factors
            .push("Fewer than two test results; additional testing could improve accuracy".to_string());
    }
    if let Some(gap) = top_two_gap(&session.candidates) {
        if gap < opts.closeness_threshold {
            uncertainty_factors.push(
                "Top candidates are within a narrow probability margin; the differential remains close"
                    .to_string(),
            );
        }
    }
    if retrieval_degraded {
        uncertainty_factors.push("Similar-case retrieval was unavailable".to_string());
    }

    Trustworthiness {
        confidence_score,
        confidence_level,
        reasoning_chain,
        evidence: evidence_rows(session, kb),
        similar_cases,
        uncertainty_factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use crate::prior::ContextualFactors;
    use crate::session::CompletedTest;
    use chrono::Utc;
    use ddx_config::defaults;
    use ddx_common::{DiseaseId, Region, SessionId, SessionState, TestId, TestOutcome};
    use std::collections::BTreeMap;

    fn session_with(top_prob: f64, tests: usize, cnn: bool) -> DiagnosticSession {
        let mut completed = BTreeMap::new();
        for i in 0..tests {
            let id = format!("T{:03}", i + 1);
            completed.insert(
                id.clone(),
                CompletedTest {
                    test_id: TestId(id),
                    name: format!("Test {}", i + 1),
                    disease_id: DiseaseId::from("D001"),
                    disease_name: "Dengue Fever".to_string(),
                    outcome: TestOutcome::Positive,
                    cost: 10.0,
                },
            );
        }
        DiagnosticSession {
            schema_version: ddx_common::SCHEMA_VERSION.to_string(),
            id: SessionId::new(),
            state: SessionState::InProgress,
            symptoms: vec!["fever".to_string(), "headache".to_string()],
            region: Region::Global,
            month: None,
            family_history: vec![],
            genetic_variants: vec![],
            imaging: None,
            contextual_factors: ContextualFactors {
                cnn_applied: cnn,
                ..ContextualFactors::default()
            },
            candidates: vec![
                Candidate::new(DiseaseId::from("D001"), "Dengue Fever", "Infectious", top_prob),
                Candidate::new(
                    DiseaseId::from("D002"),
                    "Malaria",
                    "Infectious",
                    1.0 - top_prob,
                ),
            ],
            recommended_tests: vec![],
            completed_tests: completed,
            total_cost: 0.0,
            events: vec![SessionEvent::SymptomPrior {
                symptoms: vec!["fever".to_string(), "headache".to_string()],
                candidate_count: 2,
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            final_result: None,
        }
    }

    #[test]
    fn weak_lead_caps_level_at_low() {
        let kb = defaults::builtin();
        let session = session_with(0.35, 3, true);
        let trust = score_trust(&session, &kb, 10, false, &EngineOptions::default());
        assert_eq!(trust.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn high_requires_corroboration() {
        let kb = defaults::builtin();
        // Strong lead but no tests and no imaging: capped at Medium.
        let session = session_with(0.95, 0, false);
        let trust = score_trust(&session, &kb, 10, false, &EngineOptions::default());
        assert_ne!(trust.confidence_level, ConfidenceLevel::High);

        let corroborated = session_with(0.95, 3, false);
        let trust = score_trust(&corroborated, &kb, 10, false, &EngineOptions::default());
        assert_eq!(trust.confidence_level, ConfidenceLevel::High);
        assert!(trust.confidence_score >= 0.70);
    }

    #[test]
    fn more_tests_raise_the_score() {
        let kb = defaults::builtin();
        let few = score_trust(&session_with(0.6, 1, false), &kb, 5, false, &EngineOptions::default());
        let many = score_trust(&session_with(0.6, 3, false), &kb, 5, false, &EngineOptions::default());
        assert!(many.confidence_score > few.confidence_score);
    }

    #[test]
    fn reasoning_chain_starts_with_symptoms_and_ends_with_conclusion() {
        let kb = defaults::builtin();
        let session = session_with(0.8, 2, false);
        let trust = score_trust(&session, &kb, 5, false, &EngineOptions::default());
        assert!(trust.reasoning_chain.first().unwrap().contains("presented"));
        assert!(trust
            .reasoning_chain
            .last()
            .unwrap()
            .contains("Dengue Fever"));
    }

    #[test]
    fn evidence_table_has_symptom_and_test_rows() {
        let kb = defaults::builtin();
        let session = session_with(0.8, 2, false);
        let trust = score_trust(&session, &kb, 5, false, &EngineOptions::default());
        assert!(trust
            .evidence
            .iter()
            .any(|e| e.kind == EvidenceKind::Symptom && e.factor.contains("Fever")));
        let test_rows: Vec<_> = trust
            .evidence
            .iter()
            .filter(|e| e.kind == EvidenceKind::Test)
            .collect();
        assert_eq!(test_rows.len(), 2);
        assert!(test_rows.iter().all(|e| e.weight == 0.9));
    }

    #[test]
    fn uncertainty_flags_fire_as_specified() {
        let kb = defaults::builtin();
        // 0.52 vs 0.48: close differential, one test, no imaging.
        let session = session_with(0.52, 1, false);
        let trust = score_trust(&session, &kb, 0, true, &EngineOptions::default());
        let joined = trust.uncertainty_factors.join(" | ");
        assert!(joined.contains("imaging"));
        assert!(joined.contains("Fewer than two"));
        assert!(joined.contains("narrow probability margin"));
        assert!(joined.contains("retrieval"));
    }

    #[test]
    fn score_is_capped() {
        let kb = defaults::builtin();
        let trust = score_trust(&session_with(1.0, 3, true), &kb, 50, false, &EngineOptions::default());
        assert!(trust.confidence_score <= 0.95);
    }
}
