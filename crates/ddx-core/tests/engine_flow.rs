//! End-to-end engine flows: session lifecycle, resumability, and the
//! distribution invariant under arbitrary test sequences.

use ddx_common::{ConfidenceLevel, Region, SessionState, TestOutcome};
use ddx_core::engine::{Engine, EngineOptions, StartRequest};
use ddx_core::fusion::ImagingEvidence;
use ddx_core::session::SessionStore;
use ddx_core::similar::{BoundedCaseIndex, CaseIndex, InMemoryCaseIndex};
use ddx_config::defaults;
use proptest::prelude::*;
use std::path::Path;
use std::sync::Arc;

const TOLERANCE: f64 = 1e-6;

fn in_memory_engine() -> Engine {
    Engine::with_defaults(Arc::new(defaults::builtin()))
}

fn disk_engine(dir: &Path) -> Engine {
    let opts = EngineOptions::default();
    let store = SessionStore::at_dir(dir.to_path_buf(), opts.retention).unwrap();
    let case_index: Arc<dyn CaseIndex> = Arc::new(BoundedCaseIndex::new(
        Arc::new(InMemoryCaseIndex::with_reference_cases()),
        opts.similar_timeout,
    ));
    Engine::new(Arc::new(defaults::builtin()), store, case_index, opts)
}

fn request(symptoms: &[&str]) -> StartRequest {
    StartRequest {
        symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
        ..StartRequest::default()
    }
}

fn mass(candidates: &[ddx_core::candidate::Candidate]) -> f64 {
    candidates.iter().map(|c| c.base_probability).sum()
}

#[test]
fn full_session_flow_monsoon_dengue() {
    let engine = in_memory_engine();
    let started = engine
        .start_session(&StartRequest {
            region: Region::SouthAsia,
            month: Some(8),
            ..request(&["fever", "headache", "joint_pain", "rash"])
        })
        .unwrap();

    assert!(started.contextual_factors.seasonal_applied);
    assert!((mass(&started.candidates) - 1.0).abs() < TOLERANCE);
    assert_eq!(started.candidates[0].name, "Dengue Fever");

    // The slate must cover the leading candidate.
    let dengue_test = started
        .recommended_tests
        .iter()
        .find(|t| t.disease_id.0 == "D001")
        .expect("a dengue test recommended for a dengue-led differential");
    let submitted = engine
        .submit_test_result(
            &started.session_id.0,
            &dengue_test.test_id.0,
            TestOutcome::Positive,
        )
        .unwrap();

    assert!((mass(&submitted.updated_candidates) - 1.0).abs() < TOLERANCE);
    assert!(
        submitted.updated_candidates[0].base_probability
            > started.candidates[0].base_probability
    );
    assert_eq!(submitted.total_cost, dengue_test.cost);

    let result = engine.get_result(&started.session_id.0, &[]).unwrap();
    assert_eq!(result.report.final_diagnosis.disease, "Dengue Fever");
    assert_eq!(result.report.diagnostic_journey.tests_ordered, 1);
    assert_eq!(result.report.diagnostic_journey.total_cost, dengue_test.cost);
    assert!(result.treatment.is_some());
    assert!(result
        .trustworthiness
        .reasoning_chain
        .iter()
        .any(|s| s.contains(&dengue_test.name)));
}

#[test]
fn imaging_insertion_flow() {
    let engine = in_memory_engine();
    let started = engine
        .start_session(&StartRequest {
            imaging: Some(ImagingEvidence {
                predictions: [
                    ("Pneumonia".to_string(), 0.45),
                    ("Effusion".to_string(), 0.08),
                ]
                .into_iter()
                .collect(),
                image_ref: Some("/static/uploads/case-42.png".to_string()),
                ..ImagingEvidence::default()
            }),
            ..StartRequest::default()
        })
        .unwrap();

    // 0.45 clears the insertion threshold; 0.08 clears nothing.
    assert_eq!(started.candidates.len(), 1);
    assert!(started.candidates[0].added_by_cnn);
    assert_eq!(started.candidates[0].name, "Pneumonia");
    assert_eq!(
        started.contextual_factors.top_cnn_label.as_deref(),
        Some("Pneumonia")
    );

    // Imaging counts as corroboration for the trust report.
    let result = engine.get_result(&started.session_id.0, &[]).unwrap();
    assert!(!result
        .trustworthiness
        .uncertainty_factors
        .iter()
        .any(|f| f.contains("imaging")));
}

#[test]
fn session_resumes_identically_after_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (session_id, before) = {
        let engine = disk_engine(dir.path());
        let started = engine
            .start_session(&request(&["fever", "chills", "sweating", "headache"]))
            .unwrap();
        let test_id = started.recommended_tests[0].test_id.0.clone();
        engine
            .submit_test_result(&started.session_id.0, &test_id, TestOutcome::Positive)
            .unwrap();
        let status = engine.get_status(&started.session_id.0).unwrap();
        (started.session_id.0.clone(), status)
    };

    // Fresh engine over the same data dir simulates a process restart.
    let engine = disk_engine(dir.path());
    let after = engine.get_status(&session_id).unwrap();

    assert_eq!(after.candidates, before.candidates);
    assert_eq!(after.recommended_tests, before.recommended_tests);
    assert_eq!(after.completed_tests, before.completed_tests);
    assert_eq!(after.total_cost, before.total_cost);
    assert_eq!(after.status, SessionState::InProgress);

    // Completing after resume still works and remains idempotent.
    let first = engine.get_result(&session_id, &[]).unwrap();
    let second = engine.get_result(&session_id, &[]).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn confidence_contract_low_without_strong_lead() {
    let engine = in_memory_engine();
    // A generic single symptom spreads mass thinly across many diseases.
    let started = engine.start_session(&request(&["fever"])).unwrap();
    assert!(started.candidates[0].base_probability < 0.40);

    let result = engine.get_result(&started.session_id.0, &[]).unwrap();
    assert_eq!(
        result.trustworthiness.confidence_level,
        ConfidenceLevel::Low
    );
}

#[test]
fn contraindications_filter_treatment() {
    let engine = in_memory_engine();
    let started = engine
        .start_session(&request(&["fever", "chills", "sweating", "vomiting"]))
        .unwrap();
    assert_eq!(started.candidates[0].name, "Malaria");

    let result = engine
        .get_result(
            &started.session_id.0,
            &["g6pd deficiency".to_string()],
        )
        .unwrap();
    let treatment = result.treatment.unwrap();
    assert!(treatment
        .medications
        .iter()
        .all(|m| m.name != "Primaquine"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // The candidate distribution must sum to 1.0 after every state
    // transition, for arbitrary test/outcome sequences.
    #[test]
    fn distribution_normalized_under_arbitrary_test_sequences(
        seed_symptoms in proptest::sample::subsequence(
            vec!["fever", "headache", "cough", "fatigue", "chills", "sweating", "chest_pain"],
            1..5,
        ),
        outcomes in proptest::collection::vec(proptest::bool::ANY, 0..6),
    ) {
        let engine = in_memory_engine();
        let Ok(started) = engine.start_session(&request(&seed_symptoms)) else {
            // A symptom subset that matches nothing is a valid rejection.
            return Ok(());
        };
        prop_assert!((mass(&started.candidates) - 1.0).abs() < TOLERANCE);

        let id = started.session_id.0.clone();
        for positive in outcomes {
            let status = engine.get_status(&id).unwrap();
            let Some(test) = status.recommended_tests.first() else { break };
            let outcome = if positive { TestOutcome::Positive } else { TestOutcome::Negative };
            let submitted = engine.submit_test_result(&id, &test.test_id.0, outcome).unwrap();
            prop_assert!((mass(&submitted.updated_candidates) - 1.0).abs() < TOLERANCE);
        }

        let result = engine.get_result(&id, &[]).unwrap();
        let differential_mass: f64 = result.report.differential.iter().map(|d| d.probability).sum();
        prop_assert!(differential_mass <= 1.0 + TOLERANCE);
    }
}
