//! The diagnostic engine facade.
//!
//! Implements the five logical operations of the external contract:
//! `start_session`, `submit_test_result`, `get_status`, `get_result`,
//! `find_similar_cases`. The engine owns the session store and the
//! similar-case index; the knowledge base is shared immutably.

use crate::candidate::{lead_probability, Candidate};
use crate::fusion::{fuse_imaging, FusionEffect, ImagingEvidence};
use crate::prior::{compute_priors, ContextualFactors, PriorContext};
use crate::recommend::{recommend_tests, RecommendedTest};
use crate::report::{build_report, Report};
use crate::session::{CompletedTest, DiagnosticSession, SessionEvent, SessionStore};
use crate::similar::{search_degraded, BoundedCaseIndex, CaseIndex, InMemoryCaseIndex, SimilarCase};
use crate::symptom::extract_symptoms;
use crate::treatment::{advise, TreatmentPlan};
use crate::trust::{score_trust, Trustworthiness};
use chrono::{Duration, Utc};
use ddx_common::{Error, Region, Result, SessionId, SessionState, TestId, TestOutcome};
use ddx_config::KnowledgeBase;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Engine tuning knobs.
///
/// The confidence/boost breakpoints mirror the presentation layer's
/// color-coding contract; they are fields (not constants) so upstream
/// authoritative values can be dropped in without code changes.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Minimum imaging confidence to boost a present disease.
    pub boost_threshold: f64,
    /// Minimum imaging confidence to insert an absent disease.
    pub insert_threshold: f64,
    /// Lead probability below which confidence is capped at Low.
    pub low_lead_threshold: f64,
    /// Top-two probability gap below which the differential counts as close.
    pub closeness_threshold: f64,
    /// Candidates below this probability stop attracting tests.
    pub prune_floor: f64,
    /// Maximum recommended tests per slate.
    pub slate_size: usize,
    /// Maximum candidates retained in a differential.
    pub max_candidates: usize,
    /// Cost discount scale for test scoring.
    pub cost_scale: f64,
    /// Session retention window.
    pub retention: Duration,
    /// Similar cases consulted for the trust report.
    pub similar_top_k: usize,
    /// Deadline for similar-case retrieval.
    pub similar_timeout: std::time::Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            boost_threshold: 0.10,
            insert_threshold: 0.30,
            low_lead_threshold: 0.40,
            closeness_threshold: 0.10,
            prune_floor: 0.05,
            slate_size: 5,
            max_candidates: 10,
            cost_scale: 50.0,
            retention: Duration::hours(24),
            similar_top_k: 5,
            similar_timeout: std::time::Duration::from_secs(2),
        }
    }
}

/// Request to start a diagnostic session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StartRequest {
    /// Explicit symptom labels (matched against the vocabulary).
    #[serde(default)]
    pub symptoms: Vec<String>,

    /// Free-text symptom narrative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom_text: Option<String>,

    #[serde(default)]
    pub region: Region,

    /// Onset month (1-12).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,

    #[serde(default)]
    pub family_history: Vec<String>,

    #[serde(default)]
    pub genetic_variants: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imaging: Option<ImagingEvidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StartResponse {
    pub session_id: SessionId,
    pub candidates: Vec<Candidate>,
    pub recommended_tests: Vec<RecommendedTest>,
    pub contextual_factors: ContextualFactors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmitResponse {
    pub session_id: SessionId,
    pub updated_candidates: Vec<Candidate>,
    pub recommended_tests: Vec<RecommendedTest>,
    pub total_cost: f64,
    pub status: SessionState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
    pub session_id: SessionId,
    pub candidates: Vec<Candidate>,
    pub recommended_tests: Vec<RecommendedTest>,
    pub completed_tests: BTreeMap<String, CompletedTest>,
    pub total_cost: f64,
    pub status: SessionState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResultResponse {
    pub session_id: SessionId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<TreatmentPlan>,

    pub trustworthiness: Trustworthiness,
    pub report: Report,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SimilarResponse {
    pub similar_cases: Vec<SimilarCase>,
}

/// The diagnostic reasoning engine.
pub struct Engine {
    kb: Arc<KnowledgeBase>,
    store: SessionStore,
    case_index: Arc<dyn CaseIndex>,
    opts: EngineOptions,
}

impl Engine {
    pub fn new(
        kb: Arc<KnowledgeBase>,
        store: SessionStore,
        case_index: Arc<dyn CaseIndex>,
        opts: EngineOptions,
    ) -> Self {
        Engine {
            kb,
            store,
            case_index,
            opts,
        }
    }

    /// In-memory engine with the bundled reference case corpus.
    pub fn with_defaults(kb: Arc<KnowledgeBase>) -> Self {
        let opts = EngineOptions::default();
        let store = SessionStore::in_memory(opts.retention);
        let case_index: Arc<dyn CaseIndex> = Arc::new(BoundedCaseIndex::new(
            Arc::new(InMemoryCaseIndex::with_reference_cases()),
            opts.similar_timeout,
        ));
        Engine::new(kb, store, case_index, opts)
    }

    pub fn options(&self) -> &EngineOptions {
        &self.opts
    }

    /// Start a diagnostic session from symptoms, context, and optional
    /// imaging evidence.
    pub fn start_session(&self, request: &StartRequest) -> Result<StartResponse> {
        if let Some(month) = request.month {
            if !(1..=12).contains(&month) {
                return Err(Error::Validation(format!(
                    "month must be in 1-12, got {month}"
                )));
            }
        }

        let symptoms = extract_symptoms(
            &self.kb,
            &request.symptoms,
            request.symptom_text.as_deref(),
        );
        let has_imaging = request
            .imaging
            .as_ref()
            .is_some_and(|i| !i.is_empty());
        if symptoms.is_empty() && !has_imaging {
            return Err(Error::Validation(
                "no recognizable symptoms and no imaging evidence provided".to_string(),
            ));
        }

        let ctx = PriorContext {
            region: request.region,
            month: request.month,
            family_history: request.family_history.clone(),
            genetic_variants: request.genetic_variants.clone(),
        };
        let prior = compute_priors(&self.kb, &symptoms, &ctx, self.opts.max_candidates);
        let mut candidates = prior.candidates;
        let mut factors = prior.factors;

        let mut events = vec![SessionEvent::SymptomPrior {
            symptoms: symptoms.clone(),
            candidate_count: candidates.len(),
        }];
        if factors.seasonal_applied {
            events.push(SessionEvent::SeasonalModifier {
                region: request.region,
                month: request.month,
            });
        }
        if factors.family_history_applied {
            events.push(SessionEvent::FamilyHistory {
                diseases: prior.family_matches,
            });
        }
        if factors.genomic_applied {
            events.push(SessionEvent::GenomicModifier {
                variants: request.genetic_variants.clone(),
                diseases: prior.genomic_matches,
            });
        }

        if let Some(imaging) = &request.imaging {
            let effects = fuse_imaging(
                &self.kb,
                &mut candidates,
                imaging,
                self.opts.boost_threshold,
                self.opts.insert_threshold,
                &mut factors,
            );
            for effect in effects {
                events.push(match effect {
                    FusionEffect::Boost {
                        label,
                        disease,
                        confidence,
                    } => SessionEvent::ImagingBoost {
                        label,
                        disease,
                        confidence,
                    },
                    FusionEffect::Insertion {
                        label,
                        disease,
                        confidence,
                    } => SessionEvent::ImagingInsertion {
                        label,
                        disease,
                        confidence,
                    },
                });
            }
        }

        let recommended_tests = recommend_tests(
            &self.kb,
            &candidates,
            &BTreeMap::new(),
            self.opts.slate_size,
            self.opts.prune_floor,
            self.opts.cost_scale,
        );

        let now = Utc::now();
        let session = DiagnosticSession {
            schema_version: ddx_common::SCHEMA_VERSION.to_string(),
            id: SessionId::new(),
            state: SessionState::InProgress,
            symptoms,
            region: request.region,
            month: request.month,
            family_history: request.family_history.clone(),
            genetic_variants: request.genetic_variants.clone(),
            imaging: request.imaging.clone(),
            contextual_factors: factors.clone(),
            candidates: candidates.clone(),
            recommended_tests: recommended_tests.clone(),
            completed_tests: BTreeMap::new(),
            total_cost: 0.0,
            events,
            created_at: now,
            updated_at: now,
            final_result: None,
        };
        let session_id = session.id.clone();
        self.store.insert(session)?;

        info!(
            session_id = %session_id,
            candidates = candidates.len(),
            tests = recommended_tests.len(),
            "diagnostic session started"
        );

        Ok(StartResponse {
            session_id,
            candidates,
            recommended_tests,
            contextual_factors: factors,
        })
    }

    /// Apply one test result to a session.
    pub fn submit_test_result(
        &self,
        session_id: &str,
        test_id: &str,
        outcome: TestOutcome,
    ) -> Result<SubmitResponse> {
        let kb = Arc::clone(&self.kb);
        let opts = self.opts.clone();
        self.store.with_session(session_id, move |session| {
            if session.state == SessionState::Completed {
                return Err(Error::SessionCompleted {
                    session_id: session.id.0.clone(),
                });
            }
            if session.completed_tests.contains_key(test_id) {
                return Err(Error::AlreadyCompleted {
                    test_id: test_id.to_string(),
                });
            }
            let on_slate = session
                .recommended_tests
                .iter()
                .any(|t| t.test_id.0 == test_id);
            if !on_slate {
                return Err(Error::UnknownTest {
                    test_id: test_id.to_string(),
                });
            }
            let test = kb
                .test(&TestId::from(test_id))
                .ok_or_else(|| Error::UnknownTest {
                    test_id: test_id.to_string(),
                })?;
            let disease_name = kb
                .disease(&test.disease_id)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| test.disease_id.0.clone());

            crate::candidate::apply_test_result(&mut session.candidates, test, outcome);

            session.completed_tests.insert(
                test.id.0.clone(),
                CompletedTest {
                    test_id: test.id.clone(),
                    name: test.name.clone(),
                    disease_id: test.disease_id.clone(),
                    disease_name: disease_name.clone(),
                    outcome,
                    cost: test.cost,
                },
            );
            session.total_cost += test.cost;
            session.recommended_tests = recommend_tests(
                &kb,
                &session.candidates,
                &session.completed_tests,
                opts.slate_size,
                opts.prune_floor,
                opts.cost_scale,
            );
            let lead = lead_probability(&session.candidates);
            session.events.push(SessionEvent::TestCompleted {
                test_id: test.id.clone(),
                name: test.name.clone(),
                disease: disease_name,
                outcome,
                lead_probability: lead,
            });
            session.updated_at = Utc::now();

            info!(
                session_id = %session.id,
                test_id = %test.id,
                outcome = %outcome,
                total_cost = session.total_cost,
                "test result applied"
            );

            Ok(SubmitResponse {
                session_id: session.id.clone(),
                updated_candidates: session.candidates.clone(),
                recommended_tests: session.recommended_tests.clone(),
                total_cost: session.total_cost,
                status: session.state,
            })
        })
    }

    /// Materialized view of a session, sufficient to reconstruct a
    /// client after restart without replaying history.
    pub fn get_status(&self, session_id: &str) -> Result<StatusResponse> {
        let session = self.store.snapshot(session_id)?;
        Ok(StatusResponse {
            session_id: session.id.clone(),
            candidates: session.candidates,
            recommended_tests: session.recommended_tests,
            completed_tests: session.completed_tests,
            total_cost: session.total_cost,
            status: session.state,
        })
    }

    /// Produce the terminal report, completing the session.
    ///
    /// Idempotent: once completed, the stored artifact is returned
    /// verbatim on every subsequent call.
    pub fn get_result(
        &self,
        session_id: &str,
        contraindications: &[String],
    ) -> Result<ResultResponse> {
        let kb = Arc::clone(&self.kb);
        let case_index = Arc::clone(&self.case_index);
        let opts = self.opts.clone();
        let contraindications = contraindications.to_vec();
        self.store.with_session(session_id, move |session| {
            if let Some(stored) = &session.final_result {
                return Ok(stored.clone());
            }

            let (similar, degraded) =
                search_degraded(case_index.as_ref(), &session.symptoms, opts.similar_top_k);
            let trustworthiness =
                score_trust(session, &kb, similar.len(), degraded, &opts);
            let treatment = session.candidates.first().and_then(|top| {
                advise(&kb, &top.disease_id, &top.name, &contraindications)
            });
            let report = build_report(session);

            session.state = SessionState::Completed;
            session.updated_at = Utc::now();
            let response = ResultResponse {
                session_id: session.id.clone(),
                treatment,
                trustworthiness,
                report,
            };
            session.final_result = Some(response.clone());

            info!(session_id = %session.id, "diagnostic session completed");
            Ok(response)
        })
    }

    /// Nearest historical cases for a symptom set.
    ///
    /// Degrades to an empty list when the backing index is unreachable.
    pub fn find_similar_cases(&self, symptoms: &[String], top_k: usize) -> SimilarResponse {
        let (similar_cases, _) = search_degraded(self.case_index.as_ref(), symptoms, top_k);
        SimilarResponse { similar_cases }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddx_config::defaults;
    use ddx_math::{approx_eq, PROB_TOLERANCE};

    fn engine() -> Engine {
        Engine::with_defaults(Arc::new(defaults::builtin()))
    }

    fn start_request(symptoms: &[&str]) -> StartRequest {
        StartRequest {
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            ..StartRequest::default()
        }
    }

    fn candidate_mass(candidates: &[Candidate]) -> f64 {
        candidates.iter().map(|c| c.base_probability).sum()
    }

    #[test]
    fn start_yields_normalized_candidates_and_a_slate() {
        let engine = engine();
        let response = engine
            .start_session(&start_request(&["fever", "headache", "joint_pain"]))
            .unwrap();
        assert!(!response.candidates.is_empty());
        assert!(approx_eq(
            candidate_mass(&response.candidates),
            1.0,
            PROB_TOLERANCE
        ));
        assert!(!response.recommended_tests.is_empty());
        assert!(response.recommended_tests.len() <= 5);
    }

    #[test]
    fn start_without_symptoms_or_imaging_is_rejected() {
        let engine = engine();
        let err = engine.start_session(&StartRequest::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn start_with_imaging_only_is_accepted() {
        let engine = engine();
        let request = StartRequest {
            imaging: Some(ImagingEvidence {
                predictions: [("Pneumonia".to_string(), 0.45)].into_iter().collect(),
                ..ImagingEvidence::default()
            }),
            ..StartRequest::default()
        };
        let response = engine.start_session(&request).unwrap();
        assert_eq!(response.candidates.len(), 1);
        assert!(response.candidates[0].added_by_cnn);
        assert!(response.contextual_factors.cnn_applied);
    }

    #[test]
    fn invalid_month_is_rejected() {
        let engine = engine();
        let request = StartRequest {
            month: Some(13),
            ..start_request(&["fever"])
        };
        assert!(matches!(
            engine.start_session(&request).unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[test]
    fn submit_updates_posteriors_and_cost() {
        let engine = engine();
        let started = engine
            .start_session(&start_request(&["fever", "chills", "sweating"]))
            .unwrap();
        let test = &started.recommended_tests[0];

        let submitted = engine
            .submit_test_result(&started.session_id.0, &test.test_id.0, TestOutcome::Positive)
            .unwrap();
        assert!(approx_eq(
            candidate_mass(&submitted.updated_candidates),
            1.0,
            PROB_TOLERANCE
        ));
        assert_eq!(submitted.total_cost, test.cost);
        assert!(submitted
            .recommended_tests
            .iter()
            .all(|t| t.test_id != test.test_id));
        assert!(submitted
            .updated_candidates
            .iter()
            .any(|c| c.updated_by_test));
    }

    #[test]
    fn unknown_session_and_test_are_rejected() {
        let engine = engine();
        assert!(matches!(
            engine
                .submit_test_result("missing", "T001", TestOutcome::Positive)
                .unwrap_err(),
            Error::UnknownSession { .. }
        ));

        let started = engine.start_session(&start_request(&["fever"])).unwrap();
        assert!(matches!(
            engine
                .submit_test_result(&started.session_id.0, "T999", TestOutcome::Positive)
                .unwrap_err(),
            Error::UnknownTest { .. }
        ));
    }

    #[test]
    fn replaying_a_completed_test_fails_and_preserves_state() {
        let engine = engine();
        let started = engine
            .start_session(&start_request(&["fever", "chills", "sweating"]))
            .unwrap();
        let test_id = started.recommended_tests[0].test_id.0.clone();

        let first = engine
            .submit_test_result(&started.session_id.0, &test_id, TestOutcome::Positive)
            .unwrap();
        let err = engine
            .submit_test_result(&started.session_id.0, &test_id, TestOutcome::Negative)
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyCompleted { .. }));

        let status = engine.get_status(&started.session_id.0).unwrap();
        assert_eq!(status.candidates, first.updated_candidates);
        assert_eq!(status.total_cost, first.total_cost);
    }

    #[test]
    fn get_result_is_idempotent_byte_for_byte() {
        let engine = engine();
        let started = engine
            .start_session(&start_request(&["fever", "cough", "chest_pain"]))
            .unwrap();
        let test_id = started.recommended_tests[0].test_id.0.clone();
        engine
            .submit_test_result(&started.session_id.0, &test_id, TestOutcome::Positive)
            .unwrap();

        let first = engine.get_result(&started.session_id.0, &[]).unwrap();
        let second = engine.get_result(&started.session_id.0, &[]).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        let status = engine.get_status(&started.session_id.0).unwrap();
        assert_eq!(status.status, SessionState::Completed);
    }

    #[test]
    fn completed_session_rejects_further_tests() {
        let engine = engine();
        let started = engine
            .start_session(&start_request(&["fever", "cough"]))
            .unwrap();
        engine.get_result(&started.session_id.0, &[]).unwrap();

        let test_id = started.recommended_tests[0].test_id.0.clone();
        let err = engine
            .submit_test_result(&started.session_id.0, &test_id, TestOutcome::Positive)
            .unwrap_err();
        assert!(matches!(err, Error::SessionCompleted { .. }));
    }

    #[test]
    fn result_carries_treatment_trust_and_report() {
        let engine = engine();
        let started = engine
            .start_session(&start_request(&["fever", "chills", "sweating", "headache"]))
            .unwrap();
        let result = engine.get_result(&started.session_id.0, &[]).unwrap();

        assert!(result.treatment.is_some());
        assert!(!result.trustworthiness.reasoning_chain.is_empty());
        assert!(!result.report.differential.is_empty());
        assert_eq!(
            result.report.final_diagnosis.disease,
            result.report.differential[0].name
        );
    }

    #[test]
    fn find_similar_cases_returns_scored_matches() {
        let engine = engine();
        let response = engine.find_similar_cases(
            &["fever".to_string(), "chills".to_string(), "sweating".to_string()],
            3,
        );
        assert!(!response.similar_cases.is_empty());
        assert!(response.similar_cases.len() <= 3);
        assert_eq!(response.similar_cases[0].diagnosis, "Malaria");
    }

    #[test]
    fn distribution_stays_normalized_across_many_updates() {
        let engine = engine();
        let started = engine
            .start_session(&start_request(&["fever", "headache", "cough", "fatigue"]))
            .unwrap();
        let id = started.session_id.0.clone();

        for round in 0..4 {
            let status = engine.get_status(&id).unwrap();
            let Some(test) = status.recommended_tests.first() else {
                break;
            };
            let outcome = if round % 2 == 0 {
                TestOutcome::Negative
            } else {
                TestOutcome::Positive
            };
            let submitted = engine
                .submit_test_result(&id, &test.test_id.0, outcome)
                .unwrap();
            assert!(approx_eq(
                candidate_mass(&submitted.updated_candidates),
                1.0,
                PROB_TOLERANCE
            ));
        }
    }
}
