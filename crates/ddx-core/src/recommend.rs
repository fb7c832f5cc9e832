//! Test recommendation by expected information value.
//!
//! For each candidate test we simulate the Bayesian update under both
//! outcomes and score the expected reduction in distribution entropy,
//! discounted by cost. The slate is re-derived after every update so
//! tests for demoted diseases retire and tests for promoted ones appear.

use crate::candidate::{apply_test_result, Candidate};
use crate::session::CompletedTest;
use ddx_common::{DiseaseId, TestId, TestOutcome};
use ddx_config::{DiagnosticTest, KnowledgeBase};
use ddx_math::{positive_probability, shannon_entropy};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A test on the recommended slate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecommendedTest {
    pub test_id: TestId,
    pub name: String,
    pub disease_id: DiseaseId,
    pub disease_name: String,
    pub cost: f64,
    pub sensitivity: f64,
    pub specificity: f64,
}

impl RecommendedTest {
    fn from_catalog(test: &DiagnosticTest, disease_name: &str) -> Self {
        RecommendedTest {
            test_id: test.id.clone(),
            name: test.name.clone(),
            disease_id: test.disease_id.clone(),
            disease_name: disease_name.to_string(),
            cost: test.cost,
            sensitivity: test.sensitivity,
            specificity: test.specificity,
        }
    }
}

fn entropy_of(candidates: &[Candidate]) -> f64 {
    let probs: Vec<f64> = candidates.iter().map(|c| c.base_probability).collect();
    shannon_entropy(&probs)
}

/// Expected entropy reduction from running `test` on `candidates`.
fn expected_information_gain(candidates: &[Candidate], test: &DiagnosticTest, p_target: f64) -> f64 {
    let h_now = entropy_of(candidates);
    let p_pos = positive_probability(p_target, test.sensitivity, test.specificity);

    let mut if_positive = candidates.to_vec();
    apply_test_result(&mut if_positive, test, TestOutcome::Positive);
    let mut if_negative = candidates.to_vec();
    apply_test_result(&mut if_negative, test, TestOutcome::Negative);

    let expected_h = p_pos * entropy_of(&if_positive) + (1.0 - p_pos) * entropy_of(&if_negative);
    (h_now - expected_h).max(0.0)
}

/// Derive the recommended test slate.
///
/// - Completed tests never reappear.
/// - Tests whose target sits below `prune_floor` (or is absent from the
///   differential) are dropped.
/// - Remaining tests are ranked by information gain discounted by cost,
///   with ties broken by cost then id for determinism.
pub fn recommend_tests(
    kb: &KnowledgeBase,
    candidates: &[Candidate],
    completed: &BTreeMap<String, CompletedTest>,
    slate_size: usize,
    prune_floor: f64,
    cost_scale: f64,
) -> Vec<RecommendedTest> {
    let mut scored: Vec<(f64, RecommendedTest)> = Vec::new();

    for test in &kb.tests {
        if completed.contains_key(&test.id.0) {
            continue;
        }
        let Some(target) = candidates.iter().find(|c| c.disease_id == test.disease_id) else {
            continue;
        };
        if target.base_probability < prune_floor {
            continue;
        }
        let gain = expected_information_gain(candidates, test, target.base_probability);
        let score = gain / (1.0 + test.cost / cost_scale);
        scored.push((score, RecommendedTest::from_catalog(test, &target.name)));
    }

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.1.cost
                    .partial_cmp(&b.1.cost)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.1.test_id.cmp(&b.1.test_id))
    });
    scored.truncate(slate_size);
    scored.into_iter().map(|(_, t)| t).collect()
}
