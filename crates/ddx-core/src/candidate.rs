//! Disease candidates and the Bayesian test update.
//!
//! A candidate list is always kept sorted by descending probability and
//! normalized to unit mass. Every update produces a freshly recomputed
//! list; nothing patches a single probability in place.

use ddx_common::{DiseaseId, TestOutcome};
use ddx_config::DiagnosticTest;
use ddx_math::{normalize, outcome_likelihood, PROB_TOLERANCE};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

fn is_false(b: &bool) -> bool {
    !*b
}

/// A disease hypothesis under consideration within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Candidate {
    pub disease_id: DiseaseId,
    pub name: String,
    pub category: String,

    /// Current posterior probability.
    pub base_probability: f64,

    // Provenance flags.
    #[serde(default, skip_serializing_if = "is_false")]
    pub updated_by_test: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub family_history_match: bool,

    /// Genomic risk multiplier applied to the prior, when any fired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genomic_modifier: Option<f64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub cnn_boost: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub added_by_cnn: bool,

    /// Imaging label that triggered a boost or insertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnn_label: Option<String>,
}

impl Candidate {
    /// A plain candidate with no provenance flags set.
    pub fn new(disease_id: DiseaseId, name: &str, category: &str, probability: f64) -> Self {
        Candidate {
            disease_id,
            name: name.to_string(),
            category: category.to_string(),
            base_probability: probability,
            updated_by_test: false,
            family_history_match: false,
            genomic_modifier: None,
            cnn_boost: false,
            added_by_cnn: false,
            cnn_label: None,
        }
    }
}

/// Stable sort by descending probability.
///
/// Equal probabilities keep their prior relative order.
pub fn sort_by_probability(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.base_probability
            .partial_cmp(&a.base_probability)
            .unwrap_or(Ordering::Equal)
    });
}

/// Normalize candidate probabilities to unit mass.
///
/// Returns `false` (leaving the list untouched) when total mass is
/// degenerate.
pub fn normalize_candidates(candidates: &mut [Candidate]) -> bool {
    let mut probs: Vec<f64> = candidates.iter().map(|c| c.base_probability).collect();
    if !normalize(&mut probs) {
        return false;
    }
    for (c, p) in candidates.iter_mut().zip(probs) {
        c.base_probability = p;
    }
    true
}

/// Apply a single test result to the candidate distribution.
///
/// For the targeted disease the likelihood is `se` / `1-se`; for every
/// other candidate it is the not-have-D likelihood `1-sp` / `sp`. The
/// unnormalized posteriors are renormalized, re-sorted (stable), and
/// every candidate whose probability moved gets `updated_by_test` set.
///
/// A result so disconfirming that all mass vanishes keeps the previous
/// distribution instead of producing an all-zero one.
pub fn apply_test_result(
    candidates: &mut Vec<Candidate>,
    test: &DiagnosticTest,
    outcome: TestOutcome,
) {
    if candidates.is_empty() {
        return;
    }
    let positive = outcome.is_positive();
    let before: Vec<f64> = candidates.iter().map(|c| c.base_probability).collect();

    for c in candidates.iter_mut() {
        let has_disease = c.disease_id == test.disease_id;
        c.base_probability *=
            outcome_likelihood(positive, has_disease, test.sensitivity, test.specificity);
    }

    if !normalize_candidates(candidates) {
        warn!(test = %test.id, "test update produced degenerate mass; keeping prior distribution");
        for (c, p) in candidates.iter_mut().zip(before) {
            c.base_probability = p;
        }
        return;
    }

    for (c, prev) in candidates.iter_mut().zip(before) {
        if (c.base_probability - prev).abs() > PROB_TOLERANCE {
            c.updated_by_test = true;
        }
    }
    sort_by_probability(candidates);
}

/// Lead candidate probability, or 0.0 for an empty differential.
pub fn lead_probability(candidates: &[Candidate]) -> f64 {
    candidates.first().map(|c| c.base_probability).unwrap_or(0.0)
}

/// Gap between the top two probabilities; `None` with fewer than two.
pub fn top_two_gap(candidates: &[Candidate]) -> Option<f64> {
    match candidates {
        [first, second, ..] => Some(first.base_probability - second.base_probability),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddx_common::TestId;
    use ddx_math::approx_eq;

    fn two_candidates() -> Vec<Candidate> {
        vec![
            Candidate::new(DiseaseId::from("D001"), "Dengue Fever", "Infectious", 0.5),
            Candidate::new(DiseaseId::from("D002"), "Malaria", "Infectious", 0.5),
        ]
    }

    fn ns1_test() -> DiagnosticTest {
        DiagnosticTest {
            id: TestId::from("T001"),
            name: "NS1 Antigen Test".to_string(),
            disease_id: DiseaseId::from("D001"),
            cost: 25.0,
            sensitivity: 0.9,
            specificity: 0.8,
        }
    }

    #[test]
    fn positive_result_raises_target_above_prior() {
        let mut candidates = two_candidates();
        apply_test_result(&mut candidates, &ns1_test(), TestOutcome::Positive);
        let dengue = candidates
            .iter()
            .find(|c| c.disease_id == DiseaseId::from("D001"))
            .unwrap();
        assert!(dengue.base_probability > 0.5);
        // 0.9*0.5 / (0.9*0.5 + 0.2*0.5)
        assert!(approx_eq(dengue.base_probability, 0.45 / 0.55, 1e-9));
        assert!(dengue.updated_by_test);
    }

    #[test]
    fn negative_result_lowers_target_below_prior() {
        let mut candidates = two_candidates();
        apply_test_result(&mut candidates, &ns1_test(), TestOutcome::Negative);
        let dengue = candidates
            .iter()
            .find(|c| c.disease_id == DiseaseId::from("D001"))
            .unwrap();
        assert!(dengue.base_probability < 0.5);
        assert!(approx_eq(dengue.base_probability, 0.05 / 0.45, 1e-9));
    }

    #[test]
    fn update_preserves_unit_mass_and_ordering() {
        let mut candidates = two_candidates();
        candidates.push(Candidate::new(
            DiseaseId::from("D003"),
            "Typhoid Fever",
            "Infectious",
            0.2,
        ));
        normalize_candidates(&mut candidates);
        apply_test_result(&mut candidates, &ns1_test(), TestOutcome::Positive);

        let sum: f64 = candidates.iter().map(|c| c.base_probability).sum();
        assert!(approx_eq(sum, 1.0, PROB_TOLERANCE));
        for pair in candidates.windows(2) {
            assert!(pair[0].base_probability >= pair[1].base_probability);
        }
        assert_eq!(candidates[0].disease_id, DiseaseId::from("D001"));
    }

    #[test]
    fn stable_sort_keeps_tied_order() {
        let mut candidates = vec![
            Candidate::new(DiseaseId::from("D004"), "Influenza", "Respiratory", 0.25),
            Candidate::new(DiseaseId::from("D006"), "COVID-19", "Respiratory", 0.25),
            Candidate::new(DiseaseId::from("D007"), "Common Cold", "Respiratory", 0.5),
        ];
        sort_by_probability(&mut candidates);
        assert_eq!(candidates[0].disease_id, DiseaseId::from("D007"));
        // Tie between D004 and D006 preserves their prior relative order.
        assert_eq!(candidates[1].disease_id, DiseaseId::from("D004"));
        assert_eq!(candidates[2].disease_id, DiseaseId::from("D006"));
    }

    #[test]
    fn degenerate_update_keeps_previous_distribution() {
        let mut candidates = vec![Candidate::new(
            DiseaseId::from("D001"),
            "Dengue Fever",
            "Infectious",
            1.0,
        )];
        // sensitivity 1.0 makes a negative result annihilate the only candidate
        let test = DiagnosticTest {
            sensitivity: 1.0,
            specificity: 1.0,
            ..ns1_test()
        };
        apply_test_result(&mut candidates, &test, TestOutcome::Negative);
        assert!(approx_eq(candidates[0].base_probability, 1.0, 1e-12));
        assert!(!candidates[0].updated_by_test);
    }

    #[test]
    fn empty_list_is_a_no_op() {
        let mut candidates: Vec<Candidate> = vec![];
        apply_test_result(&mut candidates, &ns1_test(), TestOutcome::Positive);
        assert!(candidates.is_empty());
        assert_eq!(lead_probability(&candidates), 0.0);
        assert!(top_two_gap(&candidates).is_none());
    }
}
