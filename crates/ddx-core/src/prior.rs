//! Disease priors from symptoms and contextual factors.
//!
//! Four contributions combine multiplicatively per disease: the symptom
//! match fraction, a regional/seasonal epidemiological modifier, a
//! family-history modifier, and a genomic risk modifier (each defaulting
//! to 1.0 when inapplicable). Diseases with zero symptom overlap never
//! enter the differential on contextual grounds alone.

use crate::candidate::{sort_by_probability, Candidate};
use ddx_common::Region;
use ddx_config::KnowledgeBase;
use ddx_math::normalize;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Multiplier applied when a family-history term matches.
pub const FAMILY_HISTORY_MULTIPLIER: f64 = 1.5;

/// Summary of which contextual modifiers fired for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContextualFactors {
    pub seasonal_applied: bool,
    pub family_history_applied: bool,
    pub genomic_applied: bool,
    pub cnn_applied: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_cnn_label: Option<String>,

    pub region: Region,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
}

/// Contextual inputs to prior computation.
#[derive(Debug, Clone, Default)]
pub struct PriorContext {
    pub region: Region,
    pub month: Option<u8>,
    pub family_history: Vec<String>,
    pub genetic_variants: Vec<String>,
}

/// Result of prior computation, including which diseases each contextual
/// modifier touched (for the reasoning trace).
#[derive(Debug, Clone)]
pub struct PriorOutcome {
    pub candidates: Vec<Candidate>,
    pub factors: ContextualFactors,
    pub family_matches: Vec<String>,
    pub genomic_matches: Vec<String>,
}

/// Compute the initial ranked candidate list.
///
/// The list is truncated to `max_candidates` before normalization, so
/// the retained mass always sums to 1.0.
pub fn compute_priors(
    kb: &KnowledgeBase,
    symptoms: &[String],
    ctx: &PriorContext,
    max_candidates: usize,
) -> PriorOutcome {
    let mut factors = ContextualFactors {
        region: ctx.region,
        month: ctx.month,
        ..ContextualFactors::default()
    };
    let mut candidates = Vec::new();
    let mut family_matches = Vec::new();
    let mut genomic_matches = Vec::new();

    for disease in &kb.diseases {
        let overlap = disease.symptom_overlap(symptoms);
        if overlap <= 0.0 {
            continue;
        }
        let mut score = overlap;
        let mut candidate = Candidate::new(
            disease.id.clone(),
            &disease.name,
            &disease.category,
            0.0,
        );

        let seasonal = kb.seasonal_multiplier(&disease.id, ctx.region, ctx.month);
        if (seasonal - 1.0).abs() > f64::EPSILON {
            score *= seasonal;
            factors.seasonal_applied = true;
        }

        if disease.hereditary_match(&ctx.family_history) {
            score *= FAMILY_HISTORY_MULTIPLIER;
            candidate.family_history_match = true;
            factors.family_history_applied = true;
            family_matches.push(disease.name.clone());
        }

        if let Some(modifier) = kb.genomic_multiplier(&disease.id, &ctx.genetic_variants) {
            score *= modifier;
            candidate.genomic_modifier = Some(modifier);
            factors.genomic_applied = true;
            genomic_matches.push(disease.name.clone());
        }

        candidate.base_probability = score;
        candidates.push(candidate);
    }

    sort_by_probability(&mut candidates);
    candidates.truncate(max_candidates);

    let mut probs: Vec<f64> = candidates.iter().map(|c| c.base_probability).collect();
    if normalize(&mut probs) {
        for (c, p) in candidates.iter_mut().zip(probs) {
            c.base_probability = p;
        }
    }

    PriorOutcome {
        candidates,
        factors,
        family_matches,
        genomic_matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddx_common::DiseaseId;
    use ddx_config::defaults;
    use ddx_math::{approx_eq, PROB_TOLERANCE};

    fn symptoms(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn priors_sum_to_one() {
        let kb = defaults::builtin();
        let outcome = compute_priors(
            &kb,
            &symptoms(&["fever", "headache", "cough"]),
            &PriorContext::default(),
            10,
        );
        let sum: f64 = outcome
            .candidates
            .iter()
            .map(|c| c.base_probability)
            .sum();
        assert!(approx_eq(sum, 1.0, PROB_TOLERANCE));
        assert!(!outcome.candidates.is_empty());
    }

    #[test]
    fn zero_overlap_diseases_are_excluded() {
        let kb = defaults::builtin();
        // Malaria-only symptoms: dengue shares fever/headache/nausea but
        // imaging-only conditions (no symptom profile) must never appear.
        let outcome = compute_priors(
            &kb,
            &symptoms(&["chills", "sweating"]),
            &PriorContext::default(),
            10,
        );
        assert!(outcome
            .candidates
            .iter()
            .all(|c| !c.disease_id.0.starts_with("D1")));
    }

    #[test]
    fn empty_symptoms_yield_empty_differential() {
        let kb = defaults::builtin();
        let outcome = compute_priors(&kb, &[], &PriorContext::default(), 10);
        assert!(outcome.candidates.is_empty());
    }

    #[test]
    fn seasonal_modifier_promotes_in_season_disease() {
        let kb = defaults::builtin();
        let shared = symptoms(&["fever", "headache", "nausea"]);

        let global = compute_priors(&kb, &shared, &PriorContext::default(), 10);
        let monsoon = compute_priors(
            &kb,
            &shared,
            &PriorContext {
                region: Region::SouthAsia,
                month: Some(8),
                ..PriorContext::default()
            },
            10,
        );
        assert!(monsoon.factors.seasonal_applied);
        assert!(!global.factors.seasonal_applied);

        let dengue_id = DiseaseId::from("D001");
        let p_global = global
            .candidates
            .iter()
            .find(|c| c.disease_id == dengue_id)
            .unwrap()
            .base_probability;
        let p_monsoon = monsoon
            .candidates
            .iter()
            .find(|c| c.disease_id == dengue_id)
            .unwrap()
            .base_probability;
        assert!(p_monsoon > p_global);
    }

    #[test]
    fn family_history_flags_matching_candidate() {
        let kb = defaults::builtin();
        let outcome = compute_priors(
            &kb,
            &symptoms(&["fever", "cough", "sore_throat"]),
            &PriorContext {
                family_history: vec!["asthma in both parents".to_string()],
                ..PriorContext::default()
            },
            10,
        );
        assert!(outcome.factors.family_history_applied);
        let flu = outcome
            .candidates
            .iter()
            .find(|c| c.disease_id == DiseaseId::from("D004"))
            .unwrap();
        assert!(flu.family_history_match);
        assert!(outcome.family_matches.contains(&"Influenza".to_string()));
    }

    #[test]
    fn protective_variant_lowers_ranking() {
        let kb = defaults::builtin();
        let shared = symptoms(&["fever", "chills", "sweating", "headache"]);

        let plain = compute_priors(&kb, &shared, &PriorContext::default(), 10);
        let sickle = compute_priors(
            &kb,
            &shared,
            &PriorContext {
                genetic_variants: vec!["rs334".to_string()],
                ..PriorContext::default()
            },
            10,
        );
        assert!(sickle.factors.genomic_applied);

        let malaria_id = DiseaseId::from("D002");
        let p_plain = plain
            .candidates
            .iter()
            .find(|c| c.disease_id == malaria_id)
            .unwrap()
            .base_probability;
        let malaria = sickle
            .candidates
            .iter()
            .find(|c| c.disease_id == malaria_id)
            .unwrap();
        assert!(malaria.base_probability < p_plain);
        assert_eq!(malaria.genomic_modifier, Some(0.5));
    }

    #[test]
    fn candidate_list_is_sorted_descending() {
        let kb = defaults::builtin();
        let outcome = compute_priors(
            &kb,
            &symptoms(&["fever", "cough", "fatigue", "headache"]),
            &PriorContext::default(),
            10,
        );
        for pair in outcome.candidates.windows(2) {
            assert!(pair[0].base_probability >= pair[1].base_probability);
        }
    }
}
