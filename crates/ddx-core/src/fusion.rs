//! Evidence fusion: merging imaging-model output into the differential.
//!
//! The imaging model is an opaque evidence source returning a
//! label→confidence mapping. Labels above the boost threshold reinforce
//! diseases already in the differential; labels above the (higher)
//! insertion threshold inject conditions the symptom priors missed.

use crate::candidate::{normalize_candidates, sort_by_probability, Candidate};
use crate::prior::ContextualFactors;
use ddx_config::KnowledgeBase;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Imaging evidence bundle attached to a session at start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImagingEvidence {
    /// Label → confidence mapping from the imaging model.
    pub predictions: BTreeMap<String, f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_ref: Option<String>,
}

impl ImagingEvidence {
    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Highest-confidence prediction.
    pub fn top_prediction(&self) -> Option<(&str, f64)> {
        self.predictions
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(label, conf)| (label.as_str(), *conf))
    }
}

/// One applied fusion effect, for the reasoning trace.
#[derive(Debug, Clone, PartialEq)]
pub enum FusionEffect {
    Boost {
        label: String,
        disease: String,
        confidence: f64,
    },
    Insertion {
        label: String,
        disease: String,
        confidence: f64,
    },
}

/// Merge imaging predictions into the candidate list.
///
/// Returns the applied effects in descending-confidence order. The list
/// is renormalized and re-sorted whenever anything was applied.
pub fn fuse_imaging(
    kb: &KnowledgeBase,
    candidates: &mut Vec<Candidate>,
    imaging: &ImagingEvidence,
    boost_threshold: f64,
    insert_threshold: f64,
    factors: &mut ContextualFactors,
) -> Vec<FusionEffect> {
    let mut effects = Vec::new();
    if imaging.is_empty() {
        return effects;
    }

    if let Some((label, _)) = imaging.top_prediction() {
        factors.top_cnn_label = Some(label.to_string());
    }

    // Apply in descending confidence so insertion probabilities reflect
    // the strongest findings first.
    let mut predictions: Vec<(&String, f64)> =
        imaging.predictions.iter().map(|(l, c)| (l, *c)).collect();
    predictions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    for (label, confidence) in predictions {
        if confidence <= boost_threshold {
            continue;
        }
        let Some(disease_id) = kb.imaging_target(label) else {
            warn!(label = %label, "imaging label has no disease mapping; skipped");
            continue;
        };

        let present = candidates
            .iter()
            .position(|c| &c.disease_id == disease_id);
        if let Some(idx) = present {
            let existing = &mut candidates[idx];
            existing.base_probability *= 1.0 + confidence;
            existing.cnn_boost = true;
            existing.cnn_label = Some(label.clone());
            debug!(label = %label, disease = %disease_id, confidence, "imaging boost");
            effects.push(FusionEffect::Boost {
                label: label.clone(),
                disease: existing.name.clone(),
                confidence,
            });
        } else if confidence > insert_threshold {
            let Some(disease) = kb.disease(disease_id) else {
                continue;
            };
            let mut candidate = Candidate::new(
                disease.id.clone(),
                &disease.name,
                &disease.category,
                0.5 * confidence,
            );
            candidate.added_by_cnn = true;
            candidate.cnn_label = Some(label.clone());
            debug!(label = %label, disease = %disease_id, confidence, "imaging insertion");
            effects.push(FusionEffect::Insertion {
                label: label.clone(),
                disease: disease.name.clone(),
                confidence,
            });
            candidates.push(candidate);
        }
    }

    if !effects.is_empty() {
        factors.cnn_applied = true;
        normalize_candidates(candidates);
        sort_by_probability(candidates);
    }
    effects
}
