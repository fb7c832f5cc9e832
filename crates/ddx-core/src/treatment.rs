//! Treatment advice for the top diagnosis, filtered by contraindications.

use ddx_common::DiseaseId;
use ddx_config::{KnowledgeBase, Medication};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One advised medication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MedicationAdvice {
    pub name: String,
    pub dosage: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// Treatment plan for the top candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TreatmentPlan {
    pub disease_id: DiseaseId,
    pub disease_name: String,
    pub medications: Vec<MedicationAdvice>,
    pub lifestyle: Vec<String>,
    pub follow_up: String,

    /// True when stated contraindications removed every medication.
    pub medications_suppressed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Case-insensitive substring intersection, in either direction.
fn contraindicated(medication: &Medication, stated: &[String]) -> bool {
    stated.iter().any(|s| {
        let stated_term = s.trim().to_lowercase();
        if stated_term.is_empty() {
            return false;
        }
        medication.contraindications.iter().any(|known| {
            let known_term = known.to_lowercase();
            stated_term.contains(&known_term) || known_term.contains(&stated_term)
        })
    })
}

/// Build a treatment plan for a disease, filtering contraindicated
/// medications. Returns `None` when the knowledge base carries no
/// protocol for the disease (a legitimate state, not an error).
pub fn advise(
    kb: &KnowledgeBase,
    disease_id: &DiseaseId,
    disease_name: &str,
    contraindications: &[String],
) -> Option<TreatmentPlan> {
    let protocol = kb.treatment_for(disease_id)?;

    let medications: Vec<MedicationAdvice> = protocol
        .medications
        .iter()
        .filter(|m| !contraindicated(m, contraindications))
        .map(|m| MedicationAdvice {
            name: m.name.clone(),
            dosage: m.dosage.clone(),
            duration: m.duration.clone(),
        })
        .collect();

    let medications_suppressed = medications.is_empty() && !protocol.medications.is_empty();
    if medications_suppressed {
        info!(disease = %disease_id, "all medications suppressed by contraindications");
    }

    Some(TreatmentPlan {
        disease_id: disease_id.clone(),
        disease_name: disease_name.to_string(),
        medications,
        lifestyle: protocol.lifestyle.clone(),
        follow_up: protocol.follow_up.clone(),
        medications_suppressed,
        note: medications_suppressed.then(|| {
            "Pharmacologic options were suppressed by stated contraindications; follow lifestyle and follow-up guidance and consult a clinician for alternatives.".to_string()
        }),
    })
}
