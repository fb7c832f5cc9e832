//! Knowledge-base catalog types and lookup helpers.
//!
//! These types match the kb.schema.json layout. All lookups are by the
//! stable catalog ids (`D001`, `T004`, ...); textual matching (hereditary
//! terms, contraindications) is case-insensitive substring in both
//! directions, mirroring how clients phrase free-text factors.

use ddx_common::{DiseaseId, Region, TestId};
use serde::{Deserialize, Serialize};

/// A disease entry in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disease {
    pub id: DiseaseId,
    pub name: String,
    pub category: String,

    /// Characteristic symptom codes. Empty for imaging-only conditions,
    /// which can never enter a differential from symptom priors alone.
    #[serde(default)]
    pub symptoms: Vec<String>,

    /// Terms matched against stated family-history strings.
    #[serde(default)]
    pub hereditary_terms: Vec<String>,
}

impl Disease {
    /// Fraction of this disease's characteristic symptoms present.
    pub fn symptom_overlap(&self, present: &[String]) -> f64 {
        if self.symptoms.is_empty() {
            return 0.0;
        }
        let matched = self
            .symptoms
            .iter()
            .filter(|s| present.iter().any(|p| p == *s))
            .count();
        matched as f64 / self.symptoms.len() as f64
    }

    /// Whether any stated family-history term matches a hereditary term.
    pub fn hereditary_match(&self, family_history: &[String]) -> bool {
        family_history.iter().any(|stated| {
            let stated = stated.trim().to_lowercase();
            if stated.is_empty() {
                return false;
            }
            self.hereditary_terms.iter().any(|term| {
                let term = term.to_lowercase();
                stated.contains(&term) || term.contains(&stated)
            })
        })
    }
}

/// A diagnostic test targeting a single disease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticTest {
    pub id: TestId,
    pub name: String,
    pub disease_id: DiseaseId,

    /// Cost in currency units.
    pub cost: f64,

    /// True-positive rate in [0, 1].
    pub sensitivity: f64,

    /// True-negative rate in [0, 1].
    pub specificity: f64,
}

/// Regional/seasonal epidemiological modifier for one disease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalModifier {
    pub disease_id: DiseaseId,
    pub region: Region,

    /// Calendar months (1-12) the modifier applies to; empty = all year.
    #[serde(default)]
    pub months: Vec<u8>,

    /// Multiplier applied to the symptom prior (> 0; may be < 1.0).
    pub multiplier: f64,
}

impl SeasonalModifier {
    /// Whether this modifier fires for the given region and month.
    ///
    /// `Global` entries fire everywhere. Month-restricted entries never
    /// fire without a stated onset month.
    pub fn applies(&self, region: Region, month: Option<u8>) -> bool {
        if self.region != Region::Global && self.region != region {
            return false;
        }
        if self.months.is_empty() {
            return true;
        }
        match month {
            Some(m) => self.months.contains(&m),
            None => false,
        }
    }
}

/// Disease-risk multiplier keyed by a genetic variant code.
///
/// Multipliers below 1.0 encode protective alleles (e.g. sickle-cell
/// trait lowering malaria risk).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRisk {
    pub variant: String,
    pub disease_id: DiseaseId,
    pub multiplier: f64,
}

/// Mapping from an imaging-model label to a catalog disease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagingLabel {
    pub label: String,
    pub disease_id: DiseaseId,
}

/// A medication within a treatment protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// Known contraindication terms, matched textually against stated
    /// patient contraindications.
    #[serde(default)]
    pub contraindications: Vec<String>,
}

/// Treatment protocol for one disease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentProtocol {
    pub disease_id: DiseaseId,
    pub medications: Vec<Medication>,

    #[serde(default)]
    pub lifestyle: Vec<String>,

    pub follow_up: String,
}

/// Complete knowledge base.
///
/// Loaded once at process start and shared immutably; see the crate docs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Canonical symptom vocabulary (lowercase, underscore-separated).
    pub vocabulary: Vec<String>,

    pub diseases: Vec<Disease>,
    pub tests: Vec<DiagnosticTest>,

    #[serde(default)]
    pub epidemiology: Vec<SeasonalModifier>,

    #[serde(default)]
    pub genomics: Vec<VariantRisk>,

    #[serde(default)]
    pub imaging_labels: Vec<ImagingLabel>,

    #[serde(default)]
    pub treatments: Vec<TreatmentProtocol>,
}

impl KnowledgeBase {
    pub fn disease(&self, id: &DiseaseId) -> Option<&Disease> {
        self.diseases.iter().find(|d| &d.id == id)
    }

    pub fn test(&self, id: &TestId) -> Option<&DiagnosticTest> {
        self.tests.iter().find(|t| &t.id == id)
    }

    /// Tests targeting the given disease, in catalog order.
    pub fn tests_for<'a>(
        &'a self,
        disease_id: &'a DiseaseId,
    ) -> impl Iterator<Item = &'a DiagnosticTest> + 'a {
        self.tests.iter().filter(move |t| &t.disease_id == disease_id)
    }

    /// Product of all seasonal modifiers firing for (region, month, disease).
    pub fn seasonal_multiplier(
        &self,
        disease_id: &DiseaseId,
        region: Region,
        month: Option<u8>,
    ) -> f64 {
        self.epidemiology
            .iter()
            .filter(|m| &m.disease_id == disease_id && m.applies(region, month))
            .map(|m| m.multiplier)
            .product()
    }

    /// Product of the risk multipliers of all stated variants affecting
    /// the disease; `None` when no variant matches.
    pub fn genomic_multiplier(&self, disease_id: &DiseaseId, variants: &[String]) -> Option<f64> {
        let product: f64 = self
            .genomics
            .iter()
            .filter(|g| {
                &g.disease_id == disease_id
                    && variants
                        .iter()
                        .any(|v| v.trim().eq_ignore_ascii_case(&g.variant))
            })
            .map(|g| g.multiplier)
            .product();
        // `product` of an empty iterator is 1.0; distinguish "no match".
        let any = self.genomics.iter().any(|g| {
            &g.disease_id == disease_id
                && variants
                    .iter()
                    .any(|v| v.trim().eq_ignore_ascii_case(&g.variant))
        });
        any.then_some(product)
    }

    /// Target disease for an imaging label (case-insensitive).
    pub fn imaging_target(&self, label: &str) -> Option<&DiseaseId> {
        self.imaging_labels
            .iter()
            .find(|l| l.label.eq_ignore_ascii_case(label))
            .map(|l| &l.disease_id)
    }

    pub fn treatment_for(&self, disease_id: &DiseaseId) -> Option<&TreatmentProtocol> {
        self.treatments.iter().find(|t| &t.disease_id == disease_id)
    }
}
