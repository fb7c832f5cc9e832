//! Similar-case retrieval over a corpus of historical cases.
//!
//! The backing index sits behind the [`CaseIndex`] trait so deployments
//! can plug in a real vector store. Retrieval is an external concern:
//! the bounded wrapper runs each query on a worker thread with a
//! deadline, and callers degrade to an empty result set on timeout or
//! error rather than failing the surrounding report.

use ddx_common::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// A historical case returned by the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SimilarCase {
    pub case_id: String,
    pub diagnosis: String,
    pub symptoms: Vec<String>,

    /// Similarity in [0, 1].
    pub similarity_score: f64,
}

/// Nearest-neighbor lookup over historical cases by symptom set.
pub trait CaseIndex: Send + Sync {
    fn search(&self, symptoms: &[String], top_k: usize) -> Result<Vec<SimilarCase>>;
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Jaccard similarity between two symptom sets.
fn jaccard(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.iter().filter(|s| b.contains(s)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// In-memory case index over a fixed reference corpus.
pub struct InMemoryCaseIndex {
    cases: Vec<(String, String, Vec<String>)>,
}

impl InMemoryCaseIndex {
    pub fn new(cases: Vec<(String, String, Vec<String>)>) -> Self {
        InMemoryCaseIndex { cases }
    }

    /// Reference corpus of resolved historical cases.
    pub fn with_reference_cases() -> Self {
        let case = |id: &str, dx: &str, symptoms: &[&str]| {
            (
                id.to_string(),
                dx.to_string(),
                symptoms.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            )
        };
        InMemoryCaseIndex::new(vec![
            case("C001", "Dengue Fever", &["fever", "headache", "joint_pain", "rash"]),
            case("C002", "Malaria", &["fever", "chills", "sweating", "headache"]),
            case("C003", "Typhoid Fever", &["fever", "abdominal_pain", "weakness", "diarrhea"]),
            case("C004", "Influenza", &["fever", "cough", "sore_throat", "body_aches"]),
            case(
                "C005",
                "Pneumonia",
                &["cough", "fever", "chest_pain", "shortness_of_breath"],
            ),
            case(
                "C006",
                "COVID-19",
                &["fever", "cough", "fatigue", "shortness_of_breath"],
            ),
            case("C007", "Common Cold", &["runny_nose", "sore_throat", "cough"]),
            case("C008", "Dengue Fever", &["fever", "muscle_pain", "eye_pain", "bleeding"]),
            case("C009", "Malaria", &["fever", "chills", "vomiting", "fatigue"]),
            case(
                "C010",
                "Pneumonia",
                &["cough", "chest_pain", "sweating", "fatigue"],
            ),
        ])
    }
}

impl CaseIndex for InMemoryCaseIndex {
    fn search(&self, symptoms: &[String], top_k: usize) -> Result<Vec<SimilarCase>> {
        let mut scored: Vec<SimilarCase> = self
            .cases
            .iter()
            .map(|(id, dx, case_symptoms)| SimilarCase {
                case_id: id.clone(),
                diagnosis: dx.clone(),
                symptoms: case_symptoms.clone(),
                similarity_score: round3(jaccard(symptoms, case_symptoms)),
            })
            .filter(|c| c.similarity_score > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.case_id.cmp(&b.case_id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Deadline-bounding wrapper around a case index.
///
/// The query runs on a worker thread; a result arriving after the
/// deadline is discarded with the thread. One slow upstream must never
/// stall an unrelated session.
pub struct BoundedCaseIndex {
    inner: Arc<dyn CaseIndex>,
    timeout: Duration,
}

impl BoundedCaseIndex {
    pub fn new(inner: Arc<dyn CaseIndex>, timeout: Duration) -> Self {
        BoundedCaseIndex { inner, timeout }
    }
}

impl CaseIndex for BoundedCaseIndex {
    fn search(&self, symptoms: &[String], top_k: usize) -> Result<Vec<SimilarCase>> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let query: Vec<String> = symptoms.to_vec();
        std::thread::spawn(move || {
            let _ = tx.send(inner.search(&query, top_k));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(_) => Err(Error::UpstreamTimeout {
                provider: "case-index".to_string(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

/// Query the index, degrading to an empty result set on any failure.
///
/// Returns the cases plus a flag indicating whether retrieval degraded
/// (surfaced later as an uncertainty factor).
pub fn search_degraded(
    index: &dyn CaseIndex,
    symptoms: &[String],
    top_k: usize,
) -> (Vec<SimilarCase>, bool) {
    match index.search(symptoms, top_k) {
        Ok(cases) => (cases, false),
        Err(err) => {
            warn!(%err, "similar-case retrieval degraded to empty result");
            (Vec::new(), true)
        }
    }
}
