//! Symptom extraction into the canonical code set.
//!
//! Matching is case-insensitive substring matching against each
//! vocabulary code and its space-separated variant ("joint_pain" /
//! "joint pain"). Unmatched text contributes nothing; an empty result is
//! a valid outcome, not an error.

use ddx_config::KnowledgeBase;

/// Scan `text` for vocabulary codes, appending hits to `out` in
/// vocabulary order without duplicates.
fn scan_into(kb: &KnowledgeBase, text: &str, out: &mut Vec<String>) {
    let haystack = text.to_lowercase();
    for code in &kb.vocabulary {
        let spaced = code.replace('_', " ");
        if haystack.contains(code.as_str()) || haystack.contains(spaced.as_str()) {
            if !out.contains(code) {
                out.push(code.clone());
            }
        }
    }
}

/// Extract canonical symptom codes from explicit labels and/or free text.
///
/// Falls back to comma-splitting the free text when keyword scanning
/// matches nothing, keeping only fragments that normalize to vocabulary
/// codes.
pub fn extract_symptoms(
    kb: &KnowledgeBase,
    labels: &[String],
    free_text: Option<&str>,
) -> Vec<String> {
    let mut codes = Vec::new();

    for label in labels {
        scan_into(kb, label, &mut codes);
    }
    if let Some(text) = free_text {
        scan_into(kb, text, &mut codes);
    }

    if codes.is_empty() {
        if let Some(text) = free_text {
            for fragment in text.split(',') {
                let normalized = fragment.trim().to_lowercase().replace([' ', '-'], "_");
                if kb.vocabulary.contains(&normalized) && !codes.contains(&normalized) {
                    codes.push(normalized);
                }
            }
        }
    }

    codes
}
