//! Probability primitives for candidate distributions and test updates.
//!
//! Candidate sets in a diagnostic session are small (≤ ~20 entries), so
//! everything here works in linear space; the immediate renormalization
//! after each evidence application keeps values well away from underflow.

/// Tolerance used when asserting a distribution sums to 1.0.
pub const PROB_TOLERANCE: f64 = 1e-6;

/// Mass below which a distribution is treated as degenerate.
const DEGENERATE_MASS: f64 = 1e-12;

/// Normalize `probs` in place so they sum to 1.0.
///
/// Returns `false` and leaves the slice untouched when the total mass is
/// degenerate (all zero, or NaN contamination); an empty slice is trivially
/// normalized and returns `true`.
pub fn normalize(probs: &mut [f64]) -> bool {
    if probs.is_empty() {
        return true;
    }
    let sum: f64 = probs.iter().sum();
    if !sum.is_finite() || sum <= DEGENERATE_MASS {
        return false;
    }
    for p in probs.iter_mut() {
        *p /= sum;
    }
    true
}

/// Shannon entropy (nats) of a probability distribution.
///
/// Zero entries contribute nothing; the input is assumed normalized.
pub fn shannon_entropy(probs: &[f64]) -> f64 {
    probs
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| -p * p.ln())
        .sum()
}

/// Likelihood of observing `positive` from a test with the given
/// sensitivity and specificity, conditioned on disease presence.
///
/// - has disease: `se` if positive, `1 - se` if negative
/// - no disease:  `1 - sp` if positive, `sp` if negative
pub fn outcome_likelihood(positive: bool, has_disease: bool, se: f64, sp: f64) -> f64 {
    match (positive, has_disease) {
        (true, true) => se,
        (false, true) => 1.0 - se,
        (true, false) => 1.0 - sp,
        (false, false) => sp,
    }
}

/// Marginal probability of a positive result given prior `p` on the target.
pub fn positive_probability(p: f64, se: f64, sp: f64) -> f64 {
    se * p + (1.0 - sp) * (1.0 - p)
}

/// Binary Bayesian posterior for the target disease alone.
///
/// `P(D | result)` for a test with the given sensitivity/specificity and a
/// prior `p` on D. This is the two-hypothesis form (D vs. not-D); the
/// candidate-list update generalizes it across the full differential.
pub fn bayes_posterior(p: f64, se: f64, sp: f64, positive: bool) -> f64 {
    let lik_d = outcome_likelihood(positive, true, se, sp);
    let lik_not_d = outcome_likelihood(positive, false, se, sp);
    let numerator = lik_d * p;
    let denominator = numerator + lik_not_d * (1.0 - p);
    if denominator <= DEGENERATE_MASS {
        return p;
    }
    numerator / denominator
}

/// Approximate equality within `tol`.
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}
