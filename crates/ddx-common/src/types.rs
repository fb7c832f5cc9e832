//! Wire-contract enums shared between the engine and its callers.

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Geographic region used to key epidemiological priors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    #[default]
    Global,
    SouthAsia,
    SoutheastAsia,
    EastAsia,
    SubSaharanAfrica,
    LatinAmerica,
    NorthAmerica,
    Europe,
    Oceania,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Global => "global",
            Region::SouthAsia => "south_asia",
            Region::SoutheastAsia => "southeast_asia",
            Region::EastAsia => "east_asia",
            Region::SubSaharanAfrica => "sub_saharan_africa",
            Region::LatinAmerica => "latin_america",
            Region::NorthAmerica => "north_america",
            Region::Europe => "europe",
            Region::Oceania => "oceania",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "global" | "" => Ok(Region::Global),
            "south_asia" => Ok(Region::SouthAsia),
            "southeast_asia" => Ok(Region::SoutheastAsia),
            "east_asia" => Ok(Region::EastAsia),
            "sub_saharan_africa" | "africa" => Ok(Region::SubSaharanAfrica),
            "latin_america" | "south_america" => Ok(Region::LatinAmerica),
            "north_america" => Ok(Region::NorthAmerica),
            "europe" => Ok(Region::Europe),
            "oceania" => Ok(Region::Oceania),
            other => Err(format!("unknown region: {other}")),
        }
    }
}

/// Qualitative outcome of a completed diagnostic test.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Positive,
    Negative,
}

impl TestOutcome {
    pub fn is_positive(&self) -> bool {
        matches!(self, TestOutcome::Positive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestOutcome::Positive => "positive",
            TestOutcome::Negative => "negative",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TestOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the loose spellings clients have historically sent.
        match s.trim().to_lowercase().as_str() {
            "positive" | "pos" | "true" | "yes" | "1" => Ok(TestOutcome::Positive),
            "negative" | "neg" | "false" | "no" | "0" => Ok(TestOutcome::Negative),
            other => Err(format!("unknown test outcome: {other}")),
        }
    }
}

/// Lifecycle state of a diagnostic session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    InProgress,
    Completed,
    Expired,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::InProgress)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::InProgress => write!(f, "in_progress"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Expired => write!(f, "expired"),
        }
    }
}

/// Confidence score threshold for the `High` level.
///
/// Shared contract with the presentation layer's color coding; clients
/// must not rederive these breakpoints.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.70;

/// Confidence score threshold for the `Medium` level.
pub const MEDIUM_CONFIDENCE_THRESHOLD: f64 = 0.40;

/// Discretized confidence level for a terminal diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Map a confidence score to its level using the shared thresholds.
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_CONFIDENCE_THRESHOLD {
            ConfidenceLevel::High
        } else if score >= MEDIUM_CONFIDENCE_THRESHOLD {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "High"),
            ConfidenceLevel::Medium => write!(f, "Medium"),
            ConfidenceLevel::Low => write!(f, "Low"),
        }
    }
}

/// Supported output formats for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Compact JSON (default for machine consumption)
    #[default]
    Json,

    /// Indented JSON for terminals
    Pretty,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Pretty => write!(f, "pretty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_parse_accepts_variants() {
        assert_eq!("South Asia".parse::<Region>().unwrap(), Region::SouthAsia);
        assert_eq!("south-asia".parse::<Region>().unwrap(), Region::SouthAsia);
        assert_eq!("GLOBAL".parse::<Region>().unwrap(), Region::Global);
        assert!("atlantis".parse::<Region>().is_err());
    }

    #[test]
    fn region_serde_snake_case() {
        let json = serde_json::to_string(&Region::SubSaharanAfrica).unwrap();
        assert_eq!(json, "\"sub_saharan_africa\"");
        let back: Region = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Region::SubSaharanAfrica);
    }

    #[test]
    fn outcome_parse_accepts_loose_spellings() {
        assert_eq!("pos".parse::<TestOutcome>().unwrap(), TestOutcome::Positive);
        assert_eq!("YES".parse::<TestOutcome>().unwrap(), TestOutcome::Positive);
        assert_eq!("0".parse::<TestOutcome>().unwrap(), TestOutcome::Negative);
        assert!("maybe".parse::<TestOutcome>().is_err());
    }

    #[test]
    fn confidence_level_thresholds() {
        assert_eq!(ConfidenceLevel::from_score(0.70), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.69), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.40), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.39), ConfidenceLevel::Low);
    }

    #[test]
    fn session_state_terminality() {
        assert!(!SessionState::InProgress.is_terminal());
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Expired.is_terminal());
    }
}
