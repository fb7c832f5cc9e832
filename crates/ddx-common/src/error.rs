//! Error types for the DDX diagnostic engine.
//!
//! Structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for clients
//!
//! Session-lifecycle violations map to 4xx-equivalent signals; upstream
//! degradations never surface here at all — the engine absorbs them and
//! notes them in the final trust report instead.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type alias for DDX engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed request input (missing symptoms, bad month, ...).
    Validation,
    /// Knowledge-base loading and validation errors.
    Config,
    /// Session lifecycle errors.
    Session,
    /// Test submission errors.
    Test,
    /// External collaborator (imaging, case index) errors.
    Upstream,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Session => write!(f, "session"),
            ErrorCategory::Test => write!(f, "test"),
            ErrorCategory::Upstream => write!(f, "upstream"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the DDX engine.
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors (10-19)
    #[error("validation error: {0}")]
    Validation(String),

    // Configuration errors (11-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid knowledge base: {0}")]
    InvalidKnowledgeBase(String),

    // Session errors (20-29)
    #[error("session not found: {session_id}")]
    UnknownSession { session_id: String },

    #[error("session expired: {session_id}")]
    SessionExpired { session_id: String },

    #[error("session already completed: {session_id}")]
    SessionCompleted { session_id: String },

    // Test errors (30-39)
    #[error("test not on the recommended slate: {test_id}")]
    UnknownTest { test_id: String },

    #[error("test already completed: {test_id}")]
    AlreadyCompleted { test_id: String },

    // Upstream errors (40-49)
    #[error("{provider} timed out after {seconds}s")]
    UpstreamTimeout { provider: String, seconds: u64 },

    #[error("{provider} unavailable: {message}")]
    UpstreamUnavailable { provider: String, message: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// Codes are grouped by category:
    /// - 10-19: Validation and configuration
    /// - 20-29: Session lifecycle
    /// - 30-39: Test submission
    /// - 40-49: Upstream collaborators
    /// - 60-69: I/O
    pub fn code(&self) -> u32 {
        match self {
            Error::Validation(_) => 10,
            Error::Config(_) => 11,
            Error::InvalidKnowledgeBase(_) => 12,
            Error::UnknownSession { .. } => 20,
            Error::SessionExpired { .. } => 21,
            Error::SessionCompleted { .. } => 22,
            Error::UnknownTest { .. } => 30,
            Error::AlreadyCompleted { .. } => 31,
            Error::UpstreamTimeout { .. } => 40,
            Error::UpstreamUnavailable { .. } => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation(_) => ErrorCategory::Validation,

            Error::Config(_) | Error::InvalidKnowledgeBase(_) => ErrorCategory::Config,

            Error::UnknownSession { .. }
            | Error::SessionExpired { .. }
            | Error::SessionCompleted { .. } => ErrorCategory::Session,

            Error::UnknownTest { .. } | Error::AlreadyCompleted { .. } => ErrorCategory::Test,

            Error::UpstreamTimeout { .. } | Error::UpstreamUnavailable { .. } => {
                ErrorCategory::Upstream
            }

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable by the caller.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Fix the request and resend.
            Error::Validation(_) => true,
            Error::Config(_) => true,
            Error::InvalidKnowledgeBase(_) => true,

            // Restart from the stored raw symptoms.
            Error::UnknownSession { .. } => true,
            Error::SessionExpired { .. } => true,
            // The terminal report already exists; nothing to retry.
            Error::SessionCompleted { .. } => false,

            // Client replay bugs; retrying the same call cannot succeed.
            Error::UnknownTest { .. } => false,
            Error::AlreadyCompleted { .. } => false,

            // Transient by definition.
            Error::UpstreamTimeout { .. } => true,
            Error::UpstreamUnavailable { .. } => true,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Validation(_) => "Invalid Request",
            Error::Config(_) => "Configuration Error",
            Error::InvalidKnowledgeBase(_) => "Invalid Knowledge Base",
            Error::UnknownSession { .. } => "Session Not Found",
            Error::SessionExpired { .. } => "Session Expired",
            Error::SessionCompleted { .. } => "Session Already Completed",
            Error::UnknownTest { .. } => "Unknown Test",
            Error::AlreadyCompleted { .. } => "Test Already Completed",
            Error::UpstreamTimeout { .. } => "Upstream Timeout",
            Error::UpstreamUnavailable { .. } => "Upstream Unavailable",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }

    /// Process exit code for CLI error reporting.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Validation => 2,
            ErrorCategory::Session => 3,
            ErrorCategory::Test => 4,
            ErrorCategory::Upstream => 5,
            ErrorCategory::Config => 6,
            ErrorCategory::Io => 7,
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g. session id, test id).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = BTreeMap::new();

        match err {
            Error::UnknownSession { session_id }
            | Error::SessionExpired { session_id }
            | Error::SessionCompleted { session_id } => {
                context.insert("session_id".to_string(), serde_json::json!(session_id));
            }
            Error::UnknownTest { test_id } | Error::AlreadyCompleted { test_id } => {
                context.insert("test_id".to_string(), serde_json::json!(test_id));
            }
            Error::UpstreamTimeout { provider, seconds } => {
                context.insert("provider".to_string(), serde_json::json!(provider));
                context.insert("timeout_seconds".to_string(), serde_json::json!(seconds));
            }
            Error::UpstreamUnavailable { provider, .. } => {
                context.insert("provider".to_string(), serde_json::json!(provider));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, reset) = if use_color {
        ("\x1b[31m", "\x1b[0m")
    } else {
        ("", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}",
        red = red,
        reset = reset,
        headline = err.headline(),
        message = err,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(Error::Validation("x".into()).code(), 10);
        assert_eq!(
            Error::UnknownSession {
                session_id: "s".into()
            }
            .code(),
            20
        );
        assert_eq!(
            Error::AlreadyCompleted {
                test_id: "T001".into()
            }
            .code(),
            31
        );
    }

    #[test]
    fn error_categories_group_correctly() {
        assert_eq!(
            Error::UnknownTest {
                test_id: "T009".into()
            }
            .category(),
            ErrorCategory::Test
        );
        assert_eq!(
            Error::UpstreamTimeout {
                provider: "case-index".into(),
                seconds: 2
            }
            .category(),
            ErrorCategory::Upstream
        );
    }

    #[test]
    fn replay_bugs_are_not_recoverable() {
        assert!(!Error::AlreadyCompleted {
            test_id: "T001".into()
        }
        .is_recoverable());
        assert!(!Error::UnknownTest {
            test_id: "T001".into()
        }
        .is_recoverable());
        assert!(Error::SessionExpired {
            session_id: "s".into()
        }
        .is_recoverable());
    }

    #[test]
    fn structured_error_carries_context() {
        let err = Error::AlreadyCompleted {
            test_id: "T003".into(),
        };
        let structured = StructuredError::from(&err);
        assert_eq!(structured.code, 31);
        assert_eq!(
            structured.context.get("test_id"),
            Some(&serde_json::json!("T003"))
        );
        assert!(structured.to_json().contains(r#""code":31"#));
    }

    #[test]
    fn format_error_human_includes_headline() {
        let err = Error::UnknownSession {
            session_id: "abc".into(),
        };
        let formatted = format_error_human(&err, false);
        assert!(formatted.contains("Session Not Found"));
        assert!(formatted.contains("abc"));
    }

    #[test]
    fn exit_codes_by_category() {
        assert_eq!(Error::Validation("x".into()).exit_code(), 2);
        assert_eq!(
            Error::UnknownSession {
                session_id: "s".into()
            }
            .exit_code(),
            3
        );
    }
}
