//! Knowledge-base resolution and loading.
//!
//! Resolution order: explicit path → `DDX_KB` environment variable →
//! built-in defaults. A file that exists but fails to parse or validate
//! is an error, never a silent fallback.

use crate::catalog::KnowledgeBase;
use crate::defaults;
use crate::validate::validate_knowledge_base;
use ddx_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable overriding the knowledge-base path.
pub const ENV_KB_PATH: &str = "DDX_KB";

/// Where the knowledge base was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KbSource {
    /// Explicitly provided path (CLI argument).
    Path(PathBuf),
    /// Path from the `DDX_KB` environment variable.
    Environment(PathBuf),
    /// Built-in defaults compiled into the binary.
    Builtin,
}

impl std::fmt::Display for KbSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KbSource::Path(p) => write!(f, "file {}", p.display()),
            KbSource::Environment(p) => write!(f, "env {} ({})", ENV_KB_PATH, p.display()),
            KbSource::Builtin => write!(f, "builtin default"),
        }
    }
}

/// Load a knowledge base from a JSON file and validate it.
pub fn load_from_path(path: &Path) -> Result<KnowledgeBase> {
    let raw = std::fs::read_to_string(path)?;
    let kb: KnowledgeBase = serde_json::from_str(&raw)?;
    validate_knowledge_base(&kb).map_err(|e| Error::InvalidKnowledgeBase(e.to_string()))?;
    Ok(kb)
}

/// Resolve and load the knowledge base.
///
/// `explicit` wins over the environment; with neither set, the built-in
/// defaults are used.
pub fn load_knowledge_base(explicit: Option<&Path>) -> Result<(KnowledgeBase, KbSource)> {
    if let Some(path) = explicit {
        let kb = load_from_path(path)?;
        info!(path = %path.display(), "loaded knowledge base");
        return Ok((kb, KbSource::Path(path.to_path_buf())));
    }

    if let Ok(env_path) = std::env::var(ENV_KB_PATH) {
        if !env_path.trim().is_empty() {
            let path = PathBuf::from(env_path);
            let kb = load_from_path(&path)?;
            info!(path = %path.display(), "loaded knowledge base from environment");
            return Ok((kb, KbSource::Environment(path)));
        }
    }

    Ok((defaults::builtin(), KbSource::Builtin))
}
