//! Diagnostic session state and the session store.
//!
//! Each session is an independently mutable unit of state. Operations on
//! different sessions run fully concurrently; operations on the same
//! session serialize on a per-session mutex held for the duration of the
//! mutation (and released on every exit path). Reads take a cloned
//! snapshot under the same mutex, so a concurrent writer can never
//! expose a torn candidate list.
//!
//! The store is the single source of truth: with a disk root configured,
//! every mutation persists the full session document, and a restarted
//! process resumes purely from `get_status` — no client-side cache
//! required.

use crate::candidate::Candidate;
use crate::fusion::ImagingEvidence;
use crate::prior::ContextualFactors;
use crate::recommend::RecommendedTest;
use chrono::{DateTime, Duration, Utc};
use ddx_common::{DiseaseId, Error, Region, Result, SessionId, SessionState, TestId, TestOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

/// A resolved test recorded in the session's completed-tests mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CompletedTest {
    pub test_id: TestId,
    pub name: String,
    pub disease_id: DiseaseId,
    pub disease_name: String,
    pub outcome: TestOutcome,
    pub cost: f64,
}

/// One entry of the session's chronological evidence trace.
///
/// The trust scorer replays this to build the reasoning chain, so each
/// variant carries exactly what its sentence needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    SymptomPrior {
        symptoms: Vec<String>,
        candidate_count: usize,
    },
    SeasonalModifier {
        region: Region,
        month: Option<u8>,
    },
    FamilyHistory {
        diseases: Vec<String>,
    },
    GenomicModifier {
        variants: Vec<String>,
        diseases: Vec<String>,
    },
    ImagingBoost {
        label: String,
        disease: String,
        confidence: f64,
    },
    ImagingInsertion {
        label: String,
        disease: String,
        confidence: f64,
    },
    TestCompleted {
        test_id: TestId,
        name: String,
        disease: String,
        outcome: TestOutcome,
        lead_probability: f64,
    },
}

/// Full state of one diagnostic session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticSession {
    pub schema_version: String,
    pub id: SessionId,
    pub state: SessionState,

    pub symptoms: Vec<String>,
    pub region: Region,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
    #[serde(default)]
    pub family_history: Vec<String>,
    #[serde(default)]
    pub genetic_variants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imaging: Option<ImagingEvidence>,

    pub contextual_factors: ContextualFactors,
    pub candidates: Vec<Candidate>,
    pub recommended_tests: Vec<RecommendedTest>,
    pub completed_tests: BTreeMap<String, CompletedTest>,
    pub total_cost: f64,

    #[serde(default)]
    pub events: Vec<SessionEvent>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Terminal artifact, stored once and returned verbatim thereafter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<crate::engine::ResultResponse>,
}

impl DiagnosticSession {
    pub fn is_in_progress(&self) -> bool {
        self.state == SessionState::InProgress
    }
}

fn lock_unpoisoned(entry: &Arc<Mutex<DiagnosticSession>>) -> MutexGuard<'_, DiagnosticSession> {
    entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory session registry with optional disk persistence.
pub struct SessionStore {
    root: Option<PathBuf>,
    retention: Duration,
    sessions: RwLock<HashMap<String, Arc<Mutex<DiagnosticSession>>>>,
}

impl SessionStore {
    /// Purely in-memory store (tests, embedded use).
    pub fn in_memory(retention: Duration) -> Self {
        SessionStore {
            root: None,
            retention,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Disk-backed store persisting one JSON document per session.
    pub fn at_dir(root: PathBuf, retention: Duration) -> Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(SessionStore {
            root: Some(root),
            retention,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    fn session_path(&self, id: &str) -> Option<PathBuf> {
        self.root.as_ref().map(|r| r.join(format!("{id}.json")))
    }

    fn persist(&self, session: &DiagnosticSession) -> Result<()> {
        if let Some(path) = self.session_path(&session.id.0) {
            let body = serde_json::to_vec_pretty(session)?;
            std::fs::write(&path, body)?;
            debug!(session_id = %session.id, path = %path.display(), "session persisted");
        }
        Ok(())
    }

    fn load_from_disk(&self, id: &str) -> Option<DiagnosticSession> {
        let path = self.session_path(id)?;
        let raw = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<DiagnosticSession>(&raw) {
            Ok(session) => Some(session),
            Err(err) => {
                warn!(session_id = %id, %err, "failed to parse persisted session");
                None
            }
        }
    }

    /// Register a freshly started session.
    pub fn insert(&self, session: DiagnosticSession) -> Result<()> {
        self.persist(&session)?;
        let id = session.id.0.clone();
        let mut map = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.insert(id, Arc::new(Mutex::new(session)));
        Ok(())
    }

    fn entry(&self, id: &str) -> Result<Arc<Mutex<DiagnosticSession>>> {
        {
            let map = self
                .sessions
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(entry) = map.get(id) {
                return Ok(Arc::clone(entry));
            }
        }
        // Fall back to disk so a restarted process can resume.
        if let Some(session) = self.load_from_disk(id) {
            let mut map = self
                .sessions
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let entry = map
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(session)));
            return Ok(Arc::clone(entry));
        }
        Err(Error::UnknownSession {
            session_id: id.to_string(),
        })
    }

    /// Expire the session in place when its retention window has lapsed.
    fn ensure_live(&self, session: &mut DiagnosticSession) -> Result<()> {
        if session.state == SessionState::Expired {
            return Err(Error::UnknownSession {
                session_id: session.id.0.clone(),
            });
        }
        let age = Utc::now().signed_duration_since(session.created_at);
        if age >= self.retention {
            info!(session_id = %session.id, "session aged out of retention window");
            session.state = SessionState::Expired;
            session.updated_at = Utc::now();
            let _ = self.persist(session);
            return Err(Error::UnknownSession {
                session_id: session.id.0.clone(),
            });
        }
        Ok(())
    }

    /// Consistent read snapshot of a live session.
    pub fn snapshot(&self, id: &str) -> Result<DiagnosticSession> {
        let entry = self.entry(id)?;
        let mut guard = lock_unpoisoned(&entry);
        self.ensure_live(&mut guard)?;
        Ok(guard.clone())
    }

    /// Run a serialized mutation against a live session.
    ///
    /// The per-session mutex is held for the whole closure and released
    /// on every exit path; the document persists only when the closure
    /// succeeds.
    pub fn with_session<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut DiagnosticSession) -> Result<T>,
    ) -> Result<T> {
        let entry = self.entry(id)?;
        let mut guard = lock_unpoisoned(&entry);
        self.ensure_live(&mut guard)?;
        let value = f(&mut guard)?;
        self.persist(&guard)?;
        Ok(value)
    }
}
