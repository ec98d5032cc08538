use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::domain::{EvidenceItem, EvidenceRequest, DEFAULT_ALERT_THRESHOLD_DAYS};

/// Everything the desk persists, and the shape of the JSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
    #[serde(default, alias = "permintaan")]
    pub requests: Vec<EvidenceRequest>,
    #[serde(default = "default_threshold")]
    pub threshold: u32,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            evidence: Vec::new(),
            requests: Vec::new(),
            threshold: DEFAULT_ALERT_THRESHOLD_DAYS,
        }
    }
}

fn default_threshold() -> u32 {
    DEFAULT_ALERT_THRESHOLD_DAYS
}

/// A validated import. `threshold` is `None` when the payload omitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPayload {
    pub evidence: Vec<EvidenceItem>,
    pub requests: Vec<EvidenceRequest>,
    pub threshold: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("import file is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("import file must contain a JSON object")]
    NotAnObject,
    #[error("import file has no evidence collection")]
    MissingEvidence,
    #[error("import file has no request collection (expected `requests` or `permintaan`)")]
    MissingRequests,
    #[error("import file has malformed {collection} records: {source}")]
    Malformed {
        collection: &'static str,
        source: serde_json::Error,
    },
}

/// Validates an exported JSON document before anything touches the store.
///
/// The request collection may be named `requests` or the legacy `permintaan`.
pub fn parse_import(raw: &str) -> Result<ImportPayload, ImportError> {
    let document: Value = serde_json::from_str(raw).map_err(ImportError::Json)?;
    let object = document.as_object().ok_or(ImportError::NotAnObject)?;

    let evidence = object
        .get("evidence")
        .filter(|value| value.is_array())
        .ok_or(ImportError::MissingEvidence)?;
    let requests = ["requests", "permintaan"]
        .iter()
        .find_map(|key| object.get(*key).filter(|value| value.is_array()))
        .ok_or(ImportError::MissingRequests)?;

    let evidence = Vec::<EvidenceItem>::deserialize(evidence).map_err(|source| {
        ImportError::Malformed {
            collection: "evidence",
            source,
        }
    })?;
    let requests = Vec::<EvidenceRequest>::deserialize(requests).map_err(|source| {
        ImportError::Malformed {
            collection: "request",
            source,
        }
    })?;
    let threshold = object
        .get("threshold")
        .and_then(Value::as_u64)
        .and_then(|value| u32::try_from(value).ok());

    Ok(ImportPayload {
        evidence,
        requests,
        threshold,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("unable to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("state file {path} is not valid: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unable to encode state: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

/// Blob storage for the desk state. `load` returns `None` when nothing has
/// been saved yet.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedState>, PersistenceError>;
    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError>;
}

/// Pretty-printed JSON file. Saves go through a sibling temp file and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };

        let state = serde_json::from_str(&raw).map_err(|source| PersistenceError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "state loaded");
        Ok(Some(state))
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_vec_pretty(state).map_err(PersistenceError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        fs::write(&staging, encoded).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))?;

        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

/// In-process state store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<PersistedState>>,
}

impl MemoryStateStore {
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| PersistenceError::Unavailable("state mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| PersistenceError::Unavailable("state mutex poisoned".to_string()))?;
        *guard = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_accepts_legacy_request_collection() {
        let payload = parse_import(
            r#"{"evidence":[{"id":"BKT-001"}],"permintaan":[{"id":"PRM-001","linkedEvidenceIds":["BKT-001"]}],"threshold":3}"#,
        )
        .expect("legacy payload imports");

        assert_eq!(payload.evidence.len(), 1);
        assert_eq!(payload.requests[0].linked_evidence_ids, vec!["BKT-001"]);
        assert_eq!(payload.threshold, Some(3));
    }

    #[test]
    fn import_rejects_unreadable_record_dates() {
        let result = parse_import(
            r#"{"evidence":[{"id":"BKT-001","receivedDate":"15/10/2025"}],"requests":[{"id":"PRM-001","requestDate":"10/01/2025"}]}"#,
        );
        assert!(matches!(
            result,
            Err(ImportError::Malformed {
                collection: "evidence",
                ..
            })
        ));

        let result = parse_import(
            r#"{"evidence":[],"requests":[{"id":"PRM-001","requestDate":"10/01/2025"}]}"#,
        );
        assert!(matches!(
            result,
            Err(ImportError::Malformed {
                collection: "request",
                ..
            })
        ));
    }

    #[test]
    fn import_rejects_missing_collections() {
        assert!(matches!(
            parse_import(r#"{"requests":[]}"#),
            Err(ImportError::MissingEvidence)
        ));
        assert!(matches!(
            parse_import(r#"{"evidence":[]}"#),
            Err(ImportError::MissingRequests)
        ));
        assert!(matches!(
            parse_import(r#"{"evidence":{},"requests":[]}"#),
            Err(ImportError::MissingEvidence)
        ));
        assert!(matches!(parse_import("[]"), Err(ImportError::NotAnObject)));
        assert!(matches!(parse_import("{"), Err(ImportError::Json(_))));
    }

    #[test]
    fn import_reports_malformed_records() {
        let error = parse_import(r#"{"evidence":[{"description":"no id"}],"requests":[]}"#)
            .expect_err("evidence without id rejected");
        assert!(matches!(
            error,
            ImportError::Malformed {
                collection: "evidence",
                ..
            }
        ));
    }

    #[test]
    fn state_defaults_missing_threshold_and_compact_deadline() {
        let state: PersistedState =
            serde_json::from_str(r#"{"evidence":[],"requests":[{"id":"PRM-001","deadlineDate":"2025-10-10"}]}"#)
                .expect("older state loads");
        assert_eq!(state.threshold, DEFAULT_ALERT_THRESHOLD_DAYS);
        assert_eq!(state.requests[0].deadline_alt, "");
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStateStore::default();
        assert_eq!(store.load().expect("load"), None);

        let state = PersistedState {
            threshold: 2,
            ..PersistedState::default()
        };
        store.save(&state).expect("save");
        assert_eq!(store.load().expect("load"), Some(state));
    }
}
