use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::bundle::{BundleError, BundleExporter, EvidenceBundle, EvidenceFetcher};
use super::deadline::{DeadlineEngine, DeadlineSummary, DeadlineView};
use super::domain::{EvidenceItem, EvidenceRequest};
use super::persistence::{parse_import, ImportError, PersistedState, PersistenceError, StateStore};
use super::report::{evidence_listing_csv, request_listing_csv, DashboardSummary};
use super::store::{EvidenceStore, StoreError, UpsertOutcome};
use crate::config::ExportConfig;

/// A record after it was written, and whether it was new.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedRecord<T> {
    pub created: bool,
    pub record: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub evidence: usize,
    pub requests: usize,
    pub threshold: u32,
}

/// Deadline board for every request as of `today`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineOverview {
    pub today: NaiveDate,
    pub threshold: u32,
    pub summary: DeadlineSummary,
    pub requests: Vec<DeadlineView>,
}

/// Service composing the evidence store, its persistence backend, and the
/// bundle exporter. Every mutation is saved before it becomes visible.
pub struct EvidenceDeskService<S, F> {
    store: RwLock<EvidenceStore>,
    state: Arc<S>,
    exporter: BundleExporter<F>,
}

impl<S, F> EvidenceDeskService<S, F>
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    /// Loads saved state, starting empty with `default_threshold` when there is none.
    pub fn load(
        state: Arc<S>,
        fetcher: Arc<F>,
        default_threshold: u32,
        export: &ExportConfig,
    ) -> Result<Self, EvidenceServiceError> {
        let store = match state.load()? {
            Some(saved) => EvidenceStore::from_state(saved),
            None => EvidenceStore::new(default_threshold),
        };
        info!(
            evidence = store.evidence().len(),
            requests = store.requests().len(),
            threshold = store.threshold(),
            "evidence desk loaded"
        );

        Ok(Self {
            store: RwLock::new(store),
            state,
            exporter: BundleExporter::new(fetcher, export),
        })
    }

    fn read<T>(&self, view: impl FnOnce(&EvidenceStore) -> T) -> Result<T, EvidenceServiceError> {
        let guard = self
            .store
            .read()
            .map_err(|_| EvidenceServiceError::StateUnavailable)?;
        Ok(view(&guard))
    }

    /// Applies `change` to a draft, saves the draft, then swaps it in. A failed
    /// change or save leaves the live store untouched.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut EvidenceStore) -> Result<T, EvidenceServiceError>,
    ) -> Result<T, EvidenceServiceError> {
        let mut guard = self
            .store
            .write()
            .map_err(|_| EvidenceServiceError::StateUnavailable)?;
        let mut draft = guard.clone();
        let result = change(&mut draft)?;
        self.state.save(&draft.to_state())?;
        *guard = draft;
        Ok(result)
    }

    pub fn snapshot(&self) -> Result<EvidenceStore, EvidenceServiceError> {
        self.read(EvidenceStore::clone)
    }

    pub fn threshold(&self) -> Result<u32, EvidenceServiceError> {
        self.read(EvidenceStore::threshold)
    }

    pub fn find_evidence(&self, id: &str) -> Result<EvidenceItem, EvidenceServiceError> {
        self.read(|store| store.find_evidence(id).cloned())?
            .ok_or_else(|| EvidenceServiceError::EvidenceNotFound(id.to_string()))
    }

    pub fn find_request(&self, id: &str) -> Result<EvidenceRequest, EvidenceServiceError> {
        self.read(|store| store.find_request(id).cloned())?
            .ok_or_else(|| EvidenceServiceError::RequestNotFound(id.to_string()))
    }

    pub fn search_evidence(&self, query: &str) -> Result<Vec<EvidenceItem>, EvidenceServiceError> {
        self.read(|store| store.search_evidence(query).into_iter().cloned().collect())
    }

    pub fn search_requests(
        &self,
        query: &str,
    ) -> Result<Vec<EvidenceRequest>, EvidenceServiceError> {
        self.read(|store| store.search_requests(query).into_iter().cloned().collect())
    }

    /// Inserts or replaces an evidence item; a blank id gets the next `BKT-` id.
    pub fn save_evidence(
        &self,
        mut item: EvidenceItem,
    ) -> Result<SavedRecord<EvidenceItem>, EvidenceServiceError> {
        self.mutate(|store| {
            if item.id.trim().is_empty() {
                item.id = store.next_evidence_id();
            }
            let outcome = store.upsert_evidence(item.clone())?;
            Ok(SavedRecord {
                created: outcome == UpsertOutcome::Inserted,
                record: item,
            })
        })
    }

    /// Inserts or replaces a request; a blank id gets the next `PRM-` id.
    pub fn save_request(
        &self,
        mut request: EvidenceRequest,
    ) -> Result<SavedRecord<EvidenceRequest>, EvidenceServiceError> {
        self.mutate(|store| {
            if request.id.trim().is_empty() {
                request.id = store.next_request_id();
            }
            let outcome = store.upsert_request(request.clone())?;
            Ok(SavedRecord {
                created: outcome == UpsertOutcome::Inserted,
                record: request,
            })
        })
    }

    pub fn delete_evidence(&self, id: &str) -> Result<(), EvidenceServiceError> {
        self.mutate(|store| {
            if store.delete_evidence(id) {
                Ok(())
            } else {
                Err(EvidenceServiceError::EvidenceNotFound(id.to_string()))
            }
        })
    }

    pub fn delete_request(&self, id: &str) -> Result<(), EvidenceServiceError> {
        self.mutate(|store| {
            if store.delete_request(id) {
                Ok(())
            } else {
                Err(EvidenceServiceError::RequestNotFound(id.to_string()))
            }
        })
    }

    pub fn mark_fulfilled(
        &self,
        id: &str,
        today: NaiveDate,
    ) -> Result<EvidenceRequest, EvidenceServiceError> {
        self.mutate(|store| {
            if !store.mark_fulfilled(id, today) {
                return Err(EvidenceServiceError::RequestNotFound(id.to_string()));
            }
            store
                .find_request(id)
                .cloned()
                .ok_or_else(|| EvidenceServiceError::RequestNotFound(id.to_string()))
        })
    }

    pub fn set_threshold(&self, threshold: u32) -> Result<u32, EvidenceServiceError> {
        self.mutate(|store| {
            store.set_threshold(threshold);
            Ok(threshold)
        })
    }

    /// Both deadline channels for every request. `threshold` overrides the
    /// stored alert window for this view only.
    pub fn deadlines(
        &self,
        today: NaiveDate,
        threshold: Option<u32>,
    ) -> Result<DeadlineOverview, EvidenceServiceError> {
        let engine = DeadlineEngine::new(today);
        self.read(|store| {
            let threshold = threshold.unwrap_or_else(|| store.threshold());
            DeadlineOverview {
                today,
                threshold,
                summary: engine.summary(store.requests(), threshold),
                requests: store
                    .requests()
                    .iter()
                    .map(|request| engine.view(request, threshold))
                    .collect(),
            }
        })
    }

    pub fn dashboard(&self, today: NaiveDate) -> Result<DashboardSummary, EvidenceServiceError> {
        let engine = DeadlineEngine::new(today);
        self.read(|store| DashboardSummary::build(store, &engine))
    }

    pub fn export_state(&self) -> Result<PersistedState, EvidenceServiceError> {
        self.read(EvidenceStore::to_state)
    }

    /// Replaces both collections from an exported document. Nothing changes
    /// unless the whole document validates.
    pub fn import_state(&self, raw: &str) -> Result<ImportSummary, EvidenceServiceError> {
        let payload = parse_import(raw)?;
        self.mutate(move |store| {
            let threshold = payload.threshold.unwrap_or_else(|| store.threshold());
            *store = EvidenceStore::from_state(PersistedState {
                evidence: payload.evidence,
                requests: payload.requests,
                threshold,
            });
            info!(
                evidence = store.evidence().len(),
                requests = store.requests().len(),
                threshold,
                "evidence desk state imported"
            );
            Ok(ImportSummary {
                evidence: store.evidence().len(),
                requests: store.requests().len(),
                threshold,
            })
        })
    }

    pub async fn export_request_bundle(
        &self,
        id: &str,
    ) -> Result<EvidenceBundle, EvidenceServiceError> {
        let (request, evidence) = self.read(|store| {
            store
                .find_request(id)
                .cloned()
                .map(|request| (request, store.evidence().to_vec()))
        })?
        .ok_or_else(|| EvidenceServiceError::RequestNotFound(id.to_string()))?;

        Ok(self.exporter.export_request(&request, &evidence).await?)
    }

    /// Bundles every fulfilled request that links at least one evidence item.
    pub async fn export_fulfilled_bundle(
        &self,
        today: NaiveDate,
    ) -> Result<EvidenceBundle, EvidenceServiceError> {
        let (requests, evidence) = self.read(|store| {
            let requests: Vec<EvidenceRequest> =
                store.fulfilled_with_evidence().into_iter().cloned().collect();
            (requests, store.evidence().to_vec())
        })?;

        Ok(self
            .exporter
            .export_requests(&requests, &evidence, today)
            .await?)
    }

    pub fn evidence_csv(&self) -> Result<Vec<u8>, EvidenceServiceError> {
        let rendered = self.read(|store| evidence_listing_csv(store.evidence()))?;
        Ok(rendered?)
    }

    pub fn requests_csv(&self) -> Result<Vec<u8>, EvidenceServiceError> {
        let rendered = self.read(|store| request_listing_csv(store.requests()))?;
        Ok(rendered?)
    }
}

/// Error raised by the evidence desk service.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error("failed to render listing: {0}")]
    Listing(#[from] csv::Error),
    #[error("evidence {0} not found")]
    EvidenceNotFound(String),
    #[error("request {0} not found")]
    RequestNotFound(String),
    #[error("evidence store lock poisoned")]
    StateUnavailable,
}
