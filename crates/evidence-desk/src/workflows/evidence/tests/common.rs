use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::config::ExportConfig;
use crate::workflows::evidence::persistence::{
    MemoryStateStore, PersistedState, PersistenceError, StateStore,
};
use crate::workflows::evidence::{
    evidence_router, EvidenceDeskService, EvidenceFetcher, EvidenceItem, EvidenceRequest,
    FetchError, FetchedPayload, RequestStatus,
};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn audit_day() -> NaiveDate {
    date(2025, 10, 8)
}

pub(super) fn evidence(id: &str, link: &str) -> EvidenceItem {
    EvidenceItem {
        id: id.to_string(),
        category: "Finance".to_string(),
        description: format!("Ledger extract {id}"),
        source_link: link.to_string(),
        unit: "Finance".to_string(),
        responsible_party: "R. Santoso".to_string(),
        ..EvidenceItem::default()
    }
}

pub(super) fn request(id: &str, deadline: &str, links: &[&str]) -> EvidenceRequest {
    EvidenceRequest {
        id: id.to_string(),
        request_date: Some(date(2025, 9, 29)),
        unit: "Finance".to_string(),
        description: format!("Audit request {id}"),
        deadline_date: deadline.to_string(),
        responsible_party: "Internal Audit".to_string(),
        linked_evidence_ids: links.iter().map(|link| link.to_string()).collect(),
        ..EvidenceRequest::default()
    }
}

/// Two evidence items, one pending request, and one fulfilled request.
pub(super) fn seeded_state() -> PersistedState {
    let mut fulfilled = request("PRM-002", "2025-10-01", &["BKT-001", "BKT-002"]);
    fulfilled.status = RequestStatus::Fulfilled;
    fulfilled.fulfillment_date = Some(date(2025, 10, 2));

    PersistedState {
        evidence: vec![
            evidence("BKT-001", "https://files.example.com/ledger.pdf"),
            evidence("BKT-002", "https://files.example.com/missing.pdf"),
        ],
        requests: vec![request("PRM-001", "2025-10-10", &["BKT-001"]), fulfilled],
        threshold: 7,
    }
}

#[derive(Debug, Default)]
pub(super) struct MemoryFetcher {
    payloads: HashMap<String, FetchedPayload>,
    calls: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub(super) fn with_payload(mut self, url: &str, bytes: &[u8], content_type: &str) -> Self {
        self.payloads.insert(
            url.to_string(),
            FetchedPayload {
                bytes: bytes.to_vec(),
                content_type: Some(content_type.to_string()),
            },
        );
        self
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("fetcher mutex poisoned").clone()
    }
}

#[async_trait]
impl EvidenceFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPayload, FetchError> {
        self.calls
            .lock()
            .expect("fetcher mutex poisoned")
            .push(url.to_string());
        self.payloads
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

pub(super) fn ledger_fetcher() -> MemoryFetcher {
    MemoryFetcher::default().with_payload(
        "https://files.example.com/ledger.pdf",
        b"%PDF-1.7 ledger",
        "application/pdf",
    )
}

/// Rejects every save, for checking that failed writes leave the desk untouched.
#[derive(Debug, Default)]
pub(super) struct ReadOnlyStateStore {
    pub(super) state: Option<PersistedState>,
}

impl StateStore for ReadOnlyStateStore {
    fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        Ok(self.state.clone())
    }

    fn save(&self, _state: &PersistedState) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("read only".to_string()))
    }
}

pub(super) type MemoryDesk = EvidenceDeskService<MemoryStateStore, MemoryFetcher>;

pub(super) fn export_config() -> ExportConfig {
    ExportConfig {
        concurrency: 2,
        fetch_timeout: Duration::from_secs(5),
    }
}

pub(super) fn build_service(
    state: PersistedState,
    fetcher: MemoryFetcher,
) -> (Arc<MemoryDesk>, Arc<MemoryStateStore>, Arc<MemoryFetcher>) {
    let store = Arc::new(MemoryStateStore::with_state(state));
    let fetcher = Arc::new(fetcher);
    let service = EvidenceDeskService::load(store.clone(), fetcher.clone(), 7, &export_config())
        .expect("service loads");
    (Arc::new(service), store, fetcher)
}

pub(super) fn evidence_router_with_state(state: PersistedState) -> axum::Router {
    let (service, _, _) = build_service(state, ledger_fetcher());
    evidence_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}
