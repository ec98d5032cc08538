//! Audit evidence desk: the evidence bank, tracked requests, deadline alerts,
//! and evidence bundle export.

pub mod bundle;
pub mod deadline;
pub mod domain;
pub mod persistence;
pub mod report;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use bundle::{
    BundleError, BundleExporter, BundleFailure, EvidenceBundle, EvidenceFetcher, FetchError,
    FetchedPayload, HttpEvidenceFetcher,
};
pub use deadline::{
    parse_calendar_date, parse_compact_date, ChannelView, DeadlineChannel, DeadlineEngine,
    DeadlineSummary, DeadlineView, Proximity,
};
pub use domain::{
    next_id, EvidenceItem, EvidenceRequest, RequestStatus, Validity,
    DEFAULT_ALERT_THRESHOLD_DAYS, EVIDENCE_PREFIX, REQUEST_PREFIX,
};
pub use persistence::{
    parse_import, ImportError, ImportPayload, JsonFileStateStore, MemoryStateStore,
    PersistedState, PersistenceError, StateStore,
};
pub use report::DashboardSummary;
pub use router::evidence_router;
pub use service::{
    DeadlineOverview, EvidenceDeskService, EvidenceServiceError, ImportSummary, SavedRecord,
};
pub use store::{DanglingReference, EvidenceStore, StoreError, UpsertOutcome};
