use std::sync::Arc;

use super::common::*;
use crate::workflows::evidence::bundle::{read_bundle, FAILURES_FILE};
use crate::workflows::evidence::persistence::{PersistedState, StateStore};
use crate::workflows::evidence::{
    EvidenceDeskService, EvidenceItem, EvidenceServiceError, ImportError, Proximity,
    RequestStatus,
};

#[test]
fn blank_ids_receive_the_next_sequence_number() {
    let (service, store, _) = build_service(seeded_state(), MemoryFetcher::default());

    let saved = service
        .save_evidence(EvidenceItem {
            description: "Signed access review".to_string(),
            ..EvidenceItem::default()
        })
        .expect("evidence saved");

    assert!(saved.created);
    assert_eq!(saved.record.id, "BKT-003");
    let persisted = store.load().expect("load").expect("state saved");
    assert_eq!(persisted.evidence.len(), 3);
}

#[test]
fn saving_an_existing_id_replaces_it() {
    let (service, _, _) = build_service(seeded_state(), MemoryFetcher::default());
    let mut item = evidence("BKT-001", "https://files.example.com/ledger-v2.pdf");
    item.note = "re-issued".to_string();

    let saved = service.save_evidence(item).expect("evidence saved");

    assert!(!saved.created);
    let stored = service.find_evidence("BKT-001").expect("still present");
    assert_eq!(stored.note, "re-issued");
    assert_eq!(service.search_evidence("").expect("search").len(), 2);
}

#[test]
fn deleting_evidence_unlinks_it_everywhere() {
    let (service, _, _) = build_service(seeded_state(), MemoryFetcher::default());

    service.delete_evidence("BKT-001").expect("deleted");

    let snapshot = service.snapshot().expect("snapshot");
    assert!(snapshot
        .requests()
        .iter()
        .all(|request| !request.linked_evidence_ids.contains(&"BKT-001".to_string())));
    assert!(snapshot.dangling_references().is_empty());
}

#[test]
fn deleting_unknown_records_reports_not_found() {
    let (service, _, _) = build_service(seeded_state(), MemoryFetcher::default());

    assert!(matches!(
        service.delete_request("PRM-404"),
        Err(EvidenceServiceError::RequestNotFound(id)) if id == "PRM-404"
    ));
    assert!(matches!(
        service.delete_evidence("BKT-404"),
        Err(EvidenceServiceError::EvidenceNotFound(_))
    ));
}

#[test]
fn failed_saves_leave_the_desk_unchanged() {
    let service = EvidenceDeskService::load(
        Arc::new(ReadOnlyStateStore {
            state: Some(seeded_state()),
        }),
        Arc::new(MemoryFetcher::default()),
        7,
        &export_config(),
    )
    .expect("service loads");

    let result = service.delete_request("PRM-001");

    assert!(matches!(result, Err(EvidenceServiceError::Persistence(_))));
    assert!(service.find_request("PRM-001").is_ok());
}

#[test]
fn fulfilling_a_request_closes_its_deadline() {
    let (service, _, _) = build_service(seeded_state(), MemoryFetcher::default());

    let request = service
        .mark_fulfilled("PRM-001", audit_day())
        .expect("fulfilled");
    assert_eq!(request.status, RequestStatus::Fulfilled);
    assert_eq!(request.fulfillment_date, Some(audit_day()));

    let overview = service.deadlines(audit_day(), None).expect("deadlines");
    assert_eq!(overview.summary.approaching, 0);
    assert!(overview
        .requests
        .iter()
        .all(|view| view.primary.proximity == Proximity::Closed));
}

#[test]
fn deadline_threshold_can_be_overridden_per_view() {
    let (service, _, _) = build_service(seeded_state(), MemoryFetcher::default());

    let stored = service.deadlines(audit_day(), None).expect("deadlines");
    assert_eq!(stored.threshold, 7);
    assert_eq!(stored.summary.approaching, 1);

    let narrow = service.deadlines(audit_day(), Some(1)).expect("deadlines");
    assert_eq!(narrow.summary.approaching, 0);
    assert_eq!(service.threshold().expect("threshold"), 7);
}

#[test]
fn threshold_changes_are_persisted() {
    let (service, store, _) = build_service(seeded_state(), MemoryFetcher::default());

    service.set_threshold(3).expect("threshold saved");

    assert_eq!(store.load().expect("load").expect("state").threshold, 3);
}

#[test]
fn import_without_threshold_keeps_the_current_one() {
    let (service, _, _) = build_service(seeded_state(), MemoryFetcher::default());
    service.set_threshold(10).expect("threshold saved");

    let summary = service
        .import_state(r#"{"evidence":[],"permintaan":[{"id":"PRM-050","waktu":"15-10-25"}]}"#)
        .expect("import succeeds");

    assert_eq!(summary.evidence, 0);
    assert_eq!(summary.requests, 1);
    assert_eq!(summary.threshold, 10);
    let request = service.find_request("PRM-050").expect("imported");
    assert_eq!(request.deadline_alt, "15-10-25");
}

#[test]
fn malformed_import_leaves_store_untouched() {
    let (service, _, _) = build_service(seeded_state(), MemoryFetcher::default());
    let before = service.export_state().expect("export");

    let result = service.import_state(r#"{"requests":[]}"#);

    assert!(matches!(
        result,
        Err(EvidenceServiceError::Import(ImportError::MissingEvidence))
    ));
    assert_eq!(service.export_state().expect("export"), before);
}

#[test]
fn empty_desks_start_with_the_configured_threshold() {
    let service = EvidenceDeskService::load(
        Arc::new(ReadOnlyStateStore::default()),
        Arc::new(MemoryFetcher::default()),
        12,
        &export_config(),
    )
    .expect("service loads");

    assert_eq!(service.threshold().expect("threshold"), 12);
    assert_eq!(service.export_state().expect("export"), PersistedState {
        threshold: 12,
        ..PersistedState::default()
    });
}

#[tokio::test]
async fn request_bundle_reports_missing_downloads() {
    let (service, _, fetcher) = build_service(seeded_state(), ledger_fetcher());

    let bundle = service
        .export_request_bundle("PRM-002")
        .await
        .expect("bundle builds");

    assert_eq!(bundle.file_name, "PRM-002-evidence.tar.gz");
    assert_eq!(bundle.manifest_rows, 2);
    assert_eq!(bundle.failure_lines(), vec!["BKT-002: HTTP 404".to_string()]);
    assert_eq!(fetcher.calls().len(), 2);

    let files = read_bundle(&bundle.bytes).expect("archive reads");
    assert!(files.iter().any(|(name, _)| name == FAILURES_FILE));
}

#[tokio::test]
async fn unknown_request_bundles_are_rejected() {
    let (service, _, fetcher) = build_service(seeded_state(), ledger_fetcher());

    let result = service.export_request_bundle("PRM-404").await;

    assert!(matches!(result, Err(EvidenceServiceError::RequestNotFound(_))));
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn fulfilled_bundle_only_covers_fulfilled_requests() {
    let (service, _, _) = build_service(seeded_state(), ledger_fetcher());

    let bundle = service
        .export_fulfilled_bundle(audit_day())
        .await
        .expect("bundle builds");

    assert_eq!(bundle.file_name, "fulfilled-evidence-20251008.tar.gz");
    assert_eq!(bundle.files, vec!["PRM-002/BKT-001-ledger.pdf".to_string()]);
    assert_eq!(bundle.manifest_rows, 1);
    assert_eq!(
        bundle.failure_lines(),
        vec!["BKT-002: HTTP 404".to_string()]
    );
}

#[test]
fn dashboard_and_listings_reflect_the_store() {
    let (service, _, _) = build_service(seeded_state(), MemoryFetcher::default());

    let dashboard = service.dashboard(audit_day()).expect("dashboard");
    assert_eq!(dashboard.total_evidence, 2);
    assert_eq!(dashboard.deadlines.approaching, 1);

    let csv = String::from_utf8(service.requests_csv().expect("csv")).expect("utf8");
    assert!(csv.contains("\"BKT-001;BKT-002\""));
    let csv = String::from_utf8(service.evidence_csv().expect("csv")).expect("utf8");
    assert_eq!(csv.lines().count(), 3);
}
