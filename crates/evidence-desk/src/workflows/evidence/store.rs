use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use super::domain::{
    next_id, EvidenceItem, EvidenceRequest, RequestStatus, DEFAULT_ALERT_THRESHOLD_DAYS,
    EVIDENCE_PREFIX, REQUEST_PREFIX,
};
use super::persistence::PersistedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} id must not be empty")]
    EmptyId { kind: &'static str },
}

/// A link that points at a record which no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DanglingReference {
    LinkedEvidence {
        request_id: String,
        evidence_id: String,
    },
    RelatedRequest {
        evidence_id: String,
        request_id: String,
    },
}

/// Owns the evidence and request collections and keeps the links between
/// them consistent across deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceStore {
    evidence: Vec<EvidenceItem>,
    requests: Vec<EvidenceRequest>,
    threshold: u32,
}

impl Default for EvidenceStore {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_THRESHOLD_DAYS)
    }
}

impl EvidenceStore {
    pub fn new(threshold: u32) -> Self {
        Self {
            evidence: Vec::new(),
            requests: Vec::new(),
            threshold,
        }
    }

    pub fn from_state(state: PersistedState) -> Self {
        Self {
            evidence: state.evidence,
            requests: state.requests,
            threshold: state.threshold,
        }
    }

    pub fn to_state(&self) -> PersistedState {
        PersistedState {
            evidence: self.evidence.clone(),
            requests: self.requests.clone(),
            threshold: self.threshold,
        }
    }

    pub fn evidence(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    pub fn requests(&self) -> &[EvidenceRequest] {
        &self.requests
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: u32) {
        self.threshold = threshold;
    }

    pub fn find_evidence(&self, id: &str) -> Option<&EvidenceItem> {
        self.evidence.iter().find(|item| item.id == id)
    }

    pub fn find_request(&self, id: &str) -> Option<&EvidenceRequest> {
        self.requests.iter().find(|request| request.id == id)
    }

    pub fn next_evidence_id(&self) -> String {
        next_id(
            EVIDENCE_PREFIX,
            self.evidence.iter().map(|item| item.id.as_str()),
        )
    }

    pub fn next_request_id(&self) -> String {
        next_id(
            REQUEST_PREFIX,
            self.requests.iter().map(|request| request.id.as_str()),
        )
    }

    /// Case-insensitive substring search; an empty query returns everything.
    pub fn search_evidence(&self, query: &str) -> Vec<&EvidenceItem> {
        let needle = query.trim().to_lowercase();
        self.evidence
            .iter()
            .filter(|item| {
                needle.is_empty()
                    || matches_any(
                        &needle,
                        [
                            item.id.as_str(),
                            item.description.as_str(),
                            item.unit.as_str(),
                            item.responsible_party.as_str(),
                            item.category.as_str(),
                            item.note.as_str(),
                            item.related_request_id.as_str(),
                        ],
                    )
            })
            .collect()
    }

    pub fn search_requests(&self, query: &str) -> Vec<&EvidenceRequest> {
        let needle = query.trim().to_lowercase();
        self.requests
            .iter()
            .filter(|request| {
                needle.is_empty()
                    || matches_any(
                        &needle,
                        [
                            request.id.as_str(),
                            request.description.as_str(),
                            request.unit.as_str(),
                            request.responsible_party.as_str(),
                            request.status.label(),
                            request.deadline_date.as_str(),
                            request.deadline_alt.as_str(),
                        ],
                    )
            })
            .collect()
    }

    /// Requests selected for the fulfilled-evidence bundle.
    pub fn fulfilled_with_evidence(&self) -> Vec<&EvidenceRequest> {
        self.requests
            .iter()
            .filter(|request| request.is_fulfilled() && !request.linked_evidence_ids.is_empty())
            .collect()
    }

    pub fn upsert_evidence(&mut self, item: EvidenceItem) -> Result<UpsertOutcome, StoreError> {
        if item.id.trim().is_empty() {
            return Err(StoreError::EmptyId { kind: "evidence" });
        }

        let outcome = match self.evidence.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                *existing = item;
                UpsertOutcome::Replaced
            }
            None => {
                self.evidence.push(item);
                UpsertOutcome::Inserted
            }
        };
        debug!(?outcome, "evidence upserted");
        Ok(outcome)
    }

    pub fn upsert_request(&mut self, request: EvidenceRequest) -> Result<UpsertOutcome, StoreError> {
        if request.id.trim().is_empty() {
            return Err(StoreError::EmptyId { kind: "request" });
        }

        let outcome = match self
            .requests
            .iter_mut()
            .find(|existing| existing.id == request.id)
        {
            Some(existing) => {
                *existing = request;
                UpsertOutcome::Replaced
            }
            None => {
                self.requests.push(request);
                UpsertOutcome::Inserted
            }
        };
        debug!(?outcome, "request upserted");
        Ok(outcome)
    }

    /// Removes the evidence item and unlinks it from every request.
    pub fn delete_evidence(&mut self, id: &str) -> bool {
        let before = self.evidence.len();
        self.evidence.retain(|item| item.id != id);
        let removed = self.evidence.len() != before;

        let mut unlinked = 0usize;
        for request in &mut self.requests {
            let links = request.linked_evidence_ids.len();
            request.linked_evidence_ids.retain(|linked| linked != id);
            unlinked += links - request.linked_evidence_ids.len();
        }

        debug!(evidence_id = id, removed, unlinked, "evidence deleted");
        removed
    }

    /// Removes the request and clears every evidence back-reference to it.
    pub fn delete_request(&mut self, id: &str) -> bool {
        let before = self.requests.len();
        self.requests.retain(|request| request.id != id);
        let removed = self.requests.len() != before;

        let mut cleared = 0usize;
        for item in &mut self.evidence {
            if item.related_request_id == id {
                item.related_request_id.clear();
                cleared += 1;
            }
        }

        debug!(request_id = id, removed, cleared, "request deleted");
        removed
    }

    /// Marks the request fulfilled on `today`. Unknown ids are ignored.
    pub fn mark_fulfilled(&mut self, id: &str, today: NaiveDate) -> bool {
        match self.requests.iter_mut().find(|request| request.id == id) {
            Some(request) => {
                request.status = RequestStatus::Fulfilled;
                request.fulfillment_date = Some(today);
                debug!(request_id = id, %today, "request fulfilled");
                true
            }
            None => false,
        }
    }

    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let evidence_ids: HashSet<&str> = self.evidence.iter().map(|item| item.id.as_str()).collect();
        let request_ids: HashSet<&str> = self
            .requests
            .iter()
            .map(|request| request.id.as_str())
            .collect();

        let mut dangling = Vec::new();
        for request in &self.requests {
            for evidence_id in &request.linked_evidence_ids {
                if !evidence_ids.contains(evidence_id.as_str()) {
                    dangling.push(DanglingReference::LinkedEvidence {
                        request_id: request.id.clone(),
                        evidence_id: evidence_id.clone(),
                    });
                }
            }
        }

        for item in &self.evidence {
            if !item.related_request_id.is_empty()
                && !request_ids.contains(item.related_request_id.as_str())
            {
                dangling.push(DanglingReference::RelatedRequest {
                    evidence_id: item.id.clone(),
                    request_id: item.related_request_id.clone(),
                });
            }
        }

        dangling
    }
}

fn matches_any<'a>(needle: &str, fields: impl IntoIterator<Item = &'a str>) -> bool {
    fields
        .into_iter()
        .any(|field| field.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(id: &str, related: &str) -> EvidenceItem {
        EvidenceItem {
            id: id.to_string(),
            description: format!("Evidence {id}"),
            related_request_id: related.to_string(),
            ..EvidenceItem::default()
        }
    }

    fn request(id: &str, links: &[&str]) -> EvidenceRequest {
        EvidenceRequest {
            id: id.to_string(),
            description: format!("Request {id}"),
            linked_evidence_ids: links.iter().map(|link| link.to_string()).collect(),
            ..EvidenceRequest::default()
        }
    }

    fn seeded() -> EvidenceStore {
        let mut store = EvidenceStore::new(7);
        for item in [
            evidence("BKT-001", "PRM-001"),
            evidence("BKT-002", "PRM-001"),
            evidence("BKT-003", "PRM-002"),
        ] {
            store.upsert_evidence(item).expect("insert evidence");
        }
        store
            .upsert_request(request("PRM-001", &["BKT-001", "BKT-002", "BKT-003"]))
            .expect("insert request");
        store
            .upsert_request(request("PRM-002", &["BKT-002"]))
            .expect("insert request");
        store
    }

    #[test]
    fn upsert_replaces_in_place_and_appends_new_ids() {
        let mut store = seeded();
        let mut replacement = evidence("BKT-002", "");
        replacement.description = "Updated".to_string();

        assert_eq!(
            store.upsert_evidence(replacement),
            Ok(UpsertOutcome::Replaced)
        );
        assert_eq!(store.evidence()[1].description, "Updated");
        assert_eq!(
            store.upsert_evidence(evidence("BKT-010", "")),
            Ok(UpsertOutcome::Inserted)
        );
        assert_eq!(store.evidence().last().map(|item| item.id.as_str()), Some("BKT-010"));
    }

    #[test]
    fn upsert_rejects_blank_ids() {
        let mut store = EvidenceStore::default();
        assert_eq!(
            store.upsert_request(request("  ", &[])),
            Err(StoreError::EmptyId { kind: "request" })
        );
        assert!(store.requests().is_empty());
    }

    #[test]
    fn deleting_evidence_unlinks_it_and_keeps_order() {
        let mut store = seeded();
        assert!(store.delete_evidence("BKT-002"));

        let first = store.find_request("PRM-001").expect("request present");
        assert_eq!(first.linked_evidence_ids, vec!["BKT-001", "BKT-003"]);
        let second = store.find_request("PRM-002").expect("request present");
        assert!(second.linked_evidence_ids.is_empty());
        assert!(store.dangling_references().is_empty());
    }

    #[test]
    fn deleting_request_clears_back_references() {
        let mut store = seeded();
        assert!(store.delete_request("PRM-001"));

        assert!(store.find_evidence("BKT-001").expect("kept").related_request_id.is_empty());
        assert!(store.find_evidence("BKT-002").expect("kept").related_request_id.is_empty());
        assert_eq!(
            store.find_evidence("BKT-003").expect("kept").related_request_id,
            "PRM-002"
        );
        assert!(store.dangling_references().is_empty());
    }

    #[test]
    fn mark_fulfilled_ignores_unknown_ids() {
        let mut store = seeded();
        let today = NaiveDate::from_ymd_opt(2025, 10, 8).expect("valid date");
        let before = store.clone();

        assert!(!store.mark_fulfilled("PRM-404", today));
        assert_eq!(store, before);

        assert!(store.mark_fulfilled("PRM-002", today));
        let request = store.find_request("PRM-002").expect("present");
        assert_eq!(request.status, RequestStatus::Fulfilled);
        assert_eq!(request.fulfillment_date, Some(today));
    }

    #[test]
    fn search_is_case_insensitive_and_empty_query_returns_all() {
        let mut store = seeded();
        let mut item = evidence("BKT-004", "");
        item.responsible_party = "Finance Bureau".to_string();
        store.upsert_evidence(item).expect("insert");

        let hits = store.search_evidence("finance");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "BKT-004");

        let all: Vec<&str> = store
            .search_evidence("   ")
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(all, vec!["BKT-001", "BKT-002", "BKT-003", "BKT-004"]);

        assert_eq!(store.search_requests("prm-002").len(), 1);
        assert_eq!(store.search_requests("pending").len(), 2);
    }

    #[test]
    fn generated_ids_follow_existing_records() {
        let store = seeded();
        assert_eq!(store.next_evidence_id(), "BKT-004");
        assert_eq!(store.next_request_id(), "PRM-003");
    }

    #[test]
    fn fulfilled_selection_requires_links() {
        let mut store = seeded();
        let today = NaiveDate::from_ymd_opt(2025, 10, 8).expect("valid date");
        store
            .upsert_request(request("PRM-003", &[]))
            .expect("insert request");
        store.mark_fulfilled("PRM-001", today);
        store.mark_fulfilled("PRM-003", today);

        let selected: Vec<&str> = store
            .fulfilled_with_evidence()
            .iter()
            .map(|request| request.id.as_str())
            .collect();
        assert_eq!(selected, vec!["PRM-001"]);
    }
}
