use std::collections::BTreeMap;

use serde::Serialize;

use super::super::deadline::{DeadlineEngine, DeadlineSummary};
use super::super::domain::{RequestStatus, Validity};
use super::super::store::EvidenceStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidityCount {
    pub validity: Validity,
    pub validity_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: RequestStatus,
    pub status_label: &'static str,
    pub count: usize,
}

/// Headline numbers for the desk landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_evidence: usize,
    pub total_requests: usize,
    pub threshold: u32,
    pub evidence_by_validity: Vec<ValidityCount>,
    pub evidence_by_category: Vec<CategoryCount>,
    pub requests_by_status: Vec<StatusCount>,
    pub deadlines: DeadlineSummary,
}

impl DashboardSummary {
    pub fn build(store: &EvidenceStore, engine: &DeadlineEngine) -> Self {
        let evidence_by_validity = [Validity::Valid, Validity::NeedsRevision]
            .into_iter()
            .map(|validity| ValidityCount {
                validity,
                validity_label: validity.label(),
                count: store
                    .evidence()
                    .iter()
                    .filter(|item| item.validity == validity)
                    .count(),
            })
            .collect();

        let mut categories: BTreeMap<&str, usize> = BTreeMap::new();
        for item in store.evidence() {
            let category = item.category.trim();
            let category = if category.is_empty() {
                "Uncategorized"
            } else {
                category
            };
            *categories.entry(category).or_default() += 1;
        }
        let evidence_by_category = categories
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();

        let requests_by_status = [RequestStatus::Pending, RequestStatus::Fulfilled]
            .into_iter()
            .map(|status| StatusCount {
                status,
                status_label: status.label(),
                count: store
                    .requests()
                    .iter()
                    .filter(|request| request.status == status)
                    .count(),
            })
            .collect();

        Self {
            total_evidence: store.evidence().len(),
            total_requests: store.requests().len(),
            threshold: store.threshold(),
            evidence_by_validity,
            evidence_by_category,
            requests_by_status,
            deadlines: engine.summary(store.requests(), store.threshold()),
        }
    }
}
