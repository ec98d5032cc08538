use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::archive::BundleArchive;
use super::fetcher::{EvidenceFetcher, FetchError, FetchedPayload};
use super::manifest::{Manifest, ManifestLayout, ManifestRow, FAILURES_FILE, MANIFEST_FILE};
use super::naming::{archive_file_name, path_component};
use crate::config::ExportConfig;
use crate::workflows::evidence::domain::{EvidenceItem, EvidenceRequest};

/// A per-item problem recorded while building a bundle. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleFailure {
    NotFound {
        request_id: String,
        evidence_id: String,
    },
    MissingResource {
        evidence_id: String,
    },
    Fetch {
        evidence_id: String,
        error: FetchError,
    },
}

impl fmt::Display for BundleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleFailure::NotFound {
                request_id,
                evidence_id,
            } => write!(f, "{request_id}/{evidence_id}: not found in evidence bank"),
            BundleFailure::MissingResource { evidence_id } => {
                write!(f, "{evidence_id}: link not available")
            }
            BundleFailure::Fetch { evidence_id, error } => write!(f, "{evidence_id}: {error}"),
        }
    }
}

/// Archive-level failure; per-item problems are reported as [`BundleFailure`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("failed to write evidence archive: {0}")]
    Archive(#[from] std::io::Error),
    #[error("failed to write bundle manifest: {0}")]
    Manifest(#[from] csv::Error),
}

/// The finished archive plus what went into it.
#[derive(Debug, Clone)]
pub struct EvidenceBundle {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Payload paths inside the archive, in the order they were written.
    pub files: Vec<String>,
    pub manifest_rows: usize,
    pub failures: Vec<BundleFailure>,
}

impl EvidenceBundle {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn failure_lines(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }
}

/// One visited link: the owning request, the id, and the record if it exists.
struct LinkStep {
    request_id: String,
    evidence_id: String,
    item: Option<EvidenceItem>,
}

enum LinkOutcome {
    NotFound,
    NoLink(EvidenceItem),
    Fetched(EvidenceItem, Result<FetchedPayload, FetchError>),
}

/// Resolves request links against the evidence bank, downloads every payload
/// through a bounded worker pool, and packs the results into one archive.
#[derive(Debug)]
pub struct BundleExporter<F> {
    fetcher: Arc<F>,
    concurrency: usize,
    fetch_timeout: Duration,
}

impl<F> BundleExporter<F>
where
    F: EvidenceFetcher + 'static,
{
    pub fn new(fetcher: Arc<F>, config: &ExportConfig) -> Self {
        Self {
            fetcher,
            concurrency: config.concurrency.max(1),
            fetch_timeout: config.fetch_timeout,
        }
    }

    /// Bundle for a single request. Every resolved item gets a manifest row,
    /// whether or not its payload could be downloaded.
    pub async fn export_request(
        &self,
        request: &EvidenceRequest,
        evidence: &[EvidenceItem],
    ) -> Result<EvidenceBundle, BundleError> {
        let file_name = format!("{}-evidence.tar.gz", request.id);
        self.build(
            std::slice::from_ref(request),
            evidence,
            ManifestLayout::SingleRequest,
            file_name,
        )
        .await
    }

    /// Bundle across several requests, one sub-directory per request. Only
    /// downloaded payloads get manifest rows.
    pub async fn export_requests(
        &self,
        requests: &[EvidenceRequest],
        evidence: &[EvidenceItem],
        generated_on: NaiveDate,
    ) -> Result<EvidenceBundle, BundleError> {
        let file_name = format!("fulfilled-evidence-{}.tar.gz", generated_on.format("%Y%m%d"));
        self.build(requests, evidence, ManifestLayout::MultiRequest, file_name)
            .await
    }

    async fn build(
        &self,
        requests: &[EvidenceRequest],
        evidence: &[EvidenceItem],
        layout: ManifestLayout,
        file_name: String,
    ) -> Result<EvidenceBundle, BundleError> {
        let steps = resolve_links(requests, evidence);
        let outcomes = self.fetch_all(&steps).await;

        let mut manifest = Manifest::new(layout);
        let mut failures = Vec::new();
        let mut files = Vec::new();
        let mut archive = BundleArchive::new(Utc::now().timestamp().max(0) as u64);

        for (step, outcome) in steps.iter().zip(outcomes) {
            let (item, fetched) = match outcome {
                LinkOutcome::NotFound => {
                    failures.push(BundleFailure::NotFound {
                        request_id: step.request_id.clone(),
                        evidence_id: step.evidence_id.clone(),
                    });
                    continue;
                }
                LinkOutcome::NoLink(item) => (item, None),
                LinkOutcome::Fetched(item, result) => (item, Some(result)),
            };

            if layout == ManifestLayout::SingleRequest {
                manifest.push(ManifestRow::for_item(&step.request_id, &item, ""));
            }

            let payload = match fetched {
                None => {
                    failures.push(BundleFailure::MissingResource {
                        evidence_id: item.id.clone(),
                    });
                    continue;
                }
                Some(Err(error)) => {
                    failures.push(BundleFailure::Fetch {
                        evidence_id: item.id.clone(),
                        error,
                    });
                    continue;
                }
                Some(Ok(payload)) => payload,
            };

            let name = archive_file_name(&item, payload.content_type.as_deref());
            let path = match layout {
                ManifestLayout::SingleRequest => name,
                ManifestLayout::MultiRequest => {
                    format!("{}/{}", path_component(&step.request_id, "request"), name)
                }
            };
            archive.append(&path, &payload.bytes)?;

            if layout == ManifestLayout::MultiRequest {
                manifest.push(ManifestRow::for_item(&step.request_id, &item, path.clone()));
            }
            files.push(path);
        }

        archive.append(MANIFEST_FILE, &manifest.to_csv()?)?;

        if !failures.is_empty() {
            let log = failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            for line in log.lines() {
                warn!(failure = line, "evidence bundle item skipped");
            }
            archive.append(FAILURES_FILE, log.as_bytes())?;
        }

        let bytes = archive.finish()?;
        info!(
            bundle = %file_name,
            requests = requests.len(),
            files = files.len(),
            failures = failures.len(),
            "evidence bundle built"
        );

        Ok(EvidenceBundle {
            file_name,
            bytes,
            files,
            manifest_rows: manifest.len(),
            failures,
        })
    }

    /// Runs every fetch to completion, `concurrency` at a time, keeping step order.
    async fn fetch_all(&self, steps: &[LinkStep]) -> Vec<LinkOutcome> {
        let jobs: Vec<Option<EvidenceItem>> = steps.iter().map(|step| step.item.clone()).collect();
        let fetch_timeout = self.fetch_timeout;

        stream::iter(jobs)
            .map(|job| {
                let fetcher = Arc::clone(&self.fetcher);
                async move {
                    match job {
                        None => LinkOutcome::NotFound,
                        Some(item) if !item.has_link() => LinkOutcome::NoLink(item),
                        Some(item) => {
                            let result =
                                fetch_with_timeout(fetcher.as_ref(), &item.source_link, fetch_timeout)
                                    .await;
                            LinkOutcome::Fetched(item, result)
                        }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

async fn fetch_with_timeout<F>(
    fetcher: &F,
    link: &str,
    limit: Duration,
) -> Result<FetchedPayload, FetchError>
where
    F: EvidenceFetcher + ?Sized,
{
    match tokio::time::timeout(limit, fetcher.fetch(link.trim())).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(limit)),
    }
}

fn resolve_links(requests: &[EvidenceRequest], evidence: &[EvidenceItem]) -> Vec<LinkStep> {
    let mut bank: HashMap<&str, &EvidenceItem> = HashMap::with_capacity(evidence.len());
    for item in evidence {
        bank.entry(item.id.as_str()).or_insert(item);
    }

    requests
        .iter()
        .flat_map(|request| {
            request
                .linked_evidence_ids
                .iter()
                .map(|evidence_id| LinkStep {
                    request_id: request.id.clone(),
                    evidence_id: evidence_id.clone(),
                    item: bank.get(evidence_id.as_str()).map(|item| (*item).clone()),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
