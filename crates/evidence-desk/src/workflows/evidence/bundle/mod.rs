//! Evidence bundle export: link resolution, payload download, and archive assembly.

mod archive;
mod exporter;
mod fetcher;
mod manifest;
pub mod naming;

pub use archive::{read_bundle, BundleArchive};
pub use exporter::{BundleError, BundleExporter, BundleFailure, EvidenceBundle};
pub use fetcher::{EvidenceFetcher, FetchError, FetchedPayload, HttpEvidenceFetcher};
pub use manifest::{Manifest, ManifestLayout, ManifestRow, FAILURES_FILE, MANIFEST_FILE};
