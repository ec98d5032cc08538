mod listing;
mod summary;

pub use listing::{evidence_listing_csv, request_listing_csv, EVIDENCE_LISTING_HEADER, REQUEST_LISTING_HEADER};
pub use summary::{CategoryCount, DashboardSummary, StatusCount, ValidityCount};
