use chrono::NaiveDate;
use evidence_desk::config::AppConfig;
use evidence_desk::error::AppError;
use evidence_desk::workflows::evidence::{
    parse_calendar_date, EvidenceDeskService, HttpEvidenceFetcher, JsonFileStateStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type FileBackedDesk = EvidenceDeskService<JsonFileStateStore, HttpEvidenceFetcher>;

/// Opens the desk over the configured state file, or `state_override` when given.
pub(crate) fn open_desk(
    config: &AppConfig,
    state_override: Option<PathBuf>,
) -> Result<Arc<FileBackedDesk>, AppError> {
    let path = state_override.unwrap_or_else(|| config.storage.state_path.clone());
    info!(path = %path.display(), "opening evidence state file");

    let state = Arc::new(JsonFileStateStore::new(path));
    let fetcher = Arc::new(HttpEvidenceFetcher::new()?);
    let desk = EvidenceDeskService::load(
        state,
        fetcher,
        config.storage.default_threshold,
        &config.export,
    )?;
    Ok(Arc::new(desk))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    parse_calendar_date(raw).ok_or_else(|| format!("failed to parse '{raw}' as YYYY-MM-DD"))
}
