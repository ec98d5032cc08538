use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::bundle::{EvidenceBundle, EvidenceFetcher};
use super::deadline::{parse_calendar_date, DeadlineEngine};
use super::domain::{EvidenceItem, EvidenceRequest};
use super::persistence::StateStore;
use super::service::{EvidenceDeskService, EvidenceServiceError, SavedRecord};

pub const BUNDLE_FAILURES_HEADER: &str = "x-bundle-failures";

/// Router builder exposing the evidence bank, requests, deadlines, and bundle downloads.
pub fn evidence_router<S, F>(service: Arc<EvidenceDeskService<S, F>>) -> Router
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/evidence",
            get(list_evidence_handler::<S, F>)
                .post(save_evidence_handler::<S, F>)
                .put(save_evidence_handler::<S, F>),
        )
        .route(
            "/api/v1/evidence/:evidence_id",
            get(get_evidence_handler::<S, F>).delete(delete_evidence_handler::<S, F>),
        )
        .route("/api/v1/evidence.csv", get(evidence_csv_handler::<S, F>))
        .route(
            "/api/v1/requests",
            get(list_requests_handler::<S, F>)
                .post(save_request_handler::<S, F>)
                .put(save_request_handler::<S, F>),
        )
        .route(
            "/api/v1/requests/:request_id",
            get(get_request_handler::<S, F>).delete(delete_request_handler::<S, F>),
        )
        .route(
            "/api/v1/requests/:request_id/fulfill",
            post(fulfill_handler::<S, F>),
        )
        .route(
            "/api/v1/requests/:request_id/bundle",
            get(request_bundle_handler::<S, F>),
        )
        .route("/api/v1/requests.csv", get(requests_csv_handler::<S, F>))
        .route(
            "/api/v1/bundles/fulfilled",
            get(fulfilled_bundle_handler::<S, F>),
        )
        .route("/api/v1/deadlines", get(deadlines_handler::<S, F>))
        .route("/api/v1/dashboard", get(dashboard_handler::<S, F>))
        .route(
            "/api/v1/state",
            get(export_state_handler::<S, F>).post(import_state_handler::<S, F>),
        )
        .route("/api/v1/threshold", put(threshold_handler::<S, F>))
        .with_state(service)
}

type DeskState<S, F> = State<Arc<EvidenceDeskService<S, F>>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DateQuery {
    today: Option<String>,
    threshold: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThresholdPayload {
    threshold: u32,
}

fn error_payload(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (status, Json(payload)).into_response()
}

fn service_error(error: EvidenceServiceError) -> Response {
    let status = match &error {
        EvidenceServiceError::EvidenceNotFound(_) | EvidenceServiceError::RequestNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        EvidenceServiceError::Import(_) => StatusCode::BAD_REQUEST,
        EvidenceServiceError::Store(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => {
            error!(error = %error, "evidence desk request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_payload(status, error.to_string())
}

/// Resolves `?today=`; absent means the local calendar date.
fn resolve_today(raw: Option<&str>) -> Result<NaiveDate, Response> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(DeadlineEngine::for_local_today().today()),
        Some(value) => parse_calendar_date(value).ok_or_else(|| {
            error_payload(
                StatusCode::BAD_REQUEST,
                format!("invalid date `{value}`, expected YYYY-MM-DD"),
            )
        }),
    }
}

fn saved_response<T: serde::Serialize>(saved: SavedRecord<T>) -> Response {
    let status = if saved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(saved.record)).into_response()
}

fn bundle_response(bundle: EvidenceBundle) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "application/gzip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", bundle.file_name),
        ),
        (
            HeaderName::from_static(BUNDLE_FAILURES_HEADER),
            bundle.failure_count().to_string(),
        ),
    ];
    (StatusCode::OK, headers, bundle.bytes).into_response()
}

fn csv_response(file_name: &str, bytes: Vec<u8>) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];
    (StatusCode::OK, headers, bytes).into_response()
}

pub(crate) async fn list_evidence_handler<S, F>(
    State(service): DeskState<S, F>,
    Query(query): Query<SearchQuery>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.search_evidence(&query.q) {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn get_evidence_handler<S, F>(
    State(service): DeskState<S, F>,
    Path(evidence_id): Path<String>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.find_evidence(&evidence_id) {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn save_evidence_handler<S, F>(
    State(service): DeskState<S, F>,
    Json(item): Json<EvidenceItem>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.save_evidence(item) {
        Ok(saved) => saved_response(saved),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn delete_evidence_handler<S, F>(
    State(service): DeskState<S, F>,
    Path(evidence_id): Path<String>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.delete_evidence(&evidence_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn list_requests_handler<S, F>(
    State(service): DeskState<S, F>,
    Query(query): Query<SearchQuery>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.search_requests(&query.q) {
        Ok(requests) => (StatusCode::OK, Json(requests)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn get_request_handler<S, F>(
    State(service): DeskState<S, F>,
    Path(request_id): Path<String>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.find_request(&request_id) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn save_request_handler<S, F>(
    State(service): DeskState<S, F>,
    Json(request): Json<EvidenceRequest>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.save_request(request) {
        Ok(saved) => saved_response(saved),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn delete_request_handler<S, F>(
    State(service): DeskState<S, F>,
    Path(request_id): Path<String>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.delete_request(&request_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn fulfill_handler<S, F>(
    State(service): DeskState<S, F>,
    Path(request_id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    let today = match resolve_today(query.today.as_deref()) {
        Ok(today) => today,
        Err(response) => return response,
    };

    match service.mark_fulfilled(&request_id, today) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn request_bundle_handler<S, F>(
    State(service): DeskState<S, F>,
    Path(request_id): Path<String>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.export_request_bundle(&request_id).await {
        Ok(bundle) => bundle_response(bundle),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn fulfilled_bundle_handler<S, F>(
    State(service): DeskState<S, F>,
    Query(query): Query<DateQuery>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    let today = match resolve_today(query.today.as_deref()) {
        Ok(today) => today,
        Err(response) => return response,
    };

    match service.export_fulfilled_bundle(today).await {
        Ok(bundle) => bundle_response(bundle),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn deadlines_handler<S, F>(
    State(service): DeskState<S, F>,
    Query(query): Query<DateQuery>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    let today = match resolve_today(query.today.as_deref()) {
        Ok(today) => today,
        Err(response) => return response,
    };

    match service.deadlines(today, query.threshold) {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn dashboard_handler<S, F>(
    State(service): DeskState<S, F>,
    Query(query): Query<DateQuery>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    let today = match resolve_today(query.today.as_deref()) {
        Ok(today) => today,
        Err(response) => return response,
    };

    match service.dashboard(today) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn export_state_handler<S, F>(State(service): DeskState<S, F>) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.export_state() {
        Ok(state) => (StatusCode::OK, Json(state)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn import_state_handler<S, F>(
    State(service): DeskState<S, F>,
    body: String,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.import_state(&body) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn threshold_handler<S, F>(
    State(service): DeskState<S, F>,
    Json(payload): Json<ThresholdPayload>,
) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.set_threshold(payload.threshold) {
        Ok(threshold) => (StatusCode::OK, Json(json!({ "threshold": threshold }))).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn evidence_csv_handler<S, F>(State(service): DeskState<S, F>) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.evidence_csv() {
        Ok(bytes) => csv_response("evidence.csv", bytes),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn requests_csv_handler<S, F>(State(service): DeskState<S, F>) -> Response
where
    S: StateStore + 'static,
    F: EvidenceFetcher + 'static,
{
    match service.requests_csv() {
        Ok(bytes) => csv_response("requests.csv", bytes),
        Err(error) => service_error(error),
    }
}
