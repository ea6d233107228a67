use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Extension, Json,
};
use homescout_extract::ExtractError;
use serde::Deserialize;
use tokio::time::Instant;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

/// Upper bound on a caller-requested deadline.
const MAX_DEADLINE_SECS: u64 = 300;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ExtractRequest {
    input: String,
    #[serde(default)]
    deadline_secs: Option<u64>,
}

/// `POST /api/v1/extract`: run one extraction and return the record.
///
/// Degraded upstreams still produce a 200 with a partial or placeholder
/// record; only unusable input is a 400. A request that waits out its whole
/// deadline for a free worker is a 503.
pub(super) async fn extract_listing(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::new(req_id.0.clone(), "bad_request", rejection.body_text())
    })?;

    // Time spent queued for a worker counts against the caller's deadline.
    let started = Instant::now();
    let budget = request.deadline_secs.map_or_else(
        || state.extractor.config().overall_deadline,
        |secs| Duration::from_secs(secs.clamp(1, MAX_DEADLINE_SECS)),
    );
    let deadline_at = started + budget;

    let _permit = match tokio::time::timeout_at(deadline_at, state.workers.acquire()).await {
        Ok(Ok(permit)) => permit,
        Ok(Err(_)) => {
            return Err(ApiError::new(
                req_id.0,
                "unavailable",
                "extraction workers are shutting down",
            ));
        }
        Err(_) => {
            tracing::warn!(
                request_id = %req_id.0,
                budget_secs = budget.as_secs(),
                "no extraction worker became free before the deadline"
            );
            return Err(ApiError::new(
                req_id.0,
                "unavailable",
                "no extraction worker became free before the deadline",
            ));
        }
    };

    let remaining = deadline_at.saturating_duration_since(Instant::now());
    let result = state
        .extractor
        .extract_with_deadline(&request.input, remaining)
        .await;

    match result {
        Ok(record) => {
            tracing::info!(
                request_id = %req_id.0,
                status = ?record.status,
                "extraction served"
            );
            Ok(Json(ApiResponse {
                data: record,
                meta: ResponseMeta::new(req_id.0),
            }))
        }
        Err(e @ ExtractError::InvalidInput { .. }) => {
            tracing::debug!(request_id = %req_id.0, error = %e, "rejected extraction input");
            Err(ApiError::new(req_id.0, "invalid_input", e.to_string()))
        }
    }
}
