use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use crate::error::AppResult;
use crate::query::RunParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/notifications/run
///
/// Run one reconciliation pass and return its summary. Concurrent requests
/// queue behind the run in progress.
pub async fn run_reconciliation(
    State(state): State<AppState>,
    Query(params): Query<RunParams>,
) -> AppResult<impl IntoResponse> {
    let policy = state
        .config
        .policy
        .with_overrides(params.expiry_threshold_days, params.resend_interval_days)?;

    let _guard = state.run_lock.lock().await;
    let summary = state.reconciler.run_with_policy(Utc::now(), &policy).await?;
    Ok(Json(DataResponse { data: summary }))
}
