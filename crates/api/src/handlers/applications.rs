//! Handlers for the `/applications` resource.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use spn_core::tracking::TrackedApplication;
use spn_db::repositories::TrackedApplicationRepo;

use crate::error::AppResult;
use crate::provisioning::{self, CreateApplicationRequest, RenewSecretRequest};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/applications
///
/// Every active tracked application with its expiry-tracking state.
pub async fn list_applications(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let rows = TrackedApplicationRepo::list_active(&state.pool).await?;
    let data: Vec<TrackedApplication> = rows.into_iter().map(TrackedApplication::from).collect();
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/applications
///
/// Provision a Service Principal and email its credentials to the requester.
pub async fn create_application(
    State(state): State<AppState>,
    Json(input): Json<CreateApplicationRequest>,
) -> AppResult<impl IntoResponse> {
    let created = provisioning::create_application(&state, input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// POST /api/v1/applications/renew
pub async fn renew_secret(
    State(state): State<AppState>,
    Json(input): Json<RenewSecretRequest>,
) -> AppResult<impl IntoResponse> {
    let renewed = provisioning::renew_secret(&state, input, Utc::now()).await?;
    Ok(Json(DataResponse { data: renewed }))
}
