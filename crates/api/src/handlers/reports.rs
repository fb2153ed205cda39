use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Datelike, NaiveDate, Utc};
use spn_core::error::CoreError;
use spn_core::types::Timestamp;
use spn_db::models::tracked_application::MonthlyCreationReport;
use spn_db::repositories::TrackedApplicationRepo;

use crate::error::AppResult;
use crate::query::ReportPeriodParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/reports/monthly
///
/// Applications created in one calendar month (UTC). Defaults to the
/// previous month.
pub async fn monthly_report(
    State(state): State<AppState>,
    Query(params): Query<ReportPeriodParams>,
) -> AppResult<impl IntoResponse> {
    let (year, month) = resolve_period(&params, Utc::now().date_naive())?;
    let (from, to) = month_bounds(year, month)?;

    let details = TrackedApplicationRepo::list_created_between(&state.pool, from, to).await?;
    let report = MonthlyCreationReport::from_details(year, month, details);
    Ok(Json(DataResponse { data: report }))
}

/// Fill in missing year/month from the month before `today`.
fn resolve_period(params: &ReportPeriodParams, today: NaiveDate) -> Result<(i32, u32), CoreError> {
    let (default_year, default_month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };
    let year = params.year.unwrap_or(default_year);
    let month = params.month.unwrap_or(default_month);
    if !(1..=12).contains(&month) {
        return Err(CoreError::Validation(format!(
            "month must be between 1 and 12, got {month}"
        )));
    }
    Ok((year, month))
}

/// `[first instant of the month, first instant of the next month)`.
fn month_bounds(year: i32, month: u32) -> Result<(Timestamp, Timestamp), CoreError> {
    let invalid = || CoreError::Validation(format!("invalid reporting period {year}-{month}"));
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1).ok_or_else(invalid)?, 1)
    } else {
        (year, month + 1)
    };
    let start = NaiveDate::from_ymd_opt(year, month, 1);
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1);
    match (start, end) {
        (Some(start), Some(end)) => Ok((
            start.and_time(chrono::NaiveTime::MIN).and_utc(),
            end.and_time(chrono::NaiveTime::MIN).and_utc(),
        )),
        _ => Err(invalid()),
    }
}
