//! Query parameter types for API handlers.

use serde::Deserialize;

/// Per-invocation overrides for a reconciliation run
/// (`?expiry_threshold_days=&resend_interval_days=`).
#[derive(Debug, Default, Deserialize)]
pub struct RunParams {
    pub expiry_threshold_days: Option<i64>,
    pub resend_interval_days: Option<i64>,
}

/// Reporting period (`?year=&month=`). Both default to the previous
/// calendar month.
#[derive(Debug, Default, Deserialize)]
pub struct ReportPeriodParams {
    pub year: Option<i32>,
    pub month: Option<u32>,
}
