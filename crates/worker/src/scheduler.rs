//! Periodic reconciliation.
//!
//! Runs never overlap: each tick awaits the previous run to completion, and
//! ticks missed while a run was in progress are delayed rather than
//! replayed.

use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::reconciler::Reconciler;

/// Run the reconciler every `period` until `cancel` is triggered.
///
/// The first run starts immediately. A failed run is logged and the loop
/// carries on.
pub async fn run(reconciler: Reconciler, period: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = period.as_secs(), "Reconciliation scheduler started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconciliation scheduler stopping");
                break;
            }
            _ = interval.tick() => {
                match reconciler.run(Utc::now()).await {
                    Ok(summary) if summary.is_clean() => {
                        tracing::debug!(processed = summary.processed, "Scheduled run clean");
                    }
                    Ok(summary) => {
                        tracing::warn!(
                            failures = summary.failures.len(),
                            "Scheduled run finished with failures"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Scheduled run failed");
                    }
                }
            }
        }
    }
}
