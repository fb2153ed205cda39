//! The reconciliation engine.
//!
//! One run walks every tracked application in order. For each it asks the
//! identity provider for the latest secret expiry, lets
//! [`spn_core::expiry::assess`] decide what changed and what is due, sends
//! at most one renewal confirmation plus one urgency notice, and writes the
//! resulting state back once. An undelivered renewal confirmation leaves
//! the stored state untouched so the renewal is seen, and confirmed, again
//! on the next run. A problem with one application is recorded in the
//! [`RunSummary`] and never stops the run.

use std::sync::Arc;

use chrono::Utc;
use spn_core::error::StoreError;
use spn_core::expiry::{assess, ExpiryPolicy, NotificationKind, Transition};
use spn_core::tracking::{Notifier, StateStore, TrackedApplication, TruthFetcher};
use spn_core::types::Timestamp;
use spn_events::templates;

use crate::summary::{FailureStage, RunSummary};

/// A run could not start.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Failed to list tracked applications: {0}")]
    ListTracked(#[from] StoreError),
}

/// Drives the three collaborators through one reconciliation run.
#[derive(Clone)]
pub struct Reconciler {
    fetcher: Arc<dyn TruthFetcher>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    policy: ExpiryPolicy,
}

impl Reconciler {
    pub fn new(
        fetcher: Arc<dyn TruthFetcher>,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        policy: ExpiryPolicy,
    ) -> Self {
        Self {
            fetcher,
            store,
            notifier,
            policy,
        }
    }

    /// The policy used when a run does not override it.
    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Run with the configured policy.
    pub async fn run(&self, now: Timestamp) -> Result<RunSummary, ReconcileError> {
        self.run_with_policy(now, &self.policy).await
    }

    /// Run with an explicit policy. `now` is the single reference instant
    /// for every decision in this run.
    pub async fn run_with_policy(
        &self,
        now: Timestamp,
        policy: &ExpiryPolicy,
    ) -> Result<RunSummary, ReconcileError> {
        let applications = self.store.list_tracked().await?;
        let mut summary = RunSummary::begin(now);

        tracing::info!(
            count = applications.len(),
            threshold_days = policy.expiry_threshold.num_days(),
            resend_days = policy.resend_interval.num_days(),
            "Reconciliation run started"
        );

        for app in &applications {
            summary.processed += 1;
            self.reconcile_one(app, now, policy, &mut summary).await;
        }

        summary.finished_at = Utc::now().max(now);
        tracing::info!(
            processed = summary.processed,
            renewed = summary.renewed,
            notified = summary.notified,
            skipped = summary.skipped,
            failures = summary.failures.len(),
            "Reconciliation run finished"
        );
        Ok(summary)
    }

    async fn reconcile_one(
        &self,
        app: &TrackedApplication,
        now: Timestamp,
        policy: &ExpiryPolicy,
        summary: &mut RunSummary,
    ) {
        let latest = match self.fetcher.latest_expiry(&app.display_name).await {
            Ok(Some(latest)) => latest,
            Ok(None) => {
                tracing::warn!(
                    application_id = app.id,
                    display_name = %app.display_name,
                    "Application or secret not found upstream, skipping"
                );
                summary.skipped += 1;
                summary.fail(
                    app.id,
                    &app.display_name,
                    FailureStage::NotFound,
                    "application or secret not found",
                );
                return;
            }
            Err(e) => {
                tracing::error!(
                    application_id = app.id,
                    display_name = %app.display_name,
                    error = %e,
                    "Failed to fetch latest expiry, skipping"
                );
                summary.skipped += 1;
                summary.fail(app.id, &app.display_name, FailureStage::Fetch, e.to_string());
                return;
            }
        };

        let assessment = assess(&app.state, latest, now, policy);
        let mut state = assessment.state;

        match assessment.transition {
            Transition::Renewed { previous } => {
                summary.renewed += 1;
                tracing::info!(
                    application_id = app.id,
                    display_name = %app.display_name,
                    previous = ?previous,
                    latest = %latest,
                    "Secret renewal detected"
                );
            }
            Transition::Adopted { previous } => {
                tracing::warn!(
                    application_id = app.id,
                    display_name = %app.display_name,
                    previous = ?previous,
                    latest = %latest,
                    "Adopting expiry that is not a renewal"
                );
            }
            Transition::Unchanged => {}
        }

        if assessment.renewal_notice {
            if !self.notify(app, NotificationKind::Renewal, latest, summary).await {
                // The old epoch stays persisted so the next run detects the
                // renewal again and retries the confirmation.
                tracing::warn!(
                    application_id = app.id,
                    display_name = %app.display_name,
                    "Renewal confirmation not delivered, deferring epoch change"
                );
                return;
            }
            state.record_sent(NotificationKind::Renewal, now);
        }

        if let Some(kind) = assessment.urgency_notice {
            if self.notify(app, kind, latest, summary).await {
                state.record_sent(kind, now);
            }
        } else {
            tracing::debug!(
                application_id = app.id,
                urgency = ?assessment.urgency,
                "No notification due"
            );
        }

        if state == app.state {
            return;
        }
        match self.store.update(app.id, &state).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(application_id = app.id, "Tracked application vanished before update");
                summary.fail(
                    app.id,
                    &app.display_name,
                    FailureStage::Store,
                    "no active row to update",
                );
            }
            Err(e) => {
                tracing::error!(
                    application_id = app.id,
                    error = %e,
                    "Failed to persist tracking state"
                );
                summary.fail(app.id, &app.display_name, FailureStage::Store, e.to_string());
            }
        }
    }

    /// Render and send one notice. Returns whether it was delivered.
    async fn notify(
        &self,
        app: &TrackedApplication,
        kind: NotificationKind,
        expiry: Timestamp,
        summary: &mut RunSummary,
    ) -> bool {
        let email = templates::expiry_notice(kind, &app.owner_name, &app.display_name, expiry);
        let sent = self
            .notifier
            .send(&app.owner_email, &email.subject, &email.html_body)
            .await;

        if sent {
            summary.notified += 1;
            tracing::info!(
                application_id = app.id,
                display_name = %app.display_name,
                kind = %kind,
                "Notification sent"
            );
        } else {
            summary.fail(
                app.id,
                &app.display_name,
                FailureStage::Notify,
                format!("{kind} notification not delivered"),
            );
        }
        sent
    }
}
