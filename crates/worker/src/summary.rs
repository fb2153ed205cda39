use serde::Serialize;
use spn_core::types::{DbId, Timestamp};

/// Where processing of one application went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// The identity provider could not be asked.
    Fetch,
    /// The application (or any credential) no longer exists upstream.
    NotFound,
    /// A notification could not be delivered.
    Notify,
    /// The updated tracking state could not be written.
    Store,
}

/// One per-application problem recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationFailure {
    pub application_id: DbId,
    pub display_name: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    /// Applications listed by the state store.
    pub processed: usize,
    /// Applications whose expiry moved to a later value.
    pub renewed: usize,
    /// Notifications delivered, all kinds.
    pub notified: usize,
    /// Applications left untouched because no expiry could be obtained.
    pub skipped: usize,
    pub failures: Vec<ApplicationFailure>,
}

impl RunSummary {
    pub(crate) fn begin(started_at: Timestamp) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            processed: 0,
            renewed: 0,
            notified: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub(crate) fn fail(
        &mut self,
        application_id: DbId,
        display_name: &str,
        stage: FailureStage,
        message: impl Into<String>,
    ) {
        self.failures.push(ApplicationFailure {
            application_id,
            display_name: display_name.to_string(),
            stage,
            message: message.into(),
        });
    }

    /// Failures recorded at `stage`.
    pub fn failures_at(&self, stage: FailureStage) -> impl Iterator<Item = &ApplicationFailure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
