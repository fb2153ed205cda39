//! Tracked applications and the collaborators the reconciler drives.
//!
//! The reconciler only ever sees these traits. Production wiring uses the
//! Graph client, the PostgreSQL store and the SMTP mailer; tests use
//! in-memory fakes.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{FetchError, StoreError};
use crate::expiry::TrackingState;
use crate::types::{DbId, Timestamp};

/// One provisioned Service Principal under expiry tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedApplication {
    /// Stable identifier assigned by the state store.
    pub id: DbId,
    /// Lookup key at the identity provider; unique among active applications.
    pub display_name: String,
    pub owner_name: String,
    pub owner_email: String,
    #[serde(flatten)]
    pub state: TrackingState,
}

/// Source of truth for credential expiry.
#[async_trait]
pub trait TruthFetcher: Send + Sync {
    /// Latest `endDateTime` across all credentials of the named application.
    ///
    /// `Ok(None)` when the application or its credentials do not exist;
    /// `Err` when the authority could not be asked.
    async fn latest_expiry(&self, display_name: &str) -> Result<Option<Timestamp>, FetchError>;
}

/// Persistence for per-application tracking state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Every application a full run must evaluate.
    async fn list_tracked(&self) -> Result<Vec<TrackedApplication>, StoreError>;

    /// Overwrite the tracking state of one row (last writer wins).
    ///
    /// Returns `false` when no active row has this id.
    async fn update(&self, id: DbId, state: &TrackingState) -> Result<bool, StoreError>;
}

/// Outbound notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send an HTML message. Failures are reported as `false`, never raised.
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> bool;
}
