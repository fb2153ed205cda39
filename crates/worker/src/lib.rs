//! Expiry reconciliation.
//!
//! The [`Reconciler`] compares every tracked application's cached expiry
//! with the identity provider, detects renewals and sends throttled
//! expiry notifications. The `spn-worker` binary runs it once or on an
//! interval; the API runs it on demand.

pub mod config;
pub mod reconciler;
pub mod scheduler;
pub mod summary;

pub use config::WorkerConfig;
pub use reconciler::{ReconcileError, Reconciler};
pub use summary::{ApplicationFailure, FailureStage, RunSummary};
