//! Domain building blocks for Service Principal credential automation.
//!
//! This crate has zero internal dependencies so the repository layer, the
//! Graph client, the mailer and the reconciler can all share it.
//!
//! - [`expiry`]: expiry classification, resend throttling and the
//!   per-application reconciliation decision.
//! - [`tracking`]: the tracked-application record and the collaborator
//!   traits the reconciler drives.
//! - [`provisioning`]: secret lifetime policy and request validation.

pub mod error;
pub mod expiry;
pub mod provisioning;
pub mod tracking;
pub mod types;
