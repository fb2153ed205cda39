//! Microsoft Graph client for Entra ID application registrations.
//!
//! [`GraphClient`] authenticates with the client-credentials flow, manages
//! application registrations and their password credentials, and serves as
//! the [`TruthFetcher`](spn_core::tracking::TruthFetcher) for secret expiry.

pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use client::GraphClient;
pub use config::GraphConfig;
pub use error::GraphError;
