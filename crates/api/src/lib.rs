//! Service Principal automation API server library.
//!
//! Exposes config, state, error handling, routes and the provisioning
//! service so integration tests and the binary entrypoint can both access
//! them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod provisioning;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
