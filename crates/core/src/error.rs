use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("{entity} '{name}' not found")]
    NotFoundByName { entity: &'static str, name: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure to obtain the authoritative expiry from the identity provider.
///
/// Distinct from "not found", which is `Ok(None)` at the fetcher boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Network, DNS or timeout failure talking to the authority.
    #[error("Identity provider unreachable: {0}")]
    Unavailable(String),

    /// Token acquisition failed or the authority rejected our credentials.
    #[error("Identity provider rejected credentials: {0}")]
    Unauthorized(String),

    /// The authority answered with a body we could not interpret.
    #[error("Malformed identity provider response: {0}")]
    Malformed(String),
}

/// Failure reading from or writing to the state store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("State store error: {0}")]
pub struct StoreError(pub String);
