//! PostgreSQL-backed [`StateStore`].

use async_trait::async_trait;
use spn_core::error::StoreError;
use spn_core::expiry::TrackingState;
use spn_core::tracking::{StateStore, TrackedApplication};
use spn_core::types::DbId;

use crate::repositories::TrackedApplicationRepo;
use crate::DbPool;

/// State store reading and writing the `tracked_applications` table.
#[derive(Clone)]
pub struct PgStateStore {
    pool: DbPool,
}

impl PgStateStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn list_tracked(&self) -> Result<Vec<TrackedApplication>, StoreError> {
        let rows = TrackedApplicationRepo::list_active(&self.pool)
            .await
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(rows.into_iter().map(TrackedApplication::from).collect())
    }

    async fn update(&self, id: DbId, state: &TrackingState) -> Result<bool, StoreError> {
        TrackedApplicationRepo::update_tracking(&self.pool, id, state)
            .await
            .map_err(|e| StoreError(e.to_string()))
    }
}
