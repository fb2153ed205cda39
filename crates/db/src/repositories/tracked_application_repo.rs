//! Repository for the `tracked_applications` table.

use sqlx::PgPool;
use spn_core::expiry::TrackingState;
use spn_core::types::{DbId, Timestamp};

use crate::models::tracked_application::{
    CreateTrackedApplication, MonthlyCreationDetail, TrackedApplicationRow,
};

/// Column list for `tracked_applications` queries.
const COLUMNS: &str = "id, display_name, client_id, owner_name, owner_email, cached_expiry, \
    notified_upcoming, notified_expired, notified_renewal, last_notified_at, \
    deleted_at, created_at, updated_at";

/// Provides CRUD operations for tracked applications.
pub struct TrackedApplicationRepo;

impl TrackedApplicationRepo {
    /// Insert a newly provisioned application with all notification flags
    /// cleared and `cached_expiry` set to the planned expiry.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTrackedApplication,
    ) -> Result<TrackedApplicationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO tracked_applications \
                (display_name, client_id, owner_name, owner_email, cached_expiry) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrackedApplicationRow>(&query)
            .bind(&input.display_name)
            .bind(&input.client_id)
            .bind(&input.owner_name)
            .bind(&input.owner_email)
            .bind(input.planned_expiry)
            .fetch_one(pool)
            .await
    }

    /// Find an active application by id.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TrackedApplicationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tracked_applications WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, TrackedApplicationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an active application by its identity provider display name.
    pub async fn find_by_display_name(
        pool: &PgPool,
        display_name: &str,
    ) -> Result<Option<TrackedApplicationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tracked_applications \
             WHERE display_name = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, TrackedApplicationRow>(&query)
            .bind(display_name)
            .fetch_optional(pool)
            .await
    }

    /// List every active application in id order.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<TrackedApplicationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tracked_applications WHERE deleted_at IS NULL ORDER BY id"
        );
        sqlx::query_as::<_, TrackedApplicationRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Overwrite the expiry-tracking columns of one row.
    ///
    /// `last_notified_at` is written as `GREATEST(stored, new)` so it never
    /// moves backwards even if two writers race. Returns `false` if no active
    /// row has this id.
    pub async fn update_tracking(
        pool: &PgPool,
        id: DbId,
        state: &TrackingState,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tracked_applications SET \
                cached_expiry = $2, \
                notified_upcoming = $3, \
                notified_expired = $4, \
                notified_renewal = $5, \
                last_notified_at = GREATEST(last_notified_at, $6), \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(state.cached_expiry)
        .bind(state.flags.upcoming)
        .bind(state.flags.expired)
        .bind(state.flags.renewal)
        .bind(state.last_notified_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Start a new expiry epoch after a secret was issued through the API:
    /// set the new expiry and clear every notification flag.
    pub async fn reset_for_renewal(
        pool: &PgPool,
        id: DbId,
        new_expiry: Timestamp,
    ) -> Result<Option<TrackedApplicationRow>, sqlx::Error> {
        let query = format!(
            "UPDATE tracked_applications SET \
                cached_expiry = $2, \
                notified_upcoming = false, \
                notified_expired = false, \
                notified_renewal = false, \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrackedApplicationRow>(&query)
            .bind(id)
            .bind(new_expiry)
            .fetch_optional(pool)
            .await
    }

    /// Applications created in `[from, to)`, oldest first.
    pub async fn list_created_between(
        pool: &PgPool,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<MonthlyCreationDetail>, sqlx::Error> {
        sqlx::query_as::<_, MonthlyCreationDetail>(
            "SELECT created_at, owner_name, owner_email, display_name \
             FROM tracked_applications \
             WHERE created_at >= $1 AND created_at < $2 \
             ORDER BY created_at",
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }
}
