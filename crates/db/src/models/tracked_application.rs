//! Tracked application entity models and DTOs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use spn_core::expiry::{NotificationFlags, TrackingState};
use spn_core::tracking::TrackedApplication;
use spn_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `tracked_applications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrackedApplicationRow {
    pub id: DbId,
    pub display_name: String,
    pub client_id: Option<String>,
    pub owner_name: String,
    pub owner_email: String,
    pub cached_expiry: Option<Timestamp>,
    pub notified_upcoming: bool,
    pub notified_expired: bool,
    pub notified_renewal: bool,
    pub last_notified_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TrackedApplicationRow {
    /// The persisted expiry-tracking state of this row.
    pub fn tracking_state(&self) -> TrackingState {
        TrackingState {
            cached_expiry: self.cached_expiry,
            flags: NotificationFlags {
                upcoming: self.notified_upcoming,
                expired: self.notified_expired,
                renewal: self.notified_renewal,
            },
            last_notified_at: self.last_notified_at,
        }
    }
}

impl From<TrackedApplicationRow> for TrackedApplication {
    fn from(row: TrackedApplicationRow) -> Self {
        let state = row.tracking_state();
        TrackedApplication {
            id: row.id,
            display_name: row.display_name,
            owner_name: row.owner_name,
            owner_email: row.owner_email,
            state,
        }
    }
}

/// DTO for registering a freshly provisioned application.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTrackedApplication {
    pub display_name: String,
    pub client_id: Option<String>,
    pub owner_name: String,
    pub owner_email: String,
    /// Expiry of the secret issued at provisioning time.
    pub planned_expiry: Timestamp,
}

/// One application created during a reporting month.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonthlyCreationDetail {
    pub created_at: Timestamp,
    pub owner_name: String,
    pub owner_email: String,
    pub display_name: String,
}

/// Aggregate creation statistics for a calendar month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyCreationReport {
    pub year: i32,
    pub month: u32,
    pub total_created: i64,
    pub unique_owners: i64,
    pub unique_emails: i64,
    pub details: Vec<MonthlyCreationDetail>,
}

impl MonthlyCreationReport {
    /// Aggregate the applications created in one month.
    pub fn from_details(year: i32, month: u32, details: Vec<MonthlyCreationDetail>) -> Self {
        let unique_owners: HashSet<&str> = details.iter().map(|d| d.owner_name.as_str()).collect();
        let unique_emails: HashSet<String> =
            details.iter().map(|d| d.owner_email.to_lowercase()).collect();
        Self {
            year,
            month,
            total_created: details.len() as i64,
            unique_owners: unique_owners.len() as i64,
            unique_emails: unique_emails.len() as i64,
            details,
        }
    }
}
