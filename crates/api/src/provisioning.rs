//! Service Principal provisioning.
//!
//! Creating an application registers it in Entra ID, issues a secret with an
//! explicit expiry, starts tracking it and emails the credentials to the
//! requester. Renewing issues a fresh secret for a tracked application and
//! starts a new expiry epoch. Secrets are never stored; they only travel in
//! the credentials email.

use serde::{Deserialize, Serialize};
use spn_core::error::CoreError;
use spn_core::provisioning::{validate_app_name, validate_owner_email};
use spn_core::types::{DbId, Timestamp};
use spn_db::models::tracked_application::CreateTrackedApplication;
use spn_db::repositories::TrackedApplicationRepo;
use spn_events::templates::{self, CredentialDetails};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/applications`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateApplicationRequest {
    pub user_name: String,
    pub user_email: String,
    pub app_name: String,
}

/// Body of `POST /api/v1/applications/renew`.
#[derive(Debug, Clone, Deserialize)]
pub struct RenewSecretRequest {
    pub app_name: String,
}

/// Result of a create or renew. Carries everything except the secret.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedApplication {
    pub id: DbId,
    pub app_name: String,
    pub client_id: String,
    pub tenant_id: String,
    pub expires_at: Timestamp,
    pub owner_email: String,
    /// Whether the requester was added as an owner in Entra ID.
    /// Always `false` on renew, where ownership is untouched.
    pub owner_assigned: bool,
    pub credentials_emailed: bool,
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Provision a new application and secret for `input.user_email`.
pub async fn create_application(
    state: &AppState,
    input: CreateApplicationRequest,
    now: Timestamp,
) -> AppResult<ProvisionedApplication> {
    let owner_name = input.user_name.trim().to_string();
    if owner_name.is_empty() {
        return Err(CoreError::Validation("user_name must not be empty".into()).into());
    }
    let owner_email = validate_owner_email(&input.user_email)?;
    let app_name = validate_app_name(&input.app_name)?;

    if state.graph.find_application(&app_name).await?.is_some() {
        return Err(CoreError::Conflict(format!(
            "Service Principal with name '{app_name}' already exists"
        ))
        .into());
    }

    let application = state.graph.create_application(&app_name).await?;

    let lifetime = state.config.secret_lifetime;
    let expires_at = lifetime.expires_at(now);
    let credential = match state
        .graph
        .add_password(&application.id, &format!("{app_name} secret"), expires_at)
        .await
    {
        Ok(credential) => credential,
        Err(e) => {
            rollback(state, &application.id, &app_name).await;
            return Err(e.into());
        }
    };
    let secret = credential.secret_text.unwrap_or_default();
    // Graph may round the requested end date; track what it actually issued.
    let expires_at = credential.end_date_time.unwrap_or(expires_at);

    let owner_assigned = assign_owner(state, &application.id, &owner_email).await;

    let row = match TrackedApplicationRepo::create(
        &state.pool,
        &CreateTrackedApplication {
            display_name: app_name.clone(),
            client_id: Some(application.app_id.clone()),
            owner_name: owner_name.clone(),
            owner_email: owner_email.clone(),
            planned_expiry: expires_at,
        },
    )
    .await
    {
        Ok(row) => row,
        Err(e) => {
            rollback(state, &application.id, &app_name).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        application_id = row.id,
        display_name = %app_name,
        client_id = %application.app_id,
        expires_at = %expires_at,
        "Service Principal provisioned"
    );

    let email = templates::credentials_created(&CredentialDetails {
        owner_name: &owner_name,
        app_name: &app_name,
        client_id: &application.app_id,
        client_secret: &secret,
        tenant_id: state.graph.tenant_id(),
        expires_at,
        lifetime,
    });
    if !state
        .notifier
        .send(&owner_email, &email.subject, &email.html_body)
        .await
    {
        return Err(AppError::Delivery(format!(
            "Service Principal '{app_name}' was created but the credentials email to \
             {owner_email} failed; renew the secret to issue new credentials"
        )));
    }

    Ok(ProvisionedApplication {
        id: row.id,
        app_name,
        client_id: application.app_id,
        tenant_id: state.graph.tenant_id().to_string(),
        expires_at,
        owner_email,
        owner_assigned,
        credentials_emailed: true,
    })
}

/// Add the requester as owner. Failures are logged, never fatal.
async fn assign_owner(state: &AppState, object_id: &str, email: &str) -> bool {
    let user_id = match state.graph.find_user_id(email).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            tracing::warn!(email, "No directory user for owner email, skipping owner assignment");
            return false;
        }
        Err(e) => {
            tracing::warn!(email, error = %e, "Owner lookup failed");
            return false;
        }
    };
    match state.graph.add_owner(object_id, &user_id).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(email, error = %e, "Failed to add application owner");
            false
        }
    }
}

/// Best-effort removal of an application whose provisioning failed midway.
async fn rollback(state: &AppState, object_id: &str, app_name: &str) {
    if let Err(e) = state.graph.delete_application(object_id).await {
        tracing::error!(
            object_id,
            display_name = %app_name,
            error = %e,
            "Failed to roll back partially provisioned application"
        );
    }
}

// ---------------------------------------------------------------------------
// Renew
// ---------------------------------------------------------------------------

/// Issue a new secret for a tracked application and reset its tracking.
pub async fn renew_secret(
    state: &AppState,
    input: RenewSecretRequest,
    now: Timestamp,
) -> AppResult<ProvisionedApplication> {
    let app_name = input.app_name.trim();
    if app_name.is_empty() {
        return Err(AppError::BadRequest("app_name is required".into()));
    }

    let tracked = TrackedApplicationRepo::find_by_display_name(&state.pool, app_name)
        .await?
        .ok_or_else(|| CoreError::NotFoundByName {
            entity: "Tracked application",
            name: app_name.to_string(),
        })?;

    let application = state
        .graph
        .find_application(app_name)
        .await?
        .ok_or_else(|| CoreError::NotFoundByName {
            entity: "Application",
            name: app_name.to_string(),
        })?;

    let lifetime = state.config.secret_lifetime;
    let credential = state
        .graph
        .add_password(
            &application.id,
            &format!("{app_name} secret renewed"),
            lifetime.expires_at(now),
        )
        .await?;
    let expires_at = credential.end_date_time.unwrap_or_else(|| lifetime.expires_at(now));
    let secret = credential.secret_text.unwrap_or_default();

    let row = TrackedApplicationRepo::reset_for_renewal(&state.pool, tracked.id, expires_at)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Tracked application",
            id: tracked.id,
        })?;

    tracing::info!(
        application_id = row.id,
        display_name = %app_name,
        expires_at = %expires_at,
        "Secret renewed"
    );

    let email = templates::credentials_renewed(&CredentialDetails {
        owner_name: &row.owner_name,
        app_name,
        client_id: &application.app_id,
        client_secret: &secret,
        tenant_id: state.graph.tenant_id(),
        expires_at,
        lifetime,
    });
    let credentials_emailed = state
        .notifier
        .send(&row.owner_email, &email.subject, &email.html_body)
        .await;
    if !credentials_emailed {
        tracing::error!(
            application_id = row.id,
            display_name = %app_name,
            "Renewal email could not be delivered"
        );
    }

    Ok(ProvisionedApplication {
        id: row.id,
        app_name: app_name.to_string(),
        client_id: application.app_id,
        tenant_id: state.graph.tenant_id().to_string(),
        expires_at,
        owner_email: row.owner_email,
        owner_assigned: false,
        credentials_emailed,
    })
}
