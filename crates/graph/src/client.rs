//! Authenticated Graph client.
//!
//! Access tokens come from the client-credentials flow and are cached until
//! shortly before they expire. Every call is a single HTTP round trip; retry
//! policy belongs to the caller (the reconciler simply tries again next run).

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use spn_core::error::FetchError;
use spn_core::tracking::TruthFetcher;
use spn_core::types::Timestamp;
use tokio::sync::RwLock;

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::models::{
    AddPasswordRequest, Application, DirectoryUser, GraphCollection, NewApplication,
    NewPasswordCredential, OwnerReference, PasswordCredential, TokenResponse,
};

/// OAuth scope granting the app's configured Graph permissions.
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Fields requested when looking up an application.
const APPLICATION_SELECT: &str = "id,appId,displayName,passwordCredentials";

/// Refresh a cached token this long before Graph says it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Timestamp,
}

/// Escape a value for use inside a single-quoted OData string literal.
pub fn escape_odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}

// ---------------------------------------------------------------------------
// GraphClient
// ---------------------------------------------------------------------------

/// Microsoft Graph client scoped to one tenant.
pub struct GraphClient {
    http: reqwest::Client,
    config: GraphConfig,
    token: RwLock<Option<CachedToken>>,
}

impl GraphClient {
    /// Build a client with the configured request timeout.
    pub fn new(config: GraphConfig) -> Result<Self, GraphError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.config.tenant_id
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    /// Return a valid access token, requesting a new one when the cached
    /// token is missing or about to expire.
    async fn access_token(&self) -> Result<String, GraphError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Utc::now() {
                    return Ok(token.value.clone());
                }
            }
        }

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ];
        let response = self
            .http
            .post(self.config.token_url())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, "Graph token request rejected");
            return Err(GraphError::Token(format!("HTTP {status}: {body}")));
        }

        let token: TokenResponse = decode(response).await?;
        let lifetime = (token.expires_in - TOKEN_REFRESH_MARGIN_SECS).max(0);
        let cached = CachedToken {
            value: token.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        };
        let value = cached.value.clone();
        *self.token.write().await = Some(cached);

        tracing::debug!(expires_in = token.expires_in, "Acquired Graph access token");
        Ok(value)
    }

    /// Attach the bearer token and send.
    async fn send(&self, request: RequestBuilder) -> Result<Response, GraphError> {
        let token = self.access_token().await?;
        Ok(request.bearer_auth(token).send().await?)
    }

    // -----------------------------------------------------------------------
    // Applications
    // -----------------------------------------------------------------------

    /// Look up an application (with its password credentials) by display
    /// name. Returns the first match, or `None`.
    pub async fn find_application(
        &self,
        display_name: &str,
    ) -> Result<Option<Application>, GraphError> {
        let filter = format!("displayName eq '{}'", escape_odata_literal(display_name));
        let request = self
            .http
            .get(self.config.graph_url("/applications"))
            .query(&[("$filter", filter.as_str()), ("$select", APPLICATION_SELECT)]);

        let response = ensure_success(self.send(request).await?).await?;
        let page: GraphCollection<Application> = decode(response).await?;
        Ok(page.value.into_iter().next())
    }

    /// Register a new application with the given display name.
    pub async fn create_application(&self, display_name: &str) -> Result<Application, GraphError> {
        let request = self
            .http
            .post(self.config.graph_url("/applications"))
            .json(&NewApplication { display_name });

        let response = ensure_success(self.send(request).await?).await?;
        let application: Application = decode(response).await?;
        tracing::info!(
            object_id = %application.id,
            client_id = %application.app_id,
            display_name,
            "Created Graph application"
        );
        Ok(application)
    }

    /// Add a client secret that expires at `end_date_time`.
    ///
    /// The returned credential carries `secret_text`, which Graph never
    /// reveals again.
    pub async fn add_password(
        &self,
        object_id: &str,
        secret_display_name: &str,
        end_date_time: Timestamp,
    ) -> Result<PasswordCredential, GraphError> {
        let body = AddPasswordRequest {
            password_credential: NewPasswordCredential {
                display_name: secret_display_name,
                end_date_time,
            },
        };
        let request = self
            .http
            .post(self.config.graph_url(&format!("/applications/{object_id}/addPassword")))
            .json(&body);

        let response = ensure_success(self.send(request).await?).await?;
        let credential: PasswordCredential = decode(response).await?;
        if credential.secret_text.is_none() {
            return Err(GraphError::Malformed("addPassword response lacks secretText".into()));
        }
        Ok(credential)
    }

    /// Delete an application registration by object id.
    pub async fn delete_application(&self, object_id: &str) -> Result<(), GraphError> {
        let request = self
            .http
            .delete(self.config.graph_url(&format!("/applications/{object_id}")));
        ensure_success(self.send(request).await?).await?;
        tracing::info!(object_id, "Deleted Graph application");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Owners
    // -----------------------------------------------------------------------

    /// Resolve a directory user id from an email address.
    ///
    /// Tries `/users/{email}` (user principal name) first, then falls back
    /// to filtering on the `mail` attribute.
    pub async fn find_user_id(&self, email: &str) -> Result<Option<String>, GraphError> {
        let request = self.http.get(self.user_url(email)?);
        let response = self.send(request).await?;
        if response.status().is_success() {
            let user: DirectoryUser = decode(response).await?;
            return Ok(Some(user.id));
        }
        tracing::debug!(
            status = response.status().as_u16(),
            email,
            "User principal lookup failed, falling back to mail filter"
        );

        let filter = format!("mail eq '{}'", escape_odata_literal(email));
        let request = self
            .http
            .get(self.config.graph_url("/users"))
            .query(&[("$filter", filter.as_str())]);
        let response = ensure_success(self.send(request).await?).await?;
        let page: GraphCollection<DirectoryUser> = decode(response).await?;
        Ok(page.value.into_iter().next().map(|u| u.id))
    }

    /// `/users/{email}` with the address percent-encoded as one path segment.
    fn user_url(&self, email: &str) -> Result<reqwest::Url, GraphError> {
        let mut url = reqwest::Url::parse(&self.config.graph_url("/users"))
            .map_err(|e| GraphError::Config(format!("invalid Graph endpoint: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| GraphError::Config("Graph endpoint cannot carry a path".into()))?
            .push(email);
        Ok(url)
    }

    /// Add a directory object as owner of an application.
    pub async fn add_owner(&self, object_id: &str, user_id: &str) -> Result<(), GraphError> {
        let body = OwnerReference {
            odata_id: self.config.graph_url(&format!("/directoryObjects/{user_id}")),
        };
        let request = self
            .http
            .post(self.config.graph_url(&format!("/applications/{object_id}/owners/$ref")))
            .json(&body);
        ensure_success(self.send(request).await?).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expiry
    // -----------------------------------------------------------------------

    /// Latest secret expiry for the named application; `None` when the
    /// application does not exist or has no password credentials.
    pub async fn latest_secret_expiry(
        &self,
        display_name: &str,
    ) -> Result<Option<Timestamp>, GraphError> {
        Ok(self
            .find_application(display_name)
            .await?
            .and_then(|app| app.latest_secret_expiry()))
    }
}

#[async_trait]
impl TruthFetcher for GraphClient {
    async fn latest_expiry(&self, display_name: &str) -> Result<Option<Timestamp>, FetchError> {
        self.latest_secret_expiry(display_name)
            .await
            .map_err(FetchError::from)
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Turn a non-2xx response into [`GraphError::Status`].
async fn ensure_success(response: Response) -> Result<Response, GraphError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!("Graph throttled the request");
    }
    Err(GraphError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Decode a JSON body, reporting shape mismatches as [`GraphError::Malformed`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GraphError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| GraphError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_quotes_are_doubled() {
        assert_eq!(escape_odata_literal("O'Brien's app"), "O''Brien''s app");
    }

    #[test]
    fn plain_values_are_unchanged() {
        assert_eq!(escape_odata_literal("billing-sync"), "billing-sync");
    }
}
