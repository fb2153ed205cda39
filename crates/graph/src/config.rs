use std::time::Duration;

use crate::error::GraphError;

/// Default Entra ID authority host.
const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Default Microsoft Graph endpoint.
const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Credentials and endpoints for the Graph client.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Authority host, without the tenant segment.
    pub authority_host: String,
    /// Graph API base, e.g. `https://graph.microsoft.com/v1.0`.
    pub graph_endpoint: String,
    pub request_timeout: Duration,
}

impl GraphConfig {
    /// Config pointing at the public Microsoft cloud.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            graph_endpoint: DEFAULT_GRAPH_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable               | Required | Default                              |
    /// |------------------------|----------|--------------------------------------|
    /// | `TENANT_ID`            | yes      | -                                    |
    /// | `CLIENT_ID`            | yes      | -                                    |
    /// | `CLIENT_SECRET`        | yes      | -                                    |
    /// | `GRAPH_AUTHORITY_HOST` | no       | `https://login.microsoftonline.com`  |
    /// | `GRAPH_ENDPOINT`       | no       | `https://graph.microsoft.com/v1.0`   |
    /// | `GRAPH_TIMEOUT_SECS`   | no       | `30`                                 |
    pub fn from_env() -> Result<Self, GraphError> {
        let required = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let (tenant_id, client_id, client_secret) =
            match (required("TENANT_ID"), required("CLIENT_ID"), required("CLIENT_SECRET")) {
                (Some(t), Some(c), Some(s)) => (t, c, s),
                (t, c, s) => {
                    let missing: Vec<&str> = [("TENANT_ID", t), ("CLIENT_ID", c), ("CLIENT_SECRET", s)]
                        .into_iter()
                        .filter(|(_, v)| v.is_none())
                        .map(|(k, _)| k)
                        .collect();
                    return Err(GraphError::Config(format!(
                        "missing environment variables: {}",
                        missing.join(", ")
                    )));
                }
            };

        let mut config = Self::new(tenant_id, client_id, client_secret);
        if let Ok(host) = std::env::var("GRAPH_AUTHORITY_HOST") {
            config.authority_host = host;
        }
        if let Ok(endpoint) = std::env::var("GRAPH_ENDPOINT") {
            config.graph_endpoint = endpoint;
        }
        if let Some(secs) = std::env::var("GRAPH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Client-credentials token endpoint for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Absolute Graph URL for `path` (which starts with `/`).
    pub fn graph_url(&self, path: &str) -> String {
        format!("{}{path}", self.graph_endpoint.trim_end_matches('/'))
    }
}
