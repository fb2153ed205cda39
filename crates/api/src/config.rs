use spn_core::error::CoreError;
use spn_core::expiry::{ExpiryPolicy, DEFAULT_EXPIRY_THRESHOLD_DAYS, DEFAULT_RESEND_INTERVAL_DAYS};
use spn_core::provisioning::SecretLifetime;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`). Provisioning makes
    /// several Graph calls, so this is longer than a typical CRUD timeout.
    pub request_timeout_secs: u64,
    /// Defaults for reconciliation runs triggered over HTTP.
    pub policy: ExpiryPolicy,
    /// Lifetime of secrets issued by create and renew.
    pub secret_lifetime: SecretLifetime,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `5000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `60`                    |
    /// | `EXPIRY_THRESHOLD_DAYS` | `30`                    |
    /// | `RESEND_INTERVAL_DAYS`  | `2`                     |
    /// | `EXPIRY_TEST_MODE`      | `false`                 |
    pub fn from_env() -> Result<Self, CoreError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = parse_var("PORT", 5000)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_var("REQUEST_TIMEOUT_SECS", 60)?;

        let policy = ExpiryPolicy::from_days(
            parse_var("EXPIRY_THRESHOLD_DAYS", DEFAULT_EXPIRY_THRESHOLD_DAYS)?,
            parse_var("RESEND_INTERVAL_DAYS", DEFAULT_RESEND_INTERVAL_DAYS)?,
        )?;

        let test_mode = std::env::var("EXPIRY_TEST_MODE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            policy,
            secret_lifetime: SecretLifetime::from_test_mode(test_mode),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{name} has an invalid value '{raw}'"))),
    }
}
