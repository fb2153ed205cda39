use std::time::Duration;

use spn_core::error::CoreError;
use spn_core::expiry::{ExpiryPolicy, DEFAULT_EXPIRY_THRESHOLD_DAYS, DEFAULT_RESEND_INTERVAL_DAYS};

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub policy: ExpiryPolicy,
    /// `None` runs once and exits.
    pub interval: Option<Duration>,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                  | Default        |
    /// |---------------------------|----------------|
    /// | `EXPIRY_THRESHOLD_DAYS`   | `30`           |
    /// | `RESEND_INTERVAL_DAYS`    | `2`            |
    /// | `RECONCILE_INTERVAL_SECS` | unset, run once |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let int = |name: &str, default: i64| -> Result<i64, CoreError> {
            match lookup(name) {
                None => Ok(default),
                Some(raw) => raw.trim().parse().map_err(|_| {
                    CoreError::Validation(format!("{name} must be an integer, got '{raw}'"))
                }),
            }
        };

        let policy = ExpiryPolicy::from_days(
            int("EXPIRY_THRESHOLD_DAYS", DEFAULT_EXPIRY_THRESHOLD_DAYS)?,
            int("RESEND_INTERVAL_DAYS", DEFAULT_RESEND_INTERVAL_DAYS)?,
        )?;

        let interval = match lookup("RECONCILE_INTERVAL_SECS") {
            None => None,
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    CoreError::Validation(format!(
                        "RECONCILE_INTERVAL_SECS must be a positive integer, got '{raw}'"
                    ))
                })?;
                if secs == 0 {
                    return Err(CoreError::Validation(
                        "RECONCILE_INTERVAL_SECS must be greater than zero".into(),
                    ));
                }
                Some(Duration::from_secs(secs))
            }
        };

        Ok(Self { policy, interval })
    }
}
