//! Secret lifetime policy and validation of provisioning requests.

use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Lifetime of a production client secret (24 months).
pub const STANDARD_SECRET_LIFETIME_DAYS: i64 = 730;

/// Lifetime of a client secret when expiry test mode is enabled.
pub const TEST_MODE_SECRET_LIFETIME_MINUTES: i64 = 10;

/// Maximum length of an application display name accepted by Entra ID.
pub const MAX_APP_NAME_LENGTH: usize = 120;

/// Accepted owner email shape. Matched against the lowercased address.
pub const EMAIL_PATTERN: &str = r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("valid regex"));

// ---------------------------------------------------------------------------
// SecretLifetime
// ---------------------------------------------------------------------------

/// How long newly issued client secrets stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecretLifetime {
    #[default]
    Standard,
    /// Short-lived secrets for exercising the expiry notifications end to end.
    TestMode,
}

impl SecretLifetime {
    pub fn from_test_mode(enabled: bool) -> Self {
        if enabled {
            SecretLifetime::TestMode
        } else {
            SecretLifetime::Standard
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            SecretLifetime::Standard => Duration::days(STANDARD_SECRET_LIFETIME_DAYS),
            SecretLifetime::TestMode => Duration::minutes(TEST_MODE_SECRET_LIFETIME_MINUTES),
        }
    }

    /// Planned expiry for a secret issued at `issued_at`.
    pub fn expires_at(self, issued_at: Timestamp) -> Timestamp {
        issued_at + self.duration()
    }

    /// Human-readable validity, used in credential emails.
    pub fn describe(self) -> &'static str {
        match self {
            SecretLifetime::Standard => "24 months",
            SecretLifetime::TestMode => "10 minutes",
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Normalize and validate an owner email address.
///
/// Returns the trimmed, lowercased address.
pub fn validate_owner_email(email: &str) -> Result<String, CoreError> {
    let normalized = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&normalized) {
        return Err(CoreError::Validation("Invalid email format provided.".into()));
    }
    Ok(normalized)
}

/// Validate an application display name and return it trimmed.
///
/// Single quotes are allowed; the Graph client escapes them in filters.
pub fn validate_app_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Application name is required.".into()));
    }
    if trimmed.chars().count() > MAX_APP_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Application name must be at most {MAX_APP_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}
