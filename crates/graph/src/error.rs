use spn_core::error::FetchError;

/// Error type for Microsoft Graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Required configuration is missing or invalid.
    #[error("Graph configuration error: {0}")]
    Config(String),

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The token endpoint refused to issue an access token.
    #[error("Token request failed: {0}")]
    Token(String),

    /// Graph answered with a non-2xx status code.
    #[error("Graph returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("Malformed Graph response: {0}")]
    Malformed(String),
}

impl GraphError {
    /// Whether Graph rejected the caller's identity or permissions.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            GraphError::Token(_) => true,
            GraphError::Status { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

impl From<GraphError> for FetchError {
    fn from(err: GraphError) -> Self {
        let message = err.to_string();
        if err.is_auth_failure() {
            return FetchError::Unauthorized(message);
        }
        match err {
            GraphError::Malformed(_) => FetchError::Malformed(message),
            _ => FetchError::Unavailable(message),
        }
    }
}
