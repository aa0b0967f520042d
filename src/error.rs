use thiserror::Error;

/// Failure of a single backend request.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned HTTP {code}")]
    Status { code: u16 },

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("all endpoints failed, last error: {last}")]
    AllEndpointsFailed { last: String },
}

impl BackendError {
    /// Whether another endpoint or attempt may still succeed.
    ///
    /// Rate limiting (429), server errors, transport errors, and malformed
    /// responses are worth retrying against a fallback mirror; any other
    /// client error is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Http(_) => true,
            BackendError::Status { code } => *code == 429 || *code >= 500,
            BackendError::Decode(_) => true,
            BackendError::AllEndpointsFailed { .. } => false,
        }
    }
}

/// Failure of a discovery run as a whole.
///
/// Per-cell failures never surface here; they are collected in
/// [`crate::fetch::FetchOutcome::errors`] and logged.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The run was superseded or torn down. A normal early-exit path: no
    /// cache entry is written for the run.
    #[error("discovery cancelled")]
    Cancelled,
}
