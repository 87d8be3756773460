use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for the GitLab fetch layer.
pub type Result<T, E = FetchError> = std::result::Result<T, E>;

/// Errors surfaced by the GitLab fetch layer.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The upstream answered with a non-2xx status. The status is carried so
    /// callers can tell a rejected token from a failing instance.
    #[error("GitLab returned HTTP {status} for {context}")]
    UpstreamStatus { status: StatusCode, context: String },

    #[error("GitLab request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid GitLab API URL: {0}")]
    InvalidUrl(String),

    /// Returned by write operations when GITLAB_API_URL or GITLAB_TOKEN is
    /// missing. Plain fetches report `FetchOutcome::Unconfigured` instead,
    /// which is not an error.
    #[error("GitLab is not configured")]
    NotConfigured,
}

impl FetchError {
    /// True when the upstream rejected our credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            FetchError::UpstreamStatus { status, .. } if *status == StatusCode::UNAUTHORIZED
        )
    }
}
