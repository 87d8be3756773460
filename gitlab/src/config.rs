use std::env;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL_SECS: i64 = 30;
pub const DEFAULT_MIN_INTERVAL_MS: i64 = 200;
pub const DEFAULT_MAX_ASSIGNEES: i64 = 10;

/// GitLab connection settings, read from the environment once at startup.
/// The portal runs unconfigured (sample data only) when `api_url` or `token`
/// is missing.
#[derive(Clone, Debug, Default)]
pub struct GitlabConfig {
    /// Base URL of the GitLab REST API, e.g. `https://gitlab.example.com/api/v4`.
    pub api_url: Option<String>,
    /// Personal access token, sent as the `PRIVATE-TOKEN` header.
    pub token: Option<String>,
    /// Username queried when `assignees` is empty.
    pub default_username: Option<String>,
    /// Comma-separated assignee list for the review widget.
    pub assignees: String,
    /// Freshness window for cached per-assignee results.
    pub cache_ttl: Duration,
    /// Minimum spacing between outbound GitLab requests.
    pub min_request_interval: Duration,
    /// Fan-out cap per aggregate fetch; zero disables the cap.
    pub max_assignees: usize,
}

impl GitlabConfig {
    pub fn from_env() -> Self {
        GitlabConfig {
            api_url: non_empty(env::var("GITLAB_API_URL").ok()),
            token: non_empty(env::var("GITLAB_TOKEN").ok()),
            default_username: non_empty(env::var("GITLAB_USERNAME").ok()),
            assignees: env::var("GITLAB_ASSIGNEES")
                .unwrap_or_default()
                .trim()
                .to_string(),
            cache_ttl: Duration::from_secs(parse_count(
                env::var("GITLAB_CACHE_TTL_SECONDS").ok(),
                DEFAULT_CACHE_TTL_SECS,
            )),
            min_request_interval: Duration::from_millis(parse_count(
                env::var("GITLAB_MIN_INTERVAL_MS").ok(),
                DEFAULT_MIN_INTERVAL_MS,
            )),
            max_assignees: parse_cap(
                env::var("GITLAB_MAX_ASSIGNEES").ok(),
                DEFAULT_MAX_ASSIGNEES,
            ),
        }
    }

    /// Live fetching needs both the API URL and a token.
    pub fn is_configured(&self) -> bool {
        self.api_url.is_some() && self.token.is_some()
    }
}

/// Treats unset and whitespace-only variables the same way.
fn non_empty(raw: Option<String>) -> Option<String> {
    let value = raw?.trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Parses a non-negative count. Invalid values fall back to the default,
/// negative values clamp to zero.
fn parse_count(raw: Option<String>, default: i64) -> u64 {
    let value = raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(default);
    value.max(0) as u64
}

/// Parses the fan-out cap; zero or negative disables it.
fn parse_cap(raw: Option<String>, default: i64) -> usize {
    let value = raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(default);
    value.max(0) as usize
}
