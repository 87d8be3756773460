//! Metric names emitted by the GitLab fetch layer.

/// Per-assignee lookups served from the in-process cache.
pub const MR_CACHE_HIT: &str = "gitlab.mr_cache.hit";

/// Per-assignee lookups with no fresh entry; these go upstream.
pub const MR_CACHE_MISS: &str = "gitlab.mr_cache.miss";

/// Outbound requests to the GitLab API.
pub const UPSTREAM_REQUEST: &str = "gitlab.upstream.request";

/// Outbound requests answered with a non-2xx status.
pub const UPSTREAM_FAILURE: &str = "gitlab.upstream.failure";
