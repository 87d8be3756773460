use std::collections::HashMap;

/// One merge request as returned by the GitLab API. The fetch layer treats
/// it as an opaque JSON object; only the numeric `id` field is interpreted,
/// for deduplication. Reshaping records for display is the route layer's job.
pub type MergeRequest = serde_json::Value;

/// Query parameters shared by every per-assignee sub-query of one aggregate
/// fetch. The assignee identity itself is injected per request.
pub type QueryParams = HashMap<String, serde_json::Value>;

/// The stable identity used for dedup, if the record carries one.
pub fn record_id(record: &MergeRequest) -> Option<i64> {
    record.get("id")?.as_i64()
}

/// Stringifies a parameter value the same way for the outbound query and the
/// cache key, so equal parameter maps always hit the same entry.
pub(crate) fn param_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
