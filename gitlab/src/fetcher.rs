use crate::cache::{MrCache, cache_key};
use crate::client::GitlabClient;
use crate::config::GitlabConfig;
use crate::errors::{FetchError, Result};
use crate::throttle::Throttle;
use crate::types::{MergeRequest, QueryParams, record_id};
use serde_json::Value;
use std::collections::HashSet;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 40;

/// Result of one aggregate fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// GITLAB_API_URL or GITLAB_TOKEN is missing; the caller should fall
    /// back to its bundled sample data. Distinct from a configured instance
    /// that simply returned nothing.
    Unconfigured,
    /// Live data. `merge_requests` is empty when no assignee resolved.
    Fetched {
        merge_requests: Vec<MergeRequest>,
        default_assignee: Option<String>,
    },
}

/// Aggregates merge requests across assignees: one upstream query per
/// assignee, answered from the cache when fresh, paced by the throttle when
/// not, merged in assignee order with first-seen-wins dedup by record id.
///
/// One instance is constructed per process and shared by every request
/// handler; the cache and throttle state it owns is process-wide.
pub struct MrFetcher {
    config: GitlabConfig,
    client: Option<GitlabClient>,
    cache: MrCache,
    throttle: Throttle,
}

impl MrFetcher {
    pub fn new(config: GitlabConfig) -> Result<Self> {
        let client = match (&config.api_url, &config.token) {
            (Some(api_url), Some(token)) => Some(GitlabClient::new(api_url, token)?),
            _ => None,
        };

        Ok(MrFetcher {
            config,
            client,
            cache: MrCache::default(),
            throttle: Throttle::default(),
        })
    }

    pub fn config(&self) -> &GitlabConfig {
        &self.config
    }

    /// Fetches and aggregates merge requests for a comma-separated assignee
    /// list, falling back to the configured default username when the list
    /// is empty.
    ///
    /// Any non-2xx status or transport error aborts the whole call; the
    /// caller decides the fallback. A malformed response body only empties
    /// that assignee's page.
    pub async fn fetch(
        &self,
        assignees_raw: &str,
        base_params: &QueryParams,
    ) -> Result<FetchOutcome> {
        let Some(client) = &self.client else {
            return Ok(FetchOutcome::Unconfigured);
        };
        let default_assignee = self.config.default_username.clone();

        let assignees = resolve_assignees(
            assignees_raw,
            default_assignee.as_deref(),
            self.config.max_assignees,
        );
        if assignees.is_empty() {
            return Ok(FetchOutcome::Fetched {
                merge_requests: Vec::new(),
                default_assignee,
            });
        }

        tracing::debug!(
            assignees = %assignees.join(", "),
            "fetching merge requests per assignee"
        );

        let params = clamp_page_size(base_params);

        let mut merge_requests: Vec<MergeRequest> = Vec::new();
        let mut seen_ids: HashSet<i64> = HashSet::new();

        for assignee in &assignees {
            let key = cache_key(client.base_url(), assignee, &params);
            let page = match self.cache.lookup(&key, self.config.cache_ttl) {
                Some(cached) => cached,
                None => {
                    self.throttle.wait(self.config.min_request_interval).await;
                    let fresh = client.list_merge_requests(assignee, &params).await?;
                    self.cache.store(&key, fresh.clone());
                    fresh
                }
            };

            for record in page {
                // Records without a numeric id cannot be compared, so they
                // are kept unconditionally.
                if let Some(id) = record_id(&record) {
                    if !seen_ids.insert(id) {
                        continue;
                    }
                }
                merge_requests.push(record);
            }
        }

        Ok(FetchOutcome::Fetched {
            merge_requests,
            default_assignee,
        })
    }

    /// Best-effort rebase trigger for a single merge request.
    pub async fn trigger_rebase(&self, project_id: u64, mr_iid: u64) -> Result<()> {
        let Some(client) = &self.client else {
            return Err(FetchError::NotConfigured);
        };
        client.trigger_rebase(project_id, mr_iid).await
    }
}

/// Splits the raw comma-separated list, falls back to the default username,
/// and truncates to the fan-out cap (first N win; zero disables the cap).
fn resolve_assignees(raw: &str, default_username: Option<&str>, cap: usize) -> Vec<String> {
    let mut assignees: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();

    if assignees.is_empty() {
        if let Some(name) = default_username {
            assignees.push(name.to_string());
        }
    }

    if cap > 0 && assignees.len() > cap {
        assignees.truncate(cap);
    }
    assignees
}

/// Clamps `per_page` before it goes upstream, whatever the caller supplied.
fn clamp_page_size(base_params: &QueryParams) -> QueryParams {
    let mut params = base_params.clone();

    let per_page = match params.get("per_page").and_then(page_size) {
        Some(size) if size > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
        Some(size) if size >= 1 => size,
        _ => DEFAULT_PAGE_SIZE,
    };
    params.insert("per_page".to_string(), Value::from(per_page));
    params
}

fn page_size(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str()?.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_url: &str) -> GitlabConfig {
        GitlabConfig {
            api_url: Some(api_url.to_string()),
            token: Some("test-token".to_string()),
            cache_ttl: Duration::from_secs(30),
            min_request_interval: Duration::ZERO,
            max_assignees: 10,
            ..GitlabConfig::default()
        }
    }

    fn fetcher(config: GitlabConfig) -> MrFetcher {
        MrFetcher::new(config).unwrap()
    }

    fn mr_mock(assignee: &str, body: serde_json::Value) -> Mock {
        Mock::given(method("GET"))
            .and(path("/merge_requests"))
            .and(query_param("assignee_username", assignee))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
    }

    fn items(outcome: FetchOutcome) -> Vec<MergeRequest> {
        match outcome {
            FetchOutcome::Fetched { merge_requests, .. } => merge_requests,
            FetchOutcome::Unconfigured => panic!("expected live data"),
        }
    }

    #[tokio::test]
    async fn unconfigured_instance_returns_no_data_and_makes_no_calls() {
        let fetcher = fetcher(GitlabConfig::default());
        let outcome = fetcher.fetch("alice", &QueryParams::new()).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Unconfigured));
    }

    #[tokio::test]
    async fn empty_assignee_resolution_is_a_valid_empty_result() {
        // Configured, but neither an assignee list nor a default username.
        let fetcher = fetcher(test_config("http://127.0.0.1:1"));
        let outcome = fetcher.fetch("", &QueryParams::new()).await.unwrap();

        match outcome {
            FetchOutcome::Fetched {
                merge_requests,
                default_assignee,
            } => {
                assert!(merge_requests.is_empty());
                assert_eq!(default_assignee, None);
            }
            FetchOutcome::Unconfigured => panic!("instance is configured"),
        }
    }

    #[tokio::test]
    async fn default_username_is_used_when_no_list_is_given() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/merge_requests"))
            .and(query_param("assignee_username", "gael"))
            .and(query_param("state", "opened"))
            .and(header("PRIVATE-TOKEN", "test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "title": "one"}])))
            .expect(1)
            .mount(&server)
            .await;

        let config = GitlabConfig {
            default_username: Some("gael".to_string()),
            ..test_config(&server.uri())
        };
        let params = QueryParams::from([("state".to_string(), json!("opened"))]);

        let outcome = fetcher(config).fetch("", &params).await.unwrap();
        match outcome {
            FetchOutcome::Fetched {
                merge_requests,
                default_assignee,
            } => {
                assert_eq!(merge_requests.len(), 1);
                assert_eq!(default_assignee, Some("gael".to_string()));
            }
            FetchOutcome::Unconfigured => panic!("instance is configured"),
        }
    }

    #[tokio::test]
    async fn repeated_fetches_within_ttl_are_served_from_cache() {
        let server = MockServer::start().await;
        mr_mock("alice", json!([{"id": 1}]))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = fetcher(test_config(&server.uri()));
        let first = items(fetcher.fetch("alice", &QueryParams::new()).await.unwrap());
        let second = items(fetcher.fetch("alice", &QueryParams::new()).await.unwrap());

        // expect(1) on the mock asserts the second call never went upstream.
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn expired_entries_trigger_a_fresh_fetch() {
        let server = MockServer::start().await;
        mr_mock("alice", json!([{"id": 1}]))
            .expect(2)
            .mount(&server)
            .await;

        let config = GitlabConfig {
            cache_ttl: Duration::ZERO,
            ..test_config(&server.uri())
        };
        let fetcher = fetcher(config);
        fetcher.fetch("alice", &QueryParams::new()).await.unwrap();
        fetcher.fetch("alice", &QueryParams::new()).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_ids_across_assignees_are_dropped_first_seen_wins() {
        let server = MockServer::start().await;
        mr_mock("alice", json!([{"id": 1, "title": "a1"}, {"id": 2, "title": "a2"}]))
            .mount(&server)
            .await;
        mr_mock(
            "bob",
            json!([
                {"id": 2, "title": "b2"},
                {"id": 3, "title": "b3"},
                {"title": "no id, kept as-is"}
            ]),
        )
        .mount(&server)
        .await;

        let merged = items(
            fetcher(test_config(&server.uri()))
                .fetch("alice,bob", &QueryParams::new())
                .await
                .unwrap(),
        );

        let titles: Vec<&str> = merged
            .iter()
            .map(|mr| mr["title"].as_str().unwrap())
            .collect();
        // id 2 keeps alice's copy; the id-less record is never deduplicated.
        assert_eq!(titles, ["a1", "a2", "b3", "no id, kept as-is"]);
    }

    #[tokio::test]
    async fn fan_out_is_capped_to_the_first_assignees() {
        let server = MockServer::start().await;
        mr_mock("alice", json!([{"id": 1}])).expect(1).mount(&server).await;
        mr_mock("bob", json!([{"id": 2}])).expect(1).mount(&server).await;
        // No mock for carol: a request for her would 404 and fail the call.

        let config = GitlabConfig {
            max_assignees: 2,
            ..test_config(&server.uri())
        };
        let merged = items(
            fetcher(config)
                .fetch("alice, bob, carol", &QueryParams::new())
                .await
                .unwrap(),
        );
        assert_eq!(merged.len(), 2);
    }

    #[tokio::test]
    async fn page_size_is_clamped_before_going_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/merge_requests"))
            .and(query_param("assignee_username", "alice"))
            .and(query_param("per_page", "40"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let params = QueryParams::from([("per_page".to_string(), json!(500))]);
        fetcher(test_config(&server.uri()))
            .fetch("alice", &params)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn a_401_is_distinguishable_as_an_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/merge_requests"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = fetcher(test_config(&server.uri()))
            .fetch("alice", &QueryParams::new())
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn an_upstream_error_aborts_the_whole_aggregate_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/merge_requests"))
            .and(query_param("assignee_username", "alice"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mr_mock("bob", json!([{"id": 2}]))
            .expect(0)
            .mount(&server)
            .await;

        let err = fetcher(test_config(&server.uri()))
            .fetch("alice,bob", &QueryParams::new())
            .await
            .unwrap_err();

        assert!(!err.is_auth_failure());
        assert!(matches!(err, FetchError::UpstreamStatus { .. }));
    }

    #[tokio::test]
    async fn an_unreachable_instance_is_a_transport_failure() {
        // Nothing listens on port 1.
        let fetcher = fetcher(test_config("http://127.0.0.1:1"));
        let err = fetcher
            .fetch("alice", &QueryParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn a_malformed_body_is_an_empty_page_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/merge_requests"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let merged = items(
            fetcher(test_config(&server.uri()))
                .fetch("alice", &QueryParams::new())
                .await
                .unwrap(),
        );
        assert!(merged.is_empty());
    }

    #[tokio::test]
    async fn rebase_trigger_hits_the_project_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/projects/42/merge_requests/7/rebase"))
            .and(header("PRIVATE-TOKEN", "test-token"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        fetcher(test_config(&server.uri()))
            .trigger_rebase(42, 7)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rebase_on_an_unconfigured_instance_is_an_error() {
        let err = fetcher(GitlabConfig::default())
            .trigger_rebase(42, 7)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotConfigured));
    }

    #[test]
    fn assignee_lists_are_trimmed_and_capped() {
        assert_eq!(
            resolve_assignees(" alice , bob ,, carol", None, 0),
            ["alice", "bob", "carol"]
        );
        assert_eq!(resolve_assignees("a,b,c", None, 2), ["a", "b"]);
        assert_eq!(resolve_assignees("", Some("gael"), 10), ["gael"]);
        assert!(resolve_assignees("", None, 10).is_empty());
        // A blank list still falls back to the default before the cap.
        assert_eq!(resolve_assignees(" , ,", Some("gael"), 1), ["gael"]);
    }

    #[test]
    fn page_size_clamping_covers_the_awkward_inputs() {
        let clamped = |value: Option<serde_json::Value>| -> i64 {
            let mut params = QueryParams::new();
            if let Some(value) = value {
                params.insert("per_page".to_string(), value);
            }
            clamp_page_size(&params)["per_page"].as_i64().unwrap()
        };

        assert_eq!(clamped(None), 20);
        assert_eq!(clamped(Some(json!(500))), 40);
        assert_eq!(clamped(Some(json!(0))), 20);
        assert_eq!(clamped(Some(json!(-3))), 20);
        assert_eq!(clamped(Some(json!("25"))), 25);
        assert_eq!(clamped(Some(json!("lots"))), 20);
        assert_eq!(clamped(Some(json!(40))), 40);
    }
}
