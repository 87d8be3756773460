use crate::errors::{FetchError, Result};
use crate::metrics_defs::{UPSTREAM_FAILURE, UPSTREAM_REQUEST};
use crate::types::{MergeRequest, QueryParams, param_value};
use metrics::counter;
use reqwest::Url;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin client for the two GitLab endpoints the portal uses: listing merge
/// requests and triggering a rebase.
pub(crate) struct GitlabClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl GitlabClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(GitlabClient {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches one page of merge requests for a single assignee. A body that
    /// is not a JSON array is treated as an empty page, not an error.
    pub async fn list_merge_requests(
        &self,
        assignee: &str,
        params: &QueryParams,
    ) -> Result<Vec<MergeRequest>> {
        let mut url = Url::parse(&format!("{}/merge_requests", self.base_url))
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in params {
                query.append_pair(name, &param_value(value));
            }
            query.append_pair("assignee_username", assignee);
        }

        counter!(UPSTREAM_REQUEST).increment(1);
        let response = self
            .client
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            counter!(UPSTREAM_FAILURE).increment(1);
            return Err(FetchError::UpstreamStatus {
                status,
                context: format!("assignee {assignee}"),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    /// Best-effort rebase trigger for one merge request.
    pub async fn trigger_rebase(&self, project_id: u64, mr_iid: u64) -> Result<()> {
        let url = Url::parse(&format!(
            "{}/projects/{project_id}/merge_requests/{mr_iid}/rebase",
            self.base_url
        ))
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        counter!(UPSTREAM_REQUEST).increment(1);
        let response = self
            .client
            .put(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            counter!(UPSTREAM_FAILURE).increment(1);
            return Err(FetchError::UpstreamStatus {
                status,
                context: format!("rebase of project {project_id} mr {mr_iid}"),
            });
        }

        Ok(())
    }
}
