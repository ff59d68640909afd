use crate::errors::SentryError;
use crate::info_provider::ResolvedInstance;
use crate::metrics_defs::{ISSUES_EMPTY_PROJECT, UPSTREAM_DURATION, UPSTREAM_ERRORS};
use reqwest::Url;
use shared::{counter, histogram};
use std::time::Instant;

pub const DEFAULT_STATS_PERIOD: &str = "24h";

/// A Sentry issue, passed through as returned by the API.
pub type SentryIssue = serde_json::Value;

#[derive(Clone, Debug)]
pub struct FetchOptions {
    pub stats_period: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            stats_period: DEFAULT_STATS_PERIOD.into(),
        }
    }
}

/// Client for the Sentry issues API.
#[derive(Clone, Default)]
pub struct SentryApi {
    client: reqwest::Client,
}

impl SentryApi {
    pub fn new(client: reqwest::Client) -> Self {
        SentryApi { client }
    }

    /// Fetches the issues of `project` within `organization`.
    ///
    /// Without a project there is nothing to ask Sentry for and an empty list
    /// is returned without a network call.
    pub async fn fetch_issues(
        &self,
        instance: &ResolvedInstance,
        project: Option<&str>,
        organization: &str,
        options: &FetchOptions,
    ) -> Result<Vec<SentryIssue>, SentryError> {
        let Some(project) = project.filter(|p| !p.is_empty()) else {
            counter!(ISSUES_EMPTY_PROJECT).increment(1);
            return Ok(vec![]);
        };

        let url = issues_url(&instance.base_url, organization, project)?;

        let start = Instant::now();
        let result = self
            .client
            .get(url)
            .headers(instance.headers.clone())
            .query(&[("statsPeriod", options.stats_period.as_str())])
            .send()
            .await;
        histogram!(UPSTREAM_DURATION, "instance" => instance.instance_name.clone())
            .record(start.elapsed().as_secs_f64());

        let response = result.inspect_err(|_| {
            counter!(UPSTREAM_ERRORS, "instance" => instance.instance_name.clone()).increment(1);
        })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            counter!(UPSTREAM_ERRORS, "instance" => instance.instance_name.clone()).increment(1);
            tracing::warn!(
                instance = %instance.instance_name,
                organization,
                project,
                status = %status,
                "Sentry returned an error response"
            );
            return Err(SentryError::Upstream { status });
        }

        let issues = response.json::<Vec<SentryIssue>>().await?;
        tracing::debug!(
            instance = %instance.instance_name,
            project,
            count = issues.len(),
            "Fetched sentry issues"
        );

        Ok(issues)
    }
}

/// Builds `{base_url}/0/projects/{organization}/{project}/issues/`.
fn issues_url(base_url: &str, organization: &str, project: &str) -> Result<Url, SentryError> {
    let mut url = Url::parse(base_url).map_err(|e| SentryError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| SentryError::InvalidUrl(base_url.to_string()))?
        .pop_if_empty()
        .extend(["0", "projects", organization, project, "issues", ""]);
    Ok(url)
}
