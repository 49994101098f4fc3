//! GitHub implementation of the tracker client.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::instrument;

use crate::base::{
    config::Config,
    types::{Issue, Res, TicketReference},
};

use super::{GenericTrackerClient, TrackerClient};

/// Longest slice of an error body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 400;

// Extra methods on `TrackerClient` applied by the github implementation.

impl TrackerClient {
    /// Creates a new GitHub tracker client.
    pub fn github(config: &Config) -> Res<Self> {
        let client = GithubTrackerClient::new(&config.github_api_base, &config.github_token, config.github_request_timeout_ms)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Wire types.

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GithubIssue {
    number: u64,
    title: String,
    html_url: String,
    #[serde(default)]
    assignees: Vec<GithubUser>,
}

impl From<GithubIssue> for Issue {
    fn from(issue: GithubIssue) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            url: issue.html_url,
            assignees: issue.assignees.into_iter().map(|user| user.login).collect(),
        }
    }
}

// Specific implementations.

/// GitHub REST client implementation.
#[derive(Clone)]
pub struct GithubTrackerClient {
    http: reqwest::Client,
    api_base: String,
}

impl GithubTrackerClient {
    /// Create a new GitHub tracker client.
    #[instrument(name = "GithubTrackerClient::new", skip_all)]
    pub fn new(api_base: &str, token: &str, request_timeout_ms: u64) -> Res<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("ticket-bot"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.trim())).context("invalid github authorization header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GenericTrackerClient for GithubTrackerClient {
    #[instrument(skip(self))]
    async fn get_issue(&self, owner: &str, repo: &str, reference: TicketReference) -> Res<Issue> {
        let url = format!("{}/repos/{owner}/{repo}/issues/{}", self.api_base, reference.0);

        let response = self.http.get(&url).send().await.with_context(|| format!("github request for issue {reference} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(anyhow::anyhow!("github issue {reference} lookup failed with status {}: {}", status.as_u16(), body));
        }

        let issue = response.json::<GithubIssue>().await.with_context(|| format!("failed to decode github issue {reference}"))?;

        Ok(issue.into())
    }
}

// Tests.
