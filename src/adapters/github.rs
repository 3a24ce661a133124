//! GitHub user search as an identity lookup.
//!
//! Endpoint: GET /search/users?q=<email> in:email
//! Auth: optional Bearer token (unauthenticated search is heavily rate limited)

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::IdentityLookup;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// GitHub search client
pub struct GithubLookup {
    api_url: String,
    token: Option<String>,
    request_timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchUser>,
}

#[derive(Debug, Deserialize)]
struct SearchUser {
    avatar_url: String,
}

impl GithubLookup {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            request_timeout: REQUEST_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Bound each search request
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    fn search_url(&self) -> String {
        format!("{}/search/users", self.api_url)
    }
}

#[async_trait]
impl IdentityLookup for GithubLookup {
    fn name(&self) -> &str {
        "github"
    }

    async fn search_by_email(&self, email: &str) -> Result<Option<String>> {
        let mut request = self
            .client
            .get(self.search_url())
            .timeout(self.request_timeout)
            .query(&[("q", format!("{} in:email", email))])
            .header("User-Agent", concat!("content-sync/", env!("CARGO_PKG_VERSION")))
            .header("Accept", "application/vnd.github+json");

        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .context("Failed to query GitHub user search")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("GitHub search error ({}): {}", status, text.trim())
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse GitHub search response")?;

        Ok(body.items.into_iter().next().map(|user| user.avatar_url))
    }
}

/// Lookup that never matches, for offline runs
#[derive(Debug, Default)]
pub struct DisabledLookup;

#[async_trait]
impl IdentityLookup for DisabledLookup {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn search_by_email(&self, _email: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
