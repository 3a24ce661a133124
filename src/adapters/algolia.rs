//! Algolia search index client.
//!
//! Endpoints: POST /1/indexes/<index>/batch, POST /1/indexes/<index>/clear
//! Auth: X-Algolia-Application-Id / X-Algolia-API-Key headers

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use super::{IndexEntry, SearchIndex};

/// Batch size limit per request
const BATCH_SIZE: usize = 1000;

/// Default per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Algolia REST client bound to one index
pub struct AlgoliaIndex {
    app_id: String,
    api_key: String,
    index_name: String,
    base_url: String,
    request_timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    requests: Vec<BatchOperation>,
}

#[derive(Debug, Serialize)]
struct BatchOperation {
    action: &'static str,
    body: serde_json::Value,
}

impl AlgoliaIndex {
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Self {
        let app_id = app_id.into();
        let base_url = format!("https://{}.algolia.net", app_id);
        Self {
            app_id,
            api_key: api_key.into(),
            index_name: index_name.into(),
            base_url,
            request_timeout: REQUEST_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different host (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound each index request
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    fn index_url(&self, operation: &str) -> String {
        format!("{}/1/indexes/{}/{}", self.base_url, self.index_name, operation)
    }

    async fn post(&self, operation: &str, body: &impl Serialize) -> Result<()> {
        let response = self
            .client
            .post(self.index_url(operation))
            .timeout(self.request_timeout)
            .header("X-Algolia-Application-Id", &self.app_id)
            .header("X-Algolia-API-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send Algolia {} request", operation))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Algolia {} error ({}): {}", operation, status, text.trim())
        }

        Ok(())
    }

    async fn batch(&self, operations: Vec<BatchOperation>) -> Result<()> {
        let mut operations = operations.into_iter().peekable();
        while operations.peek().is_some() {
            let chunk: Vec<_> = operations.by_ref().take(BATCH_SIZE).collect();
            self.post("batch", &BatchRequest { requests: chunk }).await?;
        }
        Ok(())
    }
}

fn upsert_operations(entries: &[IndexEntry]) -> Result<Vec<BatchOperation>> {
    entries
        .iter()
        .map(|entry| {
            Ok(BatchOperation {
                action: "updateObject",
                body: serde_json::to_value(entry)?,
            })
        })
        .collect()
}

fn delete_operations(object_ids: &[String]) -> Vec<BatchOperation> {
    object_ids
        .iter()
        .map(|id| BatchOperation {
            action: "deleteObject",
            body: json!({ "objectID": id }),
        })
        .collect()
}

#[async_trait]
impl SearchIndex for AlgoliaIndex {
    fn name(&self) -> &str {
        "algolia"
    }

    async fn bulk_upsert(&self, entries: &[IndexEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.batch(upsert_operations(entries)?).await
    }

    async fn delete(&self, object_ids: &[String]) -> Result<()> {
        if object_ids.is_empty() {
            return Ok(());
        }
        self.batch(delete_operations(object_ids)).await
    }

    async fn clear(&self) -> Result<()> {
        self.post("clear", &json!({})).await
    }
}
