//! Google Custom Search JSON API

use super::{WebResult, WebSearchProvider};
use crate::config::WebSearchConfig;
use crate::error::{DocctxError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// The API refuses `num` above this
const MAX_RESULTS_PER_REQUEST: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default = "default_title")]
    title: String,
    #[serde(default = "default_link")]
    link: String,
    #[serde(default = "default_snippet")]
    snippet: String,
}

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_link() -> String {
    "#".to_string()
}

fn default_snippet() -> String {
    "No content available".to_string()
}

pub struct GoogleSearchProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    cse_id: String,
}

impl GoogleSearchProvider {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        cse_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DocctxError::WebSearch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            cse_id: cse_id.into(),
        })
    }

    /// Credentials come from the environment variables named in the config
    pub fn from_config(config: &WebSearchConfig) -> Result<Self> {
        let api_key = read_env(&config.api_key_env)?;
        let cse_id = read_env(&config.cse_id_env)?;
        Self::new(
            config.endpoint.clone(),
            api_key,
            cse_id,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

fn read_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(DocctxError::WebSearch(format!("{} is not set", name))),
    }
}

fn parse_response(body: &str) -> Result<Vec<WebResult>> {
    let response: SearchResponse = serde_json::from_str(body).map_err(|e| DocctxError::Json {
        source: e,
        context: "Failed to parse search response".to_string(),
    })?;

    Ok(response
        .items
        .into_iter()
        .map(|item| WebResult {
            title: item.title,
            link: item.link,
            snippet: item.snippet,
        })
        .collect())
}

#[async_trait]
impl WebSearchProvider for GoogleSearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>> {
        let num = max_results.clamp(1, MAX_RESULTS_PER_REQUEST).to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DocctxError::WebSearch(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DocctxError::WebSearch(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(DocctxError::WebSearch(format!(
                "Search API returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let mut results = parse_response(&body)?;
        results.truncate(max_results);

        tracing::debug!("Web search returned {} result(s)", results.len());

        Ok(results)
    }

    fn name(&self) -> &str {
        "google"
    }
}
