use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{ProviderError, ProviderResult};
use crate::network::{domain_of, HttpClient};

const PROVIDER: &str = "google-search";
const ENDPOINT: &str = "https://customsearch.googleapis.com/customsearch/v1";

/// The Custom Search API never returns more than ten items per call
const MAX_RESULTS_PER_CALL: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub domain: String,
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> ProviderResult<Vec<SearchResult>>;
}

pub struct GoogleSearch {
    client: HttpClient,
    api_key: String,
    engine_id: String,
    endpoint: String,
}

impl GoogleSearch {
    #[must_use]
    pub fn new(client: HttpClient, api_key: String, engine_id: String) -> Self {
        Self {
            client,
            api_key,
            engine_id,
            endpoint: ENDPOINT.to_string(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[async_trait::async_trait]
impl SearchProvider for GoogleSearch {
    async fn search(&self, query: &str, max_results: usize) -> ProviderResult<Vec<SearchResult>> {
        let num = max_results.clamp(1, MAX_RESULTS_PER_CALL).to_string();

        let response = self
            .client
            .request(Method::GET, &self.endpoint)?
            .query(&[
                ("q", query),
                ("cx", self.engine_id.as_str()),
                ("key", self.api_key.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.map_err(|e| ProviderError::Malformed {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        if !status.is_success() && body.get("error").is_none() {
            return Err(ProviderError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }

        let mut results = parse_search_response(&body)?;
        results.truncate(max_results);

        tracing::debug!(query, count = results.len(), "web search complete");
        Ok(results)
    }
}

#[derive(Deserialize)]
struct SearchPayload {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

/// Turn a Custom Search JSON body into results, surfacing API-reported errors
pub fn parse_search_response(body: &serde_json::Value) -> ProviderResult<Vec<SearchResult>> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(ProviderError::Api {
            provider: PROVIDER,
            message,
        });
    }

    let payload: SearchPayload =
        serde_json::from_value(body.clone()).map_err(|e| ProviderError::Malformed {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

    Ok(payload
        .items
        .into_iter()
        .filter_map(|item| {
            let link = item.link.filter(|l| !l.is_empty())?;
            Some(SearchResult {
                title: item.title.unwrap_or_default(),
                domain: domain_of(&link),
                snippet: item.snippet.unwrap_or_default(),
                link,
            })
        })
        .collect())
}
