use chrono::{Duration, Utc};
use reqwest::Method;
use serde::Deserialize;

use super::{ProviderError, ProviderResult};
use crate::entity::NewsArticle;
use crate::network::HttpClient;

const PROVIDER: &str = "newsapi";
const ENDPOINT: &str = "https://newsapi.org/v2/everything";

#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    async fn articles(&self, query: &str) -> ProviderResult<Vec<NewsArticle>>;
}

pub struct NewsApi {
    client: HttpClient,
    api_key: String,
    endpoint: String,
    window_days: i64,
}

impl NewsApi {
    #[must_use]
    pub fn new(client: HttpClient, api_key: String) -> Self {
        Self {
            client,
            api_key,
            endpoint: ENDPOINT.to_string(),
            window_days: 30,
        }
    }

    #[must_use]
    pub const fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[async_trait::async_trait]
impl NewsSource for NewsApi {
    async fn articles(&self, query: &str) -> ProviderResult<Vec<NewsArticle>> {
        let from = (Utc::now() - Duration::days(self.window_days))
            .format("%Y-%m-%d")
            .to_string();

        let response = self
            .client
            .request(Method::GET, &self.endpoint)?
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", query),
                ("from", from.as_str()),
                ("language", "en"),
                ("sortBy", "relevancy"),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(body) => parse_news_response(&body),
            Err(_) if !status.is_success() => Err(ProviderError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
            }),
            Err(e) => Err(ProviderError::Malformed {
                provider: PROVIDER,
                message: e.to_string(),
            }),
        }
    }
}

#[derive(Deserialize)]
struct NewsPayload {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<RawSource>,
}

#[derive(Deserialize)]
struct RawSource {
    #[serde(default)]
    name: Option<String>,
}

/// Convert a News API body into articles. Articles without a URL cannot be
/// deduplicated and are dropped.
pub fn parse_news_response(body: &serde_json::Value) -> ProviderResult<Vec<NewsArticle>> {
    if body.get("status").and_then(serde_json::Value::as_str) == Some("error") {
        let message = body
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(ProviderError::Api {
            provider: PROVIDER,
            message,
        });
    }

    let payload: NewsPayload =
        serde_json::from_value(body.clone()).map_err(|e| ProviderError::Malformed {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

    Ok(payload
        .articles
        .into_iter()
        .filter_map(|raw| {
            let url = raw.url.filter(|u| !u.trim().is_empty())?;
            Some(NewsArticle {
                title: raw.title.unwrap_or_default(),
                content: raw.description,
                source: raw.source.and_then(|s| s.name),
                published_date: raw.published_at,
                url,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_articles() {
        let body = json!({
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {
                    "source": {"id": null, "name": "Example News"},
                    "title": "Acme Org elects new president",
                    "description": "Jane Doe takes over.",
                    "url": "https://news.example/acme",
                    "publishedAt": "2024-05-01T10:00:00Z"
                },
                {"title": "No link", "url": null}
            ]
        });

        let articles = parse_news_response(&body).unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source.as_deref(), Some("Example News"));
        assert_eq!(articles[0].published_date.as_deref(), Some("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn test_parse_error_status() {
        let body = json!({"status": "error", "code": "apiKeyInvalid", "message": "Your API key is invalid."});

        assert!(matches!(
            parse_news_response(&body),
            Err(ProviderError::Api { .. })
        ));
    }
}
