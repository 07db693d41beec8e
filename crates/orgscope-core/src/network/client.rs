use reqwest::{Client, Method, RequestBuilder, Response};
use std::time::Duration;
use url::Url;

use super::config::NetworkConfig;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Shared HTTP client for page fetches and provider APIs
///
/// Cloning is cheap; all clones share one connection pool. Every request
/// carries the configured timeouts, so a stuck upstream blocks the caller
/// for at most `request_timeout_seconds`.
#[derive(Clone)]
pub struct HttpClient {
    config: NetworkConfig,
    inner: Client,
}

impl HttpClient {
    pub fn new(config: NetworkConfig) -> ClientResult<Self> {
        let inner = build_client(&config)?;
        Ok(Self { config, inner })
    }

    fn validate_request(url: &str) -> ClientResult<Url> {
        let parsed = Url::parse(url)?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        if parsed.host_str().is_none() {
            return Err(ClientError::InvalidUrl("No host in URL".to_string()));
        }

        Ok(parsed)
    }

    pub async fn get(&self, url: &str) -> ClientResult<Response> {
        let url = Self::validate_request(url)?;

        self.inner
            .get(url)
            .send()
            .await
            .map_err(ClientError::Http)
    }

    pub fn request(&self, method: Method, url: &str) -> ClientResult<RequestBuilder> {
        let url = Self::validate_request(url)?;
        Ok(self.inner.request(method, url))
    }

    pub const fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

fn build_client(config: &NetworkConfig) -> ClientResult<Client> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(random_user_agent);

    Client::builder()
        .connect_timeout(Duration::from_secs(u64::from(config.connect_timeout_seconds)))
        .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
        .user_agent(user_agent)
        .build()
        .map_err(ClientError::Http)
}

fn random_user_agent() -> String {
    use rand::Rng;

    let agents = [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    ];

    let mut rng = rand::rng();
    agents[rng.random_range(0..agents.len())].to_string()
}

/// Host part of a URL, empty when the URL does not parse
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}
