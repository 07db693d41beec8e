mod llm;
mod news;
mod search;
mod wikipedia;

use thiserror::Error;

use crate::network::ClientError;

pub use llm::{ChatCompletionsClient, CompletionRequest, LanguageModel, DEFAULT_CHAT_ENDPOINT, DEFAULT_MODEL};
pub use news::{parse_news_response, NewsApi, NewsSource};
pub use search::{parse_search_response, GoogleSearch, SearchProvider, SearchResult};
pub use wikipedia::{EncyclopediaSource, WikiPage, Wikipedia};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
    #[error("{provider} returned status {status}")]
    Status { provider: &'static str, status: u16 },
    #[error("{provider} API error: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },
    #[error("Malformed response from {provider}: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// True for quota exhaustion reported by the upstream
    #[must_use]
    pub const fn is_rate_limit(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
