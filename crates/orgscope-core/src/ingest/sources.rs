use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::fetcher::{ContentFetcher, PageMetadata};
use crate::providers::{ProviderResult, SearchProvider, SearchResult};

/// A search hit together with the text fetched from its page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub domain: String,
    pub extracted_content: String,
    pub metadata: Option<PageMetadata>,
    pub error: Option<String>,
}

impl SourceDocument {
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.metadata.as_ref().map_or(0, |m| m.word_count)
    }
}

/// Web search followed by a fetch of every hit, one after another
pub struct SourceCollector {
    search: Arc<dyn SearchProvider>,
    fetcher: ContentFetcher,
}

impl SourceCollector {
    #[must_use]
    pub fn new(search: Arc<dyn SearchProvider>, fetcher: ContentFetcher) -> Self {
        Self { search, fetcher }
    }

    /// Search and fetch. Hits whose page could not be fetched are kept with
    /// empty content and the fetch error.
    pub async fn try_collect(&self, query: &str, max_results: usize) -> ProviderResult<Vec<SourceDocument>> {
        let hits = self.search.search(query, max_results).await?;
        tracing::info!(query, hits = hits.len(), "search complete");

        let mut documents = Vec::with_capacity(hits.len());
        for hit in hits {
            documents.push(self.fetch_hit(hit).await);
        }
        Ok(documents)
    }

    /// Like [`Self::try_collect`], but a failed search yields no documents
    pub async fn collect(&self, query: &str, max_results: usize) -> Vec<SourceDocument> {
        match self.try_collect(query, max_results).await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!("Search for {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }

    async fn fetch_hit(&self, hit: SearchResult) -> SourceDocument {
        let page = self.fetcher.fetch(&hit.link).await;

        SourceDocument {
            title: hit.title,
            link: hit.link,
            snippet: hit.snippet,
            domain: hit.domain,
            extracted_content: page.content,
            metadata: page.metadata,
            error: page.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{HttpClient, NetworkConfig};
    use crate::providers::ProviderError;

    struct StaticSearch(Vec<SearchResult>);

    #[async_trait::async_trait]
    impl SearchProvider for StaticSearch {
        async fn search(&self, _query: &str, max_results: usize) -> ProviderResult<Vec<SearchResult>> {
            Ok(self.0.iter().take(max_results).cloned().collect())
        }
    }

    struct BrokenSearch;

    #[async_trait::async_trait]
    impl SearchProvider for BrokenSearch {
        async fn search(&self, _query: &str, _max_results: usize) -> ProviderResult<Vec<SearchResult>> {
            Err(ProviderError::Api {
                provider: "test",
                message: "quota exceeded".into(),
            })
        }
    }

    fn fetcher() -> ContentFetcher {
        ContentFetcher::new(HttpClient::new(NetworkConfig::default()).unwrap())
    }

    fn hit(link: &str) -> SearchResult {
        SearchResult {
            title: "Unreachable".into(),
            link: link.into(),
            snippet: String::new(),
            domain: "127.0.0.1".into(),
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_is_kept_with_error() {
        let collector = SourceCollector::new(
            Arc::new(StaticSearch(vec![hit("http://127.0.0.1:1/a"), hit("http://127.0.0.1:1/b")])),
            fetcher(),
        );

        let documents = collector.collect("acme", 1).await;

        assert_eq!(documents.len(), 1);
        assert!(documents[0].extracted_content.is_empty());
        assert!(documents[0].error.is_some());
        assert_eq!(documents[0].word_count(), 0);
    }

    #[tokio::test]
    async fn test_search_failure() {
        let collector = SourceCollector::new(Arc::new(BrokenSearch), fetcher());

        assert!(collector.collect("acme", 3).await.is_empty());
        assert!(collector.try_collect("acme", 3).await.is_err());
    }
}
