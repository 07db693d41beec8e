use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use super::chunker::Chunker;
use super::extractor::{ExtractionOutput, MemberExtractor, PatternExtractor};
use super::merger::{merge_results, MergedRecord};
use super::sources::SourceCollector;
use crate::entity::NewsArticle;
use crate::providers::{EncyclopediaSource, NewsSource};
use crate::storage::{Storage, UpsertSummary};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    pub texts: usize,
    pub chunks: usize,
    pub skipped_chunks: usize,
    pub members: usize,
    pub articles_written: usize,
    pub articles_skipped: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutput {
    pub name: String,
    pub record: MergedRecord,
    pub summary: UpsertSummary,
    pub stats: ProcessStats,
}

/// Gathers text about one organization, extracts facts from it and stores
/// the merged result.
///
/// Every step runs sequentially. Source failures are logged and leave the
/// run with less text; a storage failure ends the run with an error.
pub struct OrganizationProcessor {
    storage: Storage,
    extractor: Box<dyn MemberExtractor>,
    encyclopedia: Option<Arc<dyn EncyclopediaSource>>,
    sources: Option<Arc<SourceCollector>>,
    news: Option<Arc<dyn NewsSource>>,
    chunker: Chunker,
    search_results: usize,
}

impl OrganizationProcessor {
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            extractor: Box::new(PatternExtractor::with_default_patterns()),
            encyclopedia: None,
            sources: None,
            news: None,
            chunker: Chunker::default(),
            search_results: 3,
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn MemberExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_encyclopedia(mut self, encyclopedia: Arc<dyn EncyclopediaSource>) -> Self {
        self.encyclopedia = Some(encyclopedia);
        self
    }

    #[must_use]
    pub fn with_sources(mut self, sources: Arc<SourceCollector>, max_results: usize) -> Self {
        self.sources = Some(sources);
        self.search_results = max_results;
        self
    }

    #[must_use]
    pub fn with_news(mut self, news: Arc<dyn NewsSource>) -> Self {
        self.news = Some(news);
        self
    }

    #[must_use]
    pub const fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    pub async fn process(&self, name: &str) -> Result<ProcessOutput> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidRecord("organization name is empty".to_string()));
        }

        let start = Instant::now();
        tracing::info!("Processing organization: {}", name);

        let mut outputs = Vec::new();
        let mut texts = Vec::new();

        if let Some(encyclopedia) = &self.encyclopedia {
            match encyclopedia.lookup(name).await {
                Ok(Some(page)) => {
                    tracing::info!(title = %page.title, "Found encyclopedia page");
                    texts.push(page.member_text());
                    outputs.push(
                        ExtractionOutput::new()
                            .with_description(page.summary)
                            .with_source_url(page.url),
                    );
                }
                Ok(None) => tracing::info!("No encyclopedia page for {}", name),
                Err(e) => tracing::warn!("Encyclopedia lookup for {} failed: {}", name, e),
            }
        }

        if let Some(sources) = &self.sources {
            for document in sources.collect(name, self.search_results).await {
                if !document.extracted_content.is_empty() {
                    texts.push(document.extracted_content);
                }
            }
        }

        let mut stats = ProcessStats {
            texts: texts.len(),
            ..Default::default()
        };

        for text in &texts {
            for chunk in self.chunker.chunk(text) {
                if chunk.trim().is_empty() {
                    continue;
                }
                stats.chunks += 1;

                match self.extractor.extract(&chunk).await {
                    Ok(output) => {
                        tracing::debug!(chunk = stats.chunks, members = output.members.len(), "chunk extracted");
                        outputs.push(output);
                    }
                    Err(e) => {
                        tracing::warn!(chunk = stats.chunks, strategy = %self.extractor.strategy(), "Skipping chunk: {}", e);
                        stats.skipped_chunks += 1;
                    }
                }
            }
        }

        let record = merge_results(&outputs);
        stats.members = record.members.len();

        let articles = self.fetch_news(name).await;
        tracing::info!("Found {} news articles", articles.len());

        let summary = self.storage.upsert(name, &record, &articles).await?;

        stats.articles_written = summary.articles_written;
        stats.articles_skipped = summary.articles_skipped;
        stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::info!(
            members = stats.members,
            chunks = stats.chunks,
            skipped = stats.skipped_chunks,
            duration_ms = stats.duration_ms,
            "Processed {}",
            name
        );

        Ok(ProcessOutput {
            name: name.to_string(),
            record,
            summary,
            stats,
        })
    }

    async fn fetch_news(&self, name: &str) -> Vec<NewsArticle> {
        let Some(news) = &self.news else {
            return Vec::new();
        };

        match news.articles(name).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!("News fetch for {} failed: {}", name, e);
                Vec::new()
            }
        }
    }
}
