use std::sync::Arc;
use std::time::Duration;

use crate::ingest::{
    Chunker, ContentFetcher, ExtractionStrategy, MemberExtractor, ModelExtractor,
    OrganizationProcessor, PatternExtractor, SourceCollector,
};
use crate::network::{HttpClient, NetworkConfig};
use crate::providers::{
    ChatCompletionsClient, EncyclopediaSource, GoogleSearch, LanguageModel, NewsApi, NewsSource,
    SearchProvider, Wikipedia, DEFAULT_MODEL,
};
use crate::report::ReportGenerator;
use crate::storage::Storage;
use crate::{Error, Result};

pub const DEFAULT_DATABASE: &str = "political_orgs.db";

/// Tunables for one processing run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_chunk_chars: usize,
    pub search_results: usize,
    pub model_call_delay: Duration,
    pub news_window_days: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 4000,
            search_results: 3,
            model_call_delay: Duration::from_secs(2),
            news_window_days: 30,
        }
    }
}

/// Credentials, paths and tunables, read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub network: NetworkConfig,
    pub pipeline: PipelineConfig,
    pub database_path: String,
    pub strategy: ExtractionStrategy,
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
    pub news_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub llm_model: String,
    pub llm_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.network = NetworkConfig::from_env();
        Ok(config)
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let strategy = match get("ORGSCOPE_STRATEGY") {
            Some(value) => value.parse()?,
            None => ExtractionStrategy::Pattern,
        };

        Ok(Self {
            network: NetworkConfig::default(),
            pipeline: PipelineConfig::default(),
            database_path: get("ORGSCOPE_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            strategy,
            google_api_key: get("GOOGLE_API_KEY"),
            google_cse_id: get("GOOGLE_CSE_ID"),
            news_api_key: get("NEWS_API_KEY"),
            groq_api_key: get("GROQ_API_KEY"),
            llm_model: get("ORGSCOPE_LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_endpoint: get("ORGSCOPE_LLM_URL"),
        })
    }

    pub fn http_client(&self) -> Result<HttpClient> {
        Ok(HttpClient::new(self.network.clone())?)
    }

    pub fn search_provider(&self, client: &HttpClient) -> Option<Arc<dyn SearchProvider>> {
        let (Some(key), Some(cx)) = (&self.google_api_key, &self.google_cse_id) else {
            tracing::debug!("GOOGLE_API_KEY or GOOGLE_CSE_ID not set, web search disabled");
            return None;
        };
        Some(Arc::new(GoogleSearch::new(client.clone(), key.clone(), cx.clone())))
    }

    pub fn news_source(&self, client: &HttpClient) -> Option<Arc<dyn NewsSource>> {
        let Some(key) = &self.news_api_key else {
            tracing::debug!("NEWS_API_KEY not set, news disabled");
            return None;
        };
        Some(Arc::new(
            NewsApi::new(client.clone(), key.clone()).with_window_days(self.pipeline.news_window_days),
        ))
    }

    pub fn language_model(&self, client: &HttpClient) -> Option<Arc<dyn LanguageModel>> {
        let Some(key) = &self.groq_api_key else {
            tracing::debug!("GROQ_API_KEY not set, language model disabled");
            return None;
        };

        let mut model = ChatCompletionsClient::new(client.clone(), key.clone()).with_model(self.llm_model.clone());
        if let Some(endpoint) = &self.llm_endpoint {
            model = model.with_endpoint(endpoint.clone());
        }
        Some(Arc::new(model))
    }

    pub fn encyclopedia(&self, client: &HttpClient) -> Arc<dyn EncyclopediaSource> {
        Arc::new(Wikipedia::new(client.clone()))
    }

    pub fn source_collector(&self, client: &HttpClient) -> Option<Arc<SourceCollector>> {
        self.search_provider(client)
            .map(|search| Arc::new(SourceCollector::new(search, ContentFetcher::new(client.clone()))))
    }

    /// The configured extractor. The model strategy needs `GROQ_API_KEY`.
    pub fn extractor(&self, client: &HttpClient) -> Result<Box<dyn MemberExtractor>> {
        match self.strategy {
            ExtractionStrategy::Pattern => Ok(Box::new(PatternExtractor::with_default_patterns())),
            ExtractionStrategy::Model => {
                let model = self.language_model(client).ok_or_else(|| {
                    Error::Config("the model strategy requires GROQ_API_KEY".to_string())
                })?;
                Ok(Box::new(
                    ModelExtractor::new(model).with_call_delay(self.pipeline.model_call_delay),
                ))
            }
        }
    }

    /// Wire a processor from every source the configuration enables
    pub fn processor(&self, storage: Storage, client: &HttpClient) -> Result<OrganizationProcessor> {
        let mut processor = OrganizationProcessor::new(storage)
            .with_extractor(self.extractor(client)?)
            .with_encyclopedia(self.encyclopedia(client))
            .with_chunker(Chunker::new(self.pipeline.max_chunk_chars));

        if let Some(sources) = self.source_collector(client) {
            processor = processor.with_sources(sources, self.pipeline.search_results);
        }
        if let Some(news) = self.news_source(client) {
            processor = processor.with_news(news);
        }

        Ok(processor)
    }

    /// Report generation needs both web search and a language model
    pub fn report_generator(&self, client: &HttpClient) -> Option<ReportGenerator> {
        Some(ReportGenerator::new(
            self.source_collector(client)?,
            self.language_model(client)?,
        ))
    }
}
