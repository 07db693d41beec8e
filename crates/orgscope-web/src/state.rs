use std::sync::Arc;

use orgscope_core::{Config, OrganizationProcessor, ReportGenerator, SourceCollector, Storage};
use tokio::sync::Mutex;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<OrganizationProcessor>,
    pub sources: Option<Arc<SourceCollector>>,
    pub reports: Option<Arc<ReportGenerator>>,
    /// Held for the whole of a processing run so only one run writes at a time
    pub process_lock: Arc<Mutex<()>>,
    pub config: ServerConfig,
}

impl AppState {
    pub async fn new(config: &Config, server: ServerConfig) -> anyhow::Result<Self> {
        let client = config.http_client()?;
        let storage = Storage::open(&config.database_path).await?;

        let processor = config.processor(storage, &client)?;
        let sources = config.source_collector(&client);
        let reports = config.report_generator(&client).map(Arc::new);

        if sources.is_none() {
            tracing::warn!("Web search is not configured; /search/ and /generate-report/ are unavailable");
        } else if reports.is_none() {
            tracing::warn!("Language model is not configured; /generate-report/ is unavailable");
        }

        Ok(Self::from_parts(processor, sources, reports, server))
    }

    pub fn from_parts(
        processor: OrganizationProcessor,
        sources: Option<Arc<SourceCollector>>,
        reports: Option<Arc<ReportGenerator>>,
        config: ServerConfig,
    ) -> Self {
        Self {
            processor: Arc::new(processor),
            sources,
            reports,
            process_lock: Arc::new(Mutex::new(())),
            config,
        }
    }

    pub fn storage(&self) -> &Storage {
        self.processor.storage()
    }
}
