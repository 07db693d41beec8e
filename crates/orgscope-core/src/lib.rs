pub mod config;
pub mod entity;
pub mod error;
pub mod ingest;
pub mod network;
pub mod providers;
pub mod report;
pub mod storage;

pub use config::{Config, PipelineConfig, DEFAULT_DATABASE};
pub use entity::{Member, MemberKey, NewsArticle, Organization};
pub use error::{Error, Result};
pub use ingest::{
    merge_results, CandidateMember, Chunker, ContentFetcher, ExtractionOutput, ExtractionStrategy,
    MemberExtractor, MergedRecord, OrganizationProcessor, ProcessOutput, ProcessStats,
    SourceCollector, SourceDocument,
};
pub use network::{HttpClient, NetworkConfig};
pub use report::{report_file_name, Report, ReportError, ReportGenerator, ReportMetadata};
pub use storage::{OrganizationProfile, Storage, UpsertSummary};
