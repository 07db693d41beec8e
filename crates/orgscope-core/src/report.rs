use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::{SourceCollector, SourceDocument};
use crate::providers::{CompletionRequest, LanguageModel, ProviderError};

const SYSTEM_PROMPT: &str = "You are an expert report writer who creates clear, well-structured \
and comprehensive reports. Focus on accuracy, clarity and professional presentation. Include \
citations when referencing source material.";

/// Characters of each source included in the prompt
const SOURCE_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No results found for '{0}'.")]
    NoSources(String),
    #[error("Search failed: {0}")]
    Search(#[source] ProviderError),
    #[error("Report generation failed: {0}")]
    Model(#[from] ProviderError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub topic: String,
    pub sources: usize,
    pub source_domains: Vec<String>,
    /// Sum of the word counts of every fetched source
    pub total_content_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub success: bool,
    pub report: String,
    pub metadata: ReportMetadata,
}

impl Report {
    /// Write the report with a short header naming topic, source count and file
    pub fn save(&self, path: &Path) -> ReportResult<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut out = String::new();
        let _ = writeln!(out, "Report Topic: {}", self.metadata.topic);
        let _ = writeln!(out, "Sources Used: {}", self.metadata.sources);
        let _ = writeln!(out, "Generated on: {file_name}");
        let _ = write!(out, "\n{}\n\n", "=".repeat(50));
        out.push_str(&self.report);

        std::fs::write(path, out)?;
        tracing::info!("Saved report to {}", path.display());
        Ok(())
    }
}

/// `"Python Language"` becomes `python_language_report.txt`. Anything
/// outside `[a-z0-9_-]` maps to `_`, so the name never leaves its directory.
#[must_use]
pub fn report_file_name(topic: &str) -> String {
    let stem: String = topic
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{stem}_report.txt")
}

pub struct ReportGenerator {
    sources: Arc<SourceCollector>,
    model: Arc<dyn LanguageModel>,
}

impl ReportGenerator {
    #[must_use]
    pub fn new(sources: Arc<SourceCollector>, model: Arc<dyn LanguageModel>) -> Self {
        Self { sources, model }
    }

    pub async fn generate(&self, topic: &str, max_results: usize) -> ReportResult<Report> {
        let documents = self
            .sources
            .try_collect(topic, max_results)
            .await
            .map_err(ReportError::Search)?;
        if documents.is_empty() {
            return Err(ReportError::NoSources(topic.to_string()));
        }

        let request = CompletionRequest::new(report_prompt(topic, &documents)).with_system(SYSTEM_PROMPT);
        let content = self.model.complete(&request).await?;

        tracing::info!(topic, sources = documents.len(), model = self.model.model_name(), "Generated report");

        Ok(Report {
            success: true,
            report: with_references(&content, &documents),
            metadata: report_metadata(topic, &documents),
        })
    }
}

fn report_prompt(topic: &str, documents: &[SourceDocument]) -> String {
    let mut prompt = format!(
        "Based on the following research data about \"{topic}\", create a detailed, well-structured report.\n\
         Include a summary, key points and analysis of the information. Organize the content in a clear,\n\
         professional format. Use the provided source materials but write in your own words.\n\n\
         Research Data:\n"
    );

    for doc in documents {
        let excerpt: String = doc.extracted_content.chars().take(SOURCE_EXCERPT_CHARS).collect();
        let _ = write!(
            prompt,
            "\nSource: {}\nURL: {}\nContent Summary: {excerpt}...\n",
            doc.title, doc.link
        );
    }

    prompt.push_str(
        "\nPlease structure the report with the following sections:\n\
         1. Executive Summary\n\
         2. Key Findings\n\
         3. Detailed Analysis\n\
         4. Conclusions\n\
         5. References\n\n\
         Ensure the report is factual, well-organized, and maintains a professional tone.\n",
    );

    prompt
}

fn with_references(content: &str, documents: &[SourceDocument]) -> String {
    let mut report = content.trim().to_string();

    if !report.contains("References") {
        report.push_str("\n\nReferences:\n");
        for doc in documents {
            let _ = writeln!(report, "- {}: {}", doc.title, doc.link);
        }
    }

    report
}

fn report_metadata(topic: &str, documents: &[SourceDocument]) -> ReportMetadata {
    let domains: BTreeSet<String> = documents
        .iter()
        .map(|d| d.domain.clone())
        .filter(|d| !d.is_empty())
        .collect();

    ReportMetadata {
        topic: topic.to_string(),
        sources: documents.len(),
        source_domains: domains.into_iter().collect(),
        total_content_length: documents.iter().map(SourceDocument::word_count).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ContentFetcher, PageMetadata};
    use crate::network::{HttpClient, NetworkConfig};
    use crate::providers::{ProviderResult, SearchProvider, SearchResult};

    fn document(title: &str, link: &str, domain: &str, words: usize) -> SourceDocument {
        SourceDocument {
            title: title.into(),
            link: link.into(),
            snippet: String::new(),
            domain: domain.into(),
            extracted_content: "word ".repeat(words).trim_end().to_string(),
            metadata: Some(PageMetadata {
                title: title.into(),
                word_count: words,
                url: link.into(),
                domain: domain.into(),
            }),
            error: None,
        }
    }

    #[test]
    fn test_prompt_truncates_sources() {
        let docs = vec![document("Long", "https://a.example/1", "a.example", 400)];
        let prompt = report_prompt("acme", &docs);

        assert!(prompt.contains("about \"acme\""));
        assert!(prompt.contains("Source: Long\nURL: https://a.example/1"));
        assert!(prompt.contains(&format!("Content Summary: {}...", &"word ".repeat(100)[..500])));
        assert!(prompt.contains("5. References"));
    }

    #[test]
    fn test_references_appended_when_missing() {
        let docs = vec![document("One", "https://a.example/1", "a.example", 1)];

        let report = with_references("  Executive Summary\nText.  ", &docs);
        assert_eq!(
            report,
            "Executive Summary\nText.\n\nReferences:\n- One: https://a.example/1\n"
        );

        let report = with_references("Body\n\nReferences\n[1] One", &docs);
        assert_eq!(report, "Body\n\nReferences\n[1] One");
    }

    #[test]
    fn test_metadata_domains_sorted_and_unique() {
        let docs = vec![
            document("B", "https://b.example/1", "b.example", 10),
            document("A", "https://a.example/1", "a.example", 5),
            document("B2", "https://b.example/2", "b.example", 7),
        ];

        let metadata = report_metadata("acme", &docs);

        assert_eq!(metadata.sources, 3);
        assert_eq!(metadata.source_domains, vec!["a.example", "b.example"]);
        assert_eq!(metadata.total_content_length, 22);
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(report_file_name("Python Language"), "python_language_report.txt");
        assert_eq!(report_file_name("Left-wing parties"), "left-wing_parties_report.txt");
    }

    #[test]
    fn test_report_file_name_stays_in_directory() {
        let dir = Path::new("/srv/reports");

        for topic in ["/etc/cron.d/x", "../../outside", "a/../../b", "C:\\temp\\x"] {
            let name = report_file_name(topic);
            let path = dir.join(&name);

            assert!(!name.contains('/') && !name.contains('\\') && !name.contains(".."), "{name}");
            assert_eq!(path.parent(), Some(dir), "{name}");
        }
    }

    struct FailingSearch;

    #[async_trait::async_trait]
    impl SearchProvider for FailingSearch {
        async fn search(&self, _query: &str, _max_results: usize) -> ProviderResult<Vec<SearchResult>> {
            Err(ProviderError::Status {
                provider: "search",
                status: 403,
            })
        }
    }

    struct UnusedModel;

    #[async_trait::async_trait]
    impl LanguageModel for UnusedModel {
        fn model_name(&self) -> &str {
            "unused"
        }

        async fn complete(&self, _request: &CompletionRequest) -> ProviderResult<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_search_failure_is_not_no_sources() {
        let fetcher = ContentFetcher::new(HttpClient::new(NetworkConfig::default()).unwrap());
        let sources = Arc::new(SourceCollector::new(Arc::new(FailingSearch), fetcher));
        let generator = ReportGenerator::new(sources, Arc::new(UnusedModel));

        let result = generator.generate("acme", 3).await;

        assert!(matches!(result, Err(ReportError::Search(ProviderError::Status { status: 403, .. }))));
    }

    #[test]
    fn test_save_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acme_report.txt");
        let report = Report {
            success: true,
            report: "Body".into(),
            metadata: ReportMetadata {
                topic: "acme".into(),
                sources: 2,
                source_domains: vec![],
                total_content_length: 0,
            },
        };

        report.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Report Topic: acme\nSources Used: 2\nGenerated on: acme_report.txt\n"));
        assert!(written.ends_with(&format!("{}\n\nBody", "=".repeat(50))));
    }
}
