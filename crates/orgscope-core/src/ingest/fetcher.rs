use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::text::{collapse_whitespace, word_count};
use crate::network::{domain_of, ClientError, HttpClient};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {0}")]
    Status(u16),
    #[error("No readable content")]
    NoContent,
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Subtrees whose text is never part of the article body
const EXCLUDED_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "aside", "noscript"];

const BOILERPLATE: &[&str] = &["cookie policy", "privacy policy", "terms of service", "terms of use"];

const CONTENT_CLASS: &str = r"(?i)(content|article|post)-?(body|text|container)?";

pub const DEFAULT_MIN_FRAGMENT_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub word_count: usize,
    pub url: String,
    pub domain: String,
}

/// Result of fetching one URL. `content` is empty whenever `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    pub content: String,
    pub metadata: Option<PageMetadata>,
    pub error: Option<String>,
}

impl FetchedPage {
    #[must_use]
    pub fn failed(url: &str, error: &FetchError) -> Self {
        Self {
            url: url.to_string(),
            content: String::new(),
            metadata: None,
            error: Some(error.to_string()),
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Downloads pages and reduces them to their main readable text
#[derive(Clone)]
pub struct ContentFetcher {
    client: HttpClient,
}

impl ContentFetcher {
    #[must_use]
    pub const fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Fetch a URL. Failures never propagate; they are reported on the page.
    pub async fn fetch(&self, url: &str) -> FetchedPage {
        match self.try_fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                FetchedPage::failed(url, &e)
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        let response = self.client.get(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        let content = extract_main_text(&html, DEFAULT_MIN_FRAGMENT_CHARS);
        if content.is_empty() {
            return Err(FetchError::NoContent);
        }

        tracing::debug!(url, chars = content.len(), "fetched page");

        Ok(FetchedPage {
            url: url.to_string(),
            metadata: Some(PageMetadata {
                title: page_title(&html),
                word_count: word_count(&content),
                url: url.to_string(),
                domain: domain_of(url),
            }),
            content,
            error: None,
        })
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Document `<title>`, whitespace-collapsed
#[must_use]
pub fn page_title(html: &str) -> String {
    let doc = Html::parse_document(html);
    selector("title")
        .and_then(|sel| doc.select(&sel).next().map(visible_text))
        .unwrap_or_default()
}

/// Main readable text of an HTML document.
///
/// Picks the first of `article`, `main`, an element with a content-like
/// class, or `body`, and joins its paragraph and heading text. When that
/// yields nothing, falls back to all visible text of the container.
#[must_use]
pub fn extract_main_text(html: &str, min_fragment_chars: usize) -> String {
    let doc = Html::parse_document(html);

    let Some(container) = main_container(&doc) else {
        return String::new();
    };

    let mut fragments = Vec::new();
    if let Some(blocks) = selector("p, h1, h2, h3, h4, h5, h6") {
        for el in container.select(&blocks) {
            if has_excluded_ancestor(el) {
                continue;
            }
            let text = visible_text(el);
            if text.chars().count() >= min_fragment_chars {
                fragments.push(text);
            }
        }
    }

    let text = if fragments.is_empty() {
        visible_text(container)
    } else {
        fragments.join(" ")
    };

    strip_boilerplate(&text)
}

fn main_container(doc: &Html) -> Option<ElementRef<'_>> {
    for css in ["article", "main"] {
        if let Some(el) = selector(css).and_then(|sel| doc.select(&sel).next()) {
            return Some(el);
        }
    }

    if let (Some(sel), Ok(class_re)) = (selector("[class]"), Regex::new(CONTENT_CLASS)) {
        let found = doc.select(&sel).find(|el| {
            el.value()
                .attr("class")
                .is_some_and(|class| class_re.is_match(class))
                && !is_excluded(el.value().name())
        });
        if found.is_some() {
            return found;
        }
    }

    selector("body").and_then(|sel| doc.select(&sel).next())
}

fn is_excluded(tag: &str) -> bool {
    EXCLUDED_TAGS.contains(&tag)
}

fn has_excluded_ancestor(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .any(|node| node.value().as_element().is_some_and(|e| is_excluded(e.name())))
}

/// Text of an element, skipping text nested inside excluded tags
fn visible_text(el: ElementRef<'_>) -> String {
    let mut parts = Vec::new();

    for node in el.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != el.id())
            .any(|a| a.value().as_element().is_some_and(|e| is_excluded(e.name())));
        if !hidden {
            parts.push(&**text);
        }
    }

    collapse_whitespace(&parts.join(" "))
}

fn strip_boilerplate(text: &str) -> String {
    let mut out = text.to_string();
    for phrase in BOILERPLATE {
        loop {
            let lower = out.to_lowercase();
            let Some(pos) = lower.find(phrase) else {
                break;
            };
            if lower.len() != out.len() {
                break;
            }
            out.replace_range(pos..pos + phrase.len(), " ");
        }
    }
    collapse_whitespace(&out)
}
