use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{ProviderError, ProviderResult};
use crate::network::HttpClient;

const PROVIDER: &str = "wikipedia";
const ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// Section headings worth scanning for leadership rosters
const MEMBER_SECTION_KEYWORDS: &[&str] = &[
    "leadership",
    "leaders",
    "members",
    "structure",
    "organization",
    "organisation",
    "personnel",
    "key people",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiPage {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub url: String,
}

impl WikiPage {
    /// Build a page from a plain-text extract, deriving the summary from the
    /// text before the first section heading.
    #[must_use]
    pub fn from_extract(title: String, content: String, url: String) -> Self {
        let summary = content
            .split("\n==")
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        Self {
            title,
            summary,
            content,
            url,
        }
    }

    /// The introduction plus every section whose heading suggests it lists
    /// people, with heading lines removed.
    #[must_use]
    pub fn member_text(&self) -> String {
        let mut sections = self.content.split("\n==");
        let mut parts = Vec::new();

        if let Some(intro) = sections.next() {
            let intro = intro.trim();
            if !intro.is_empty() {
                parts.push(intro.to_string());
            }
        }

        for section in sections {
            let (heading, body) = section.split_once('\n').unwrap_or((section, ""));
            let heading = heading.trim_matches(|c: char| c == '=' || c.is_whitespace()).to_lowercase();

            if MEMBER_SECTION_KEYWORDS.iter().any(|k| heading.contains(k)) {
                let body = body.trim();
                if !body.is_empty() {
                    parts.push(body.to_string());
                }
            }
        }

        parts.join("\n\n")
    }
}

#[async_trait::async_trait]
pub trait EncyclopediaSource: Send + Sync {
    /// Best-effort page lookup. `Ok(None)` means nothing usable was found.
    async fn lookup(&self, name: &str) -> ProviderResult<Option<WikiPage>>;
}

pub struct Wikipedia {
    client: HttpClient,
    endpoint: String,
}

impl Wikipedia {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            endpoint: ENDPOINT.to_string(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    async fn query(&self, params: &[(&str, &str)]) -> ProviderResult<serde_json::Value> {
        let response = self
            .client
            .request(Method::GET, &self.endpoint)?
            .query(&[("action", "query"), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| ProviderError::Malformed {
            provider: PROVIDER,
            message: e.to_string(),
        })
    }

    async fn fetch_page(&self, title: &str) -> ProviderResult<Option<RawPage>> {
        let body = self
            .query(&[
                ("prop", "extracts|info|pageprops|links"),
                ("explaintext", "1"),
                ("exsectionformat", "wiki"),
                ("inprop", "url"),
                ("ppprop", "disambiguation"),
                ("plnamespace", "0"),
                ("pllimit", "20"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;

        Ok(parse_page_response(&body))
    }

    async fn search_title(&self, name: &str) -> ProviderResult<Option<String>> {
        let body = self
            .query(&[("list", "search"), ("srsearch", name), ("srlimit", "1")])
            .await?;

        Ok(body
            .pointer("/query/search/0/title")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string))
    }
}

#[async_trait::async_trait]
impl EncyclopediaSource for Wikipedia {
    async fn lookup(&self, name: &str) -> ProviderResult<Option<WikiPage>> {
        let page = match self.fetch_page(name).await? {
            Some(page) => page,
            None => {
                let Some(title) = self.search_title(name).await? else {
                    return Ok(None);
                };
                tracing::debug!(name, title = %title, "no exact page, using top search hit");
                match self.fetch_page(&title).await? {
                    Some(page) => page,
                    None => return Ok(None),
                }
            }
        };

        if !page.disambiguation {
            return Ok(Some(page.into_wiki_page()));
        }

        // Ambiguous names resolve to the first listed option. This is a guess,
        // callers must not rely on it picking the intended organization.
        let Some(option) = page.links.first() else {
            return Ok(None);
        };
        tracing::info!(name, option = %option, "disambiguation page, following first option");

        Ok(self
            .fetch_page(option)
            .await?
            .filter(|p| !p.disambiguation)
            .map(RawPage::into_wiki_page))
    }
}

#[derive(Debug)]
struct RawPage {
    title: String,
    extract: String,
    url: String,
    disambiguation: bool,
    links: Vec<String>,
}

impl RawPage {
    fn into_wiki_page(self) -> WikiPage {
        WikiPage::from_extract(self.title, self.extract, self.url)
    }
}

#[derive(Deserialize)]
struct PageEntry {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    fullurl: Option<String>,
    #[serde(default)]
    pageprops: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    links: Vec<LinkEntry>,
}

#[derive(Deserialize)]
struct LinkEntry {
    title: String,
}

fn parse_page_response(body: &serde_json::Value) -> Option<RawPage> {
    let first = body.pointer("/query/pages/0")?.clone();
    let entry: PageEntry = serde_json::from_value(first).ok()?;

    if entry.missing || entry.invalid {
        return None;
    }

    let disambiguation = entry
        .pageprops
        .as_ref()
        .is_some_and(|p| p.contains_key("disambiguation"));

    let extract = entry.extract.unwrap_or_default();
    if extract.trim().is_empty() && !disambiguation {
        return None;
    }

    let url = entry.fullurl.unwrap_or_else(|| {
        format!(
            "https://en.wikipedia.org/wiki/{}",
            entry.title.replace(' ', "_")
        )
    });

    Some(RawPage {
        title: entry.title,
        extract,
        url,
        disambiguation,
        links: entry.links.into_iter().map(|l| l.title).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CONTENT: &str = "Acme Org is a political party.\nJane Doe is the President of Acme Org.\n\n== History ==\nIt was founded in 1990 by John Roe.\n\n== Leadership ==\nJohn Roe served as the treasurer of the party for ten years.\n\n=== Key people ===\nMary Major is the spokesperson of the party.";

    #[test]
    fn test_summary_is_intro() {
        let page = WikiPage::from_extract("Acme Org".into(), CONTENT.into(), "u".into());
        assert_eq!(
            page.summary,
            "Acme Org is a political party.\nJane Doe is the President of Acme Org."
        );
    }

    #[test]
    fn test_member_text_keeps_intro_and_relevant_sections() {
        let page = WikiPage::from_extract("Acme Org".into(), CONTENT.into(), "u".into());
        let text = page.member_text();

        assert!(text.starts_with("Acme Org is a political party."));
        assert!(text.contains("treasurer"));
        assert!(text.contains("Mary Major"));
        assert!(!text.contains("founded in 1990"));
        assert!(!text.contains("=="));
    }

    #[test]
    fn test_parse_page() {
        let body = json!({
            "query": {"pages": [{
                "pageid": 1,
                "title": "Acme Org",
                "extract": "Acme Org is a party.",
                "fullurl": "https://en.wikipedia.org/wiki/Acme_Org"
            }]}
        });

        let page = parse_page_response(&body).unwrap();

        assert_eq!(page.title, "Acme Org");
        assert!(!page.disambiguation);
        assert_eq!(page.url, "https://en.wikipedia.org/wiki/Acme_Org");
    }

    #[test]
    fn test_parse_missing_page() {
        let body = json!({"query": {"pages": [{"title": "Nope", "missing": true}]}});
        assert!(parse_page_response(&body).is_none());
    }

    #[test]
    fn test_parse_disambiguation_page() {
        let body = json!({
            "query": {"pages": [{
                "title": "Acme",
                "extract": "Acme may refer to:",
                "pageprops": {"disambiguation": ""},
                "links": [{"ns": 0, "title": "Acme Org"}, {"ns": 0, "title": "Acme Corp"}]
            }]}
        });

        let page = parse_page_response(&body).unwrap();

        assert!(page.disambiguation);
        assert_eq!(page.links, vec!["Acme Org".to_string(), "Acme Corp".to_string()]);
    }
}
