use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A profiled organization or political party, keyed by its exact name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub founded_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headquarters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ideology: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Provider-specific scalars such as an electoral-commission status
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Organization {
    #[must_use]
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name,
            description: None,
            founded_date: None,
            headquarters: None,
            ideology: None,
            source_url: None,
            attributes: BTreeMap::new(),
            created_at: now,
            last_updated: now,
        }
    }
}

/// A person holding a role in an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_current: Option<bool>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    pub url: String,
}

impl NewsArticle {
    #[must_use]
    pub fn new(title: String, url: String) -> Self {
        Self {
            title,
            content: None,
            source: None,
            published_date: None,
            url,
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: String) -> Self {
        self.content = Some(content);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: String) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_published_date(mut self, date: String) -> Self {
        self.published_date = Some(date);
        self
    }
}

/// Identity of a member within one organization.
///
/// Both parts are lower-cased, whitespace-collapsed and stripped of
/// trailing punctuation, so "Jane Doe"/"President" and "jane  doe"/"President."
/// produce the same key. The merger and the storage uniqueness constraint
/// both use this normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberKey {
    pub name: String,
    pub role: String,
}

impl MemberKey {
    #[must_use]
    pub fn new(name: &str, role: &str) -> Self {
        Self {
            name: normalize_key_part(name),
            role: normalize_key_part(role),
        }
    }
}

fn normalize_key_part(value: &str) -> String {
    let collapsed = value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    collapsed
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_key_ignores_case_and_trailing_punctuation() {
        assert_eq!(
            MemberKey::new("Jane Doe", "President"),
            MemberKey::new("jane doe", "President.")
        );
    }

    #[test]
    fn test_member_key_collapses_whitespace() {
        let key = MemberKey::new("  Jane \t Doe ", "Vice  President;");
        assert_eq!(key.name, "jane doe");
        assert_eq!(key.role, "vice president");
    }

    #[test]
    fn test_member_key_keeps_distinct_roles() {
        assert_ne!(
            MemberKey::new("Jane Doe", "President"),
            MemberKey::new("Jane Doe", "Treasurer")
        );
    }

    #[test]
    fn test_news_article_builder() {
        let article = NewsArticle::new("Title".into(), "https://news.example/a".into())
            .with_source("Example News".into())
            .with_published_date("2024-05-01T10:00:00Z".into());

        assert_eq!(article.source.as_deref(), Some("Example News"));
        assert!(article.content.is_none());
    }

    #[test]
    fn test_organization_serializes_without_empty_fields() {
        let org = Organization::new("Acme Org".into());
        let json = serde_json::to_value(&org).unwrap();

        assert_eq!(json["name"], "Acme Org");
        assert!(json.get("description").is_none());
        assert!(json.get("attributes").is_none());
    }
}
