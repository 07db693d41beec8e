use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ner::{strip_honorifics, HeuristicPersonRecognizer, PersonRecognizer, TextSpan};
use super::text::{clean_text, collapse_whitespace, split_sentences, title_case, truncate_chars, word_count};
use crate::entity::MemberKey;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Rate limited")]
    RateLimited,
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// A person/role pair found in one chunk of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMember {
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_current: Option<bool>,
}

impl CandidateMember {
    #[must_use]
    pub const fn new(name: String, role: String) -> Self {
        Self {
            name,
            role,
            bio: None,
            start_date: None,
            end_date: None,
            is_current: None,
        }
    }

    #[must_use]
    pub fn with_bio(mut self, bio: String) -> Self {
        self.bio = Some(bio);
        self
    }

    #[must_use]
    pub fn with_dates(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    #[must_use]
    pub const fn with_current(mut self, is_current: bool) -> Self {
        self.is_current = Some(is_current);
        self
    }

    #[must_use]
    pub fn key(&self) -> MemberKey {
        MemberKey::new(&self.name, &self.role)
    }
}

/// Partial organization record produced from a single chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub description: Option<String>,
    pub founded_date: Option<String>,
    pub headquarters: Option<String>,
    pub ideology: Option<String>,
    pub source_url: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub members: Vec<CandidateMember>,
}

impl ExtractionOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    #[must_use]
    pub fn with_founded_date(mut self, date: String) -> Self {
        self.founded_date = Some(date);
        self
    }

    #[must_use]
    pub fn with_headquarters(mut self, headquarters: String) -> Self {
        self.headquarters = Some(headquarters);
        self
    }

    #[must_use]
    pub fn with_source_url(mut self, url: String) -> Self {
        self.source_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_member(mut self, member: CandidateMember) -> Self {
        self.members.push(member);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.founded_date.is_none()
            && self.headquarters.is_none()
            && self.ideology.is_none()
            && self.source_url.is_none()
            && self.attributes.is_empty()
            && self.members.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    Pattern,
    Model,
}

impl ExtractionStrategy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Model => "model",
        }
    }
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExtractionStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pattern" | "regex" => Ok(Self::Pattern),
            "model" | "llm" => Ok(Self::Model),
            _ => Err(crate::Error::Config(format!("unknown extraction strategy: {s}"))),
        }
    }
}

/// Produces candidate members (and whatever scalar facts it can) from a chunk
#[async_trait::async_trait]
pub trait MemberExtractor: Send + Sync {
    fn strategy(&self) -> ExtractionStrategy;

    async fn extract(&self, chunk: &str) -> ExtractionResult<ExtractionOutput>;
}

const ROLES: &str = r"vice[\s-]president|president|general\s+secretary|secretary[\s-]general|secretary|chair(?:man|woman|person)?|co-?founder|founder|leader|minister|director|CEO|treasurer|spokes(?:person|man|woman)|chief|head|coordinator";

const NAME: &str = r"[A-Z][\p{L}'.\-]*(?:\s+[A-Z][\p{L}'.\-]*)*";

const QUALIFIERS: &str = r"current|former|first|founding|incumbent|party|national";

pub struct RolePattern {
    pub regex: Regex,
}

impl RolePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

/// A scalar fact pulled out with a single capture group
pub struct FactPattern {
    pub field: FactField,
    pub regex: Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactField {
    FoundedDate,
    Headquarters,
}

impl FactPattern {
    pub fn new(field: FactField, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            field,
            regex: Regex::new(pattern)?,
        })
    }
}

/// Regex role patterns validated by person recognition.
///
/// Patterns run in order over every sentence of the cleaned chunk. The name
/// span of each match must contain a recognized person; the longest person
/// span wins, honorifics are stripped and the role is title-cased.
pub struct PatternExtractor {
    patterns: Vec<RolePattern>,
    facts: Vec<FactPattern>,
    recognizer: Box<dyn PersonRecognizer>,
    min_sentence_words: usize,
    max_bio_chars: usize,
}

impl PatternExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
            facts: Vec::new(),
            recognizer: Box::new(HeuristicPersonRecognizer::new()),
            min_sentence_words: 5,
            max_bio_chars: 500,
        }
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: RolePattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    #[must_use]
    pub fn with_fact(mut self, fact: FactPattern) -> Self {
        self.facts.push(fact);
        self
    }

    #[must_use]
    pub fn with_recognizer(mut self, recognizer: Box<dyn PersonRecognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    #[must_use]
    pub const fn with_min_sentence_words(mut self, words: usize) -> Self {
        self.min_sentence_words = words;
        self
    }

    #[must_use]
    pub fn with_default_patterns() -> Self {
        let mut extractor = Self::new();

        let role_patterns = [
            format!(
                r"\b(?P<name>{NAME})\s+(?i:is|was|serves\s+as|served\s+as|became)\s+(?i:the\s+)?(?i:(?:{QUALIFIERS})\s+)?(?P<role>(?i:{ROLES}))\b"
            ),
            format!(r"\b(?P<role>(?i:{ROLES}))\s+(?P<name>{NAME})"),
            format!(
                r"\b(?P<name>{NAME}),\s+(?i:the\s+)?(?i:(?:{QUALIFIERS})\s+)?(?P<role>(?i:{ROLES}))\b"
            ),
        ];

        for pattern in &role_patterns {
            match RolePattern::new(pattern) {
                Ok(p) => extractor = extractor.with_pattern(p),
                Err(e) => tracing::warn!("Skipping invalid role pattern: {}", e),
            }
        }

        let fact_patterns = [
            (
                FactField::FoundedDate,
                r"(?i:founded|established|formed|created)\s+(?i:in|on)\s+(?P<value>(?:[A-Z][a-z]+\s+\d{1,2},\s+)?(?:\d{1,2}\s+[A-Z][a-z]+\s+)?\d{4})",
            ),
            (
                FactField::Headquarters,
                r"(?i:headquartered|based|headquarters\s+(?:is|are)\s+located)\s+in\s+(?P<value>[A-Z][\p{L}'\-]*(?:,?\s+[A-Z][\p{L}'\-]*)*)",
            ),
        ];

        for (field, pattern) in fact_patterns {
            match FactPattern::new(field, pattern) {
                Ok(p) => extractor = extractor.with_fact(p),
                Err(e) => tracing::warn!("Skipping invalid fact pattern: {}", e),
            }
        }

        extractor
    }

    /// Candidate members found in one sentence, in pattern order
    #[must_use]
    pub fn extract_sentence(&self, sentence: &str) -> Vec<CandidateMember> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();

        for pattern in &self.patterns {
            for captures in pattern.regex.captures_iter(sentence) {
                let (Some(name), Some(role)) = (captures.name("name"), captures.name("role")) else {
                    continue;
                };

                let Some(person) = self.best_person(name.as_str()) else {
                    continue;
                };

                let role = title_case(&collapse_whitespace(role.as_str()));
                let member = CandidateMember::new(person, role)
                    .with_bio(truncate_chars(sentence, self.max_bio_chars));

                if seen.insert(member.key()) {
                    found.push(member);
                }
            }
        }

        found
    }

    fn best_person(&self, span: &str) -> Option<String> {
        let best: Option<TextSpan> = self
            .recognizer
            .persons(span)
            .into_iter()
            .fold(None, |best, candidate| match best {
                Some(b) if b.len() >= candidate.len() => Some(b),
                _ => Some(candidate),
            });

        let name = collapse_whitespace(strip_honorifics(&best?.text));
        (!name.is_empty()).then_some(name)
    }

    fn apply_facts(&self, sentence: &str, output: &mut ExtractionOutput) {
        for fact in &self.facts {
            let slot = match fact.field {
                FactField::FoundedDate => &mut output.founded_date,
                FactField::Headquarters => &mut output.headquarters,
            };
            if slot.is_some() {
                continue;
            }
            if let Some(value) = fact.regex.captures(sentence).and_then(|c| c.name("value")) {
                *slot = Some(value.as_str().trim_end_matches([',', '.']).to_string());
            }
        }
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::with_default_patterns()
    }
}

#[async_trait::async_trait]
impl MemberExtractor for PatternExtractor {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::Pattern
    }

    async fn extract(&self, chunk: &str) -> ExtractionResult<ExtractionOutput> {
        let mut output = ExtractionOutput::new();

        for sentence in split_sentences(&clean_text(chunk)) {
            if word_count(&sentence) < self.min_sentence_words {
                continue;
            }

            self.apply_facts(&sentence, &mut output);
            output.members.extend(self.extract_sentence(&sentence));
        }

        tracing::debug!(members = output.members.len(), "pattern extraction complete");
        Ok(output)
    }
}
