use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::extractor::{
    CandidateMember, ExtractionError, ExtractionOutput, ExtractionResult, ExtractionStrategy,
    MemberExtractor,
};
use crate::providers::{CompletionRequest, LanguageModel, ProviderError};

const SYSTEM_PROMPT: &str = "You extract structured facts about organizations and political parties \
from text. Reply with a single JSON object and nothing else. Only report facts stated in the text. \
Use null for unknown values and an empty list when no members are named.";

const SCHEMA: &str = r#"{
  "description": string | null,
  "founded_date": string | null,
  "headquarters": string | null,
  "ideology": string | null,
  "members": [
    {
      "name": string,
      "role": string,
      "bio": string | null,
      "start_date": string | null,
      "end_date": string | null,
      "is_current": boolean | null
    }
  ]
}"#;

/// Extraction through a language model with a fixed instruction and schema.
///
/// Calls are spaced by `call_delay` across the whole extractor so a run
/// never exceeds the provider's request rate.
pub struct ModelExtractor {
    model: Arc<dyn LanguageModel>,
    call_delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl ModelExtractor {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            call_delay: Duration::from_secs(2),
            last_call: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    fn request(chunk: &str) -> CompletionRequest {
        let prompt = format!(
            "Extract the organization's details and every person named with a role.\n\
             Respond with JSON matching this schema:\n{SCHEMA}\n\nText:\n{chunk}"
        );

        CompletionRequest::new(prompt)
            .with_system(SYSTEM_PROMPT)
            .with_temperature(0.0)
            .json()
    }

    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            tokio::time::sleep_until(prev + self.call_delay).await;
        }
        *last = Some(Instant::now());
    }
}

#[async_trait::async_trait]
impl MemberExtractor for ModelExtractor {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::Model
    }

    async fn extract(&self, chunk: &str) -> ExtractionResult<ExtractionOutput> {
        self.pace().await;

        let reply = self
            .model
            .complete(&Self::request(chunk))
            .await
            .map_err(|e| match e {
                e if e.is_rate_limit() => ExtractionError::RateLimited,
                ProviderError::MissingCredentials(what) => {
                    ExtractionError::ModelUnavailable(format!("missing {what}"))
                }
                other => ExtractionError::ModelUnavailable(other.to_string()),
            })?;

        match parse_model_reply(&reply) {
            Ok(output) => {
                tracing::debug!(
                    model = self.model.model_name(),
                    members = output.members.len(),
                    "model extraction complete"
                );
                Ok(output)
            }
            Err(e) => {
                tracing::warn!(
                    model = self.model.model_name(),
                    "Discarding unparseable model reply: {}",
                    e
                );
                Ok(ExtractionOutput::new())
            }
        }
    }
}

#[derive(Deserialize)]
struct ModelReply {
    #[serde(default, deserialize_with = "lenient_string")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    founded_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    headquarters: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    ideology: Option<String>,
    #[serde(default)]
    members: Vec<ModelMember>,
}

#[derive(Deserialize)]
struct ModelMember {
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    role: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    bio: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    start_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    end_date: Option<String>,
    #[serde(default)]
    is_current: Option<bool>,
}

/// Models often answer `1990` where a string was asked for
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty() && !s.eq_ignore_ascii_case("null")).then(|| s.to_string())
        }
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Parse a model reply into an extraction output. Members without a name or
/// role are dropped.
pub fn parse_model_reply(reply: &str) -> Result<ExtractionOutput, serde_json::Error> {
    let parsed: ModelReply = serde_json::from_str(strip_code_fences(reply))?;

    let members = parsed
        .members
        .into_iter()
        .filter_map(|m| {
            let member = CandidateMember::new(m.name?, m.role?).with_dates(m.start_date, m.end_date);
            let member = match m.bio {
                Some(bio) => member.with_bio(bio),
                None => member,
            };
            Some(match m.is_current {
                Some(current) => member.with_current(current),
                None => member,
            })
        })
        .collect();

    Ok(ExtractionOutput {
        description: parsed.description,
        founded_date: parsed.founded_date,
        headquarters: parsed.headquarters,
        ideology: parsed.ideology,
        source_url: None,
        attributes: std::collections::BTreeMap::new(),
        members,
    })
}

fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedModel {
        reply: ProviderResult<String>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                reply: Err(ProviderError::Status {
                    provider: "test",
                    status,
                }),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl LanguageModel for ScriptedModel {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &CompletionRequest) -> ProviderResult<String> {
            assert!(request.json_output);
            assert_eq!(request.temperature, Some(0.0));
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(ProviderError::Status { status, .. }) => Err(ProviderError::Status {
                    provider: "test",
                    status: *status,
                }),
                Err(e) => Err(ProviderError::Api {
                    provider: "test",
                    message: e.to_string(),
                }),
            }
        }
    }

    fn extractor(model: ScriptedModel) -> ModelExtractor {
        ModelExtractor::new(Arc::new(model)).with_call_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_extracts_fenced_json() {
        let reply = "```json\n{\"description\": \"A party.\", \"founded_date\": 1990, \
                     \"members\": [{\"name\": \"Jane Doe\", \"role\": \"President\", \"is_current\": true}, \
                     {\"name\": \"No Role\"}]}\n```";

        let output = extractor(ScriptedModel::replying(reply))
            .extract("text")
            .await
            .unwrap();

        assert_eq!(output.description.as_deref(), Some("A party."));
        assert_eq!(output.founded_date.as_deref(), Some("1990"));
        assert_eq!(output.members.len(), 1);
        assert_eq!(output.members[0].is_current, Some(true));
    }

    #[tokio::test]
    async fn test_malformed_reply_yields_empty_output() {
        let output = extractor(ScriptedModel::replying("I cannot help with that."))
            .extract("text")
            .await
            .unwrap();

        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_error() {
        let result = extractor(ScriptedModel::failing(429)).extract("text").await;
        assert!(matches!(result, Err(ExtractionError::RateLimited)));

        let result = extractor(ScriptedModel::failing(500)).extract("text").await;
        assert!(matches!(result, Err(ExtractionError::ModelUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_spaced() {
        let extractor = ModelExtractor::new(Arc::new(ScriptedModel::replying("{}")))
            .with_call_delay(Duration::from_secs(2));

        let start = Instant::now();
        extractor.extract("one").await.unwrap();
        extractor.extract("two").await.unwrap();
        extractor.extract("three").await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn test_null_strings_are_none() {
        let output = parse_model_reply(r#"{"headquarters": "null", "ideology": ""}"#).unwrap();
        assert!(output.headquarters.is_none());
        assert!(output.ideology.is_none());
    }
}
