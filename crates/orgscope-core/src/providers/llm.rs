use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{ProviderError, ProviderResult};
use crate::network::HttpClient;

const PROVIDER: &str = "chat-completions";

pub const DEFAULT_CHAT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.2-3b-preview";

/// Completions are slower than page fetches; allow them more time
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: Option<f32>,
    /// Ask the model for a single JSON object
    pub json_output: bool,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(prompt: String) -> Self {
        Self {
            prompt,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub const fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<String>;
}

/// Client for OpenAI-compatible chat completion endpoints (Groq by default)
pub struct ChatCompletionsClient {
    client: HttpClient,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsClient {
    #[must_use]
    pub fn new(client: HttpClient, api_key: String) -> Self {
        Self {
            client,
            endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatBody<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatBody {
            model: &self.model,
            messages,
            temperature: request.temperature,
            response_format: request
                .json_output
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[async_trait::async_trait]
impl LanguageModel for ChatCompletionsClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<String> {
        let response = self
            .client
            .request(Method::POST, &self.endpoint)?
            .bearer_auth(&self.api_key)
            .timeout(COMPLETION_TIMEOUT)
            .json(&self.body(request))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let body: serde_json::Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(ProviderError::Status {
                    provider: PROVIDER,
                    status: status.as_u16(),
                })
            }
            Err(e) => {
                return Err(ProviderError::Malformed {
                    provider: PROVIDER,
                    message: e.to_string(),
                })
            }
        };

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                error = %body.pointer("/error/message").and_then(serde_json::Value::as_str).unwrap_or(""),
                "completion request rejected"
            );
            return Err(ProviderError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }

        parse_completion(&body)
    }
}

fn parse_completion(body: &serde_json::Value) -> ProviderResult<String> {
    if let Some(message) = body.pointer("/error/message").and_then(serde_json::Value::as_str) {
        return Err(ProviderError::Api {
            provider: PROVIDER,
            message: message.to_string(),
        });
    }

    body.pointer("/choices/0/message/content")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Malformed {
            provider: PROVIDER,
            message: "no message content in first choice".to_string(),
        })
}
