//! LLM provider abstraction: builds HTTP requests and normalizes responses
//! for Anthropic, OpenAI-compatible and Gemini APIs down to plain text.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::settings::{LlmProvider, LlmProviderConfig};

const MAX_OUTPUT_TOKENS: u32 = 256;

/// Why a model call produced no text. Never leaves the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("no model API key configured")]
    NotConfigured,
    #[error("model rate limit or quota exceeded: {0}")]
    RateLimited(String),
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response contained no text")]
    EmptyResponse,
}

impl ModelError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ModelError::RateLimited(_))
    }
}

/// A generative text model: one prompt in, raw response text out.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Resolved provider details ready for making an API call.
pub struct ResolvedProvider {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub provider: LlmProvider,
}

impl ResolvedProvider {
    /// Resolve a provider config into concrete URL / key / model values.
    pub fn from_config(config: &LlmProviderConfig) -> Result<Self, ModelError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ModelError::NotConfigured)?
            .to_string();

        let base = |default: &'static str| {
            config
                .base_url
                .as_deref()
                .unwrap_or(default)
                .trim_end_matches('/')
                .to_string()
        };

        match config.provider {
            LlmProvider::Anthropic => Ok(Self {
                url: format!("{}/v1/messages", base("https://api.anthropic.com")),
                api_key,
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| "claude-sonnet-4-20250514".to_string()),
                provider: LlmProvider::Anthropic,
            }),
            LlmProvider::OpenAiCompatible => Ok(Self {
                url: format!("{}/chat/completions", base("https://api.openai.com/v1")),
                api_key,
                model: config.model.clone().unwrap_or_else(|| "gpt-4o".to_string()),
                provider: LlmProvider::OpenAiCompatible,
            }),
            LlmProvider::Gemini => {
                let model = config
                    .model
                    .clone()
                    .unwrap_or_else(|| "gemini-1.5-flash".to_string());
                Ok(Self {
                    url: format!(
                        "{}/models/{model}:generateContent",
                        base("https://generativelanguage.googleapis.com/v1beta")
                    ),
                    api_key,
                    model,
                    provider: LlmProvider::Gemini,
                })
            }
        }
    }
}

/// Build an HTTP request (method, url, headers, body) for the resolved provider.
pub fn build_request(
    client: &reqwest::Client,
    provider: &ResolvedProvider,
    prompt: &str,
) -> reqwest::RequestBuilder {
    match provider.provider {
        LlmProvider::Anthropic => {
            let body = serde_json::json!({
                "model": provider.model,
                "max_tokens": MAX_OUTPUT_TOKENS,
                "messages": [{ "role": "user", "content": prompt }],
            });
            client
                .post(&provider.url)
                .header("x-api-key", &provider.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&body)
        }
        LlmProvider::OpenAiCompatible => {
            let body = serde_json::json!({
                "model": provider.model,
                "max_tokens": MAX_OUTPUT_TOKENS,
                "temperature": 0,
                "messages": [{ "role": "user", "content": prompt }],
            });
            client
                .post(&provider.url)
                .header("Authorization", format!("Bearer {}", provider.api_key))
                .header("content-type", "application/json")
                .json(&body)
        }
        LlmProvider::Gemini => {
            let body = serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                "generationConfig": {
                    "temperature": 0,
                    "maxOutputTokens": MAX_OUTPUT_TOKENS,
                },
            });
            client
                .post(&provider.url)
                .header("x-goog-api-key", &provider.api_key)
                .header("content-type", "application/json")
                .json(&body)
        }
    }
}

/// Pull the generated text out of a provider response body.
pub fn parse_response(provider: LlmProvider, json: &Value) -> Result<String, ModelError> {
    let text = match provider {
        LlmProvider::Anthropic => json
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| join_text(blocks.iter(), "text"))
            .unwrap_or_default(),
        LlmProvider::OpenAiCompatible => json
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        LlmProvider::Gemini => json
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| join_text(parts.iter(), "text"))
            .unwrap_or_default(),
    };

    if text.trim().is_empty() {
        Err(ModelError::EmptyResponse)
    } else {
        Ok(text)
    }
}

fn join_text<'a>(blocks: impl Iterator<Item = &'a Value>, field: &str) -> String {
    blocks
        .filter_map(|b| b.get(field).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map a non-2xx response to a model error. 429 and quota bodies are rate limits.
pub fn classify_failure(status: u16, body: &str) -> ModelError {
    let lowered = body.to_ascii_lowercase();
    if status == 429 || lowered.contains("resource_exhausted") || lowered.contains("quota") {
        ModelError::RateLimited(format!("HTTP {status}"))
    } else {
        ModelError::Status {
            status,
            body: body.chars().take(300).collect(),
        }
    }
}

// ── HTTP implementation ──────────────────────────────────────────

/// `TextModel` backed by a provider's HTTP API.
pub struct HttpTextModel {
    client: reqwest::Client,
    provider: ResolvedProvider,
    timeout: Duration,
}

impl HttpTextModel {
    pub fn new(config: &LlmProviderConfig) -> Result<Self, ModelError> {
        Ok(Self {
            client: reqwest::Client::new(),
            provider: ResolvedProvider::from_config(config)?,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider.provider
    }
}

#[async_trait]
impl TextModel for HttpTextModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        debug!(model = %self.provider.model, chars = prompt.len(), "sending prompt");

        let response = build_request(&self.client, &self.provider, prompt)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &text));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ModelError::Transport(format!("Failed to parse response: {e}")))?;
        let text = parse_response(self.provider.provider, &json)?;
        debug!(response = %text, "model responded");
        Ok(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn config(provider: LlmProvider) -> LlmProviderConfig {
        LlmProviderConfig {
            provider,
            api_key: Some("k".into()),
            ..LlmProviderConfig::default()
        }
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let mut cfg = config(LlmProvider::Gemini);
        cfg.api_key = Some("  ".into());
        assert!(matches!(
            ResolvedProvider::from_config(&cfg),
            Err(ModelError::NotConfigured)
        ));
    }

    #[test]
    fn test_resolve_urls() {
        let gemini = ResolvedProvider::from_config(&config(LlmProvider::Gemini)).unwrap();
        assert_eq!(
            gemini.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );

        let mut cfg = config(LlmProvider::OpenAiCompatible);
        cfg.base_url = Some("http://localhost:11434/v1/".into());
        cfg.model = Some("llama3".into());
        let oai = ResolvedProvider::from_config(&cfg).unwrap();
        assert_eq!(oai.url, "http://localhost:11434/v1/chat/completions");
        assert_eq!(oai.model, "llama3");
    }

    #[test]
    fn test_parse_each_provider() {
        let anthropic = serde_json::json!({
            "content": [{ "type": "text", "text": "{\"action\":\"pause\"}" }]
        });
        assert_eq!(
            parse_response(LlmProvider::Anthropic, &anthropic).unwrap(),
            "{\"action\":\"pause\"}"
        );

        let openai = serde_json::json!({
            "choices": [{ "message": { "content": "hello" }, "finish_reason": "stop" }]
        });
        assert_eq!(parse_response(LlmProvider::OpenAiCompatible, &openai).unwrap(), "hello");

        let gemini = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }]
        });
        assert_eq!(parse_response(LlmProvider::Gemini, &gemini).unwrap(), "a\nb");
    }

    #[test]
    fn test_empty_response() {
        let json = serde_json::json!({ "candidates": [] });
        assert_eq!(
            parse_response(LlmProvider::Gemini, &json),
            Err(ModelError::EmptyResponse)
        );
    }

    #[test]
    fn test_classify_rate_limits() {
        assert!(classify_failure(429, "").is_rate_limit());
        assert!(classify_failure(403, r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#).is_rate_limit());
        assert!(classify_failure(400, "You exceeded your current quota").is_rate_limit());
        assert!(!classify_failure(500, "internal").is_rate_limit());
    }
}
