//! LLM Client: the single point of entry for all language-model calls.
//!
//! ARCHITECTURAL RULE: matching and scoring code never talks to a provider
//! directly. They depend on the capability traits below (`StructuredExtractor`,
//! `TextGenerator`, `Embedder`), which `LlmClient` implements for OpenAI-compatible
//! endpoints and for a local Ollama server.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const EXTRACTION_TEMPERATURE: f32 = 0.1;
const EXTRACTION_MAX_TOKENS: u32 = 4000;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Client configuration error: {0}")]
    Config(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Capability traits
// ────────────────────────────────────────────────────────────────────────────

/// Turns a document into the fixed-schema structured text described by the prompt.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract_structured(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// Free-form text completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, sampling: &SamplingConfig) -> Result<String, LlmError>;
}

/// Fixed-dimension text embedding.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

/// Sampling parameters for free-form generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 4000,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Provider wire types
// ────────────────────────────────────────────────────────────────────────────

/// Which backend the client talks to.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    OpenAi { api_key: String, base_url: String },
    Ollama { base_url: String },
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single LLM client shared by all matching and scoring stages.
/// Stateless apart from connection pooling; cheap to clone across analyses.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    provider: LlmProvider,
    generation_model: String,
    embedding_model: String,
}

impl LlmClient {
    pub fn new(
        provider: LlmProvider,
        generation_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let generation_model = generation_model.into();
        let embedding_model = embedding_model.into();
        if generation_model.trim().is_empty() || embedding_model.trim().is_empty() {
            return Err(LlmError::Config(
                "generation and embedding model names must be non-empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            provider,
            generation_model,
            embedding_model,
        })
    }

    pub fn generation_model(&self) -> &str {
        &self.generation_model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn provider_name(&self) -> &'static str {
        match self.provider {
            LlmProvider::OpenAi { .. } => "openai",
            LlmProvider::Ollama { .. } => "ollama",
        }
    }

    /// Runs one completion against the configured provider.
    async fn complete(
        &self,
        system: Option<&str>,
        prompt: &str,
        temperature: f32,
        top_p: Option<f32>,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let text = match &self.provider {
            LlmProvider::OpenAi { base_url, .. } => {
                let mut messages = Vec::with_capacity(2);
                if let Some(system) = system {
                    messages.push(ChatMessage {
                        role: "system",
                        content: system,
                    });
                }
                messages.push(ChatMessage {
                    role: "user",
                    content: prompt,
                });
                let body = ChatRequest {
                    model: &self.generation_model,
                    messages,
                    temperature,
                    top_p,
                    max_tokens,
                };
                let response: ChatResponse = self
                    .post_json(&format!("{base_url}/chat/completions"), &body)
                    .await?;
                if let Some(usage) = &response.usage {
                    debug!(
                        "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                        usage.prompt_tokens, usage.completion_tokens
                    );
                }
                response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
            }
            LlmProvider::Ollama { base_url } => {
                let body = OllamaGenerateRequest {
                    model: &self.generation_model,
                    prompt,
                    system,
                    stream: false,
                    options: OllamaOptions {
                        temperature,
                        top_p,
                        num_predict: max_tokens,
                    },
                };
                let response: OllamaGenerateResponse = self
                    .post_json(&format!("{base_url}/api/generate"), &body)
                    .await?;
                Some(response.response)
            }
        };

        match text.map(|t| t.trim().to_string()) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(LlmError::EmptyContent),
        }
    }

    /// POSTs a JSON body and deserializes the JSON response.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, LlmError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(url).json(body);
            if let LlmProvider::OpenAi { api_key, .. } = &self.provider {
                request = request.bearer_auth(api_key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<OpenAiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let bytes = response.bytes().await?;
            return serde_json::from_slice(&bytes).map_err(LlmError::Parse);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl StructuredExtractor for LlmClient {
    async fn extract_structured(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.complete(
            Some(system),
            prompt,
            EXTRACTION_TEMPERATURE,
            None,
            EXTRACTION_MAX_TOKENS,
        )
        .await
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str, sampling: &SamplingConfig) -> Result<String, LlmError> {
        self.complete(
            None,
            prompt,
            sampling.temperature,
            Some(sampling.top_p),
            sampling.max_tokens,
        )
        .await
    }
}

#[async_trait]
impl Embedder for LlmClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let embedding = match &self.provider {
            LlmProvider::OpenAi { base_url, .. } => {
                let response: EmbeddingResponse = self
                    .post_json(&format!("{base_url}/embeddings"), &body)
                    .await?;
                response.data.into_iter().next().map(|d| d.embedding)
            }
            LlmProvider::Ollama { base_url } => {
                let response: OllamaEmbedResponse = self
                    .post_json(&format!("{base_url}/api/embed"), &body)
                    .await?;
                response.embeddings.into_iter().next()
            }
        };
        embedding.ok_or(LlmError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_config_defaults() {
        let sampling = SamplingConfig::default();
        assert!((sampling.temperature - 0.7).abs() < f32::EPSILON);
        assert!((sampling.top_p - 0.9).abs() < f32::EPSILON);
        assert_eq!(sampling.max_tokens, 4000);
    }

    #[test]
    fn test_chat_request_omits_missing_top_p() {
        let body = ChatRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.1,
            top_p: None,
            max_tokens: 10,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("top_p").is_none());
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_chat_response_deserializes_content() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("hello"));
        assert_eq!(response.usage.unwrap().completion_tokens, 1);
    }

    #[test]
    fn test_ollama_embed_response_deserializes() {
        let json = r#"{"model": "nomic", "embeddings": [[0.1, 0.2, 0.3]]}"#;
        let response: OllamaEmbedResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.embeddings[0].len(), 3);
    }

    #[test]
    fn test_provider_name() {
        let client = LlmClient::new(
            LlmProvider::Ollama {
                base_url: "http://localhost:11434".to_string(),
            },
            "gemma3:4b",
            "nomic-embed-text",
        )
        .unwrap();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.generation_model(), "gemma3:4b");
        assert_eq!(client.embedding_model(), "nomic-embed-text");
    }

    #[test]
    fn test_empty_model_name_rejected() {
        let result = LlmClient::new(
            LlmProvider::OpenAi {
                api_key: "sk-test".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
            },
            "gpt-4o",
            " ",
        );
        assert!(matches!(result, Err(LlmError::Config(_))));
    }
}
