use anyhow::{bail, Context, Result};

use crate::llm_client::LlmProvider;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: LlmProvider,
    pub generation_model: String,
    pub embedding_model: String,
    pub max_improvement_attempts: u32,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let provider_name = optional_env("LLM_PROVIDER").unwrap_or_else(|| "openai".to_string());
        let (provider, default_generation, default_embedding) =
            match provider_name.to_lowercase().as_str() {
                "openai" => (
                    LlmProvider::OpenAi {
                        api_key: require_env("OPENAI_API_KEY")?,
                        base_url: optional_env("OPENAI_BASE_URL")
                            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                    },
                    "gpt-4o",
                    "text-embedding-ada-002",
                ),
                "ollama" => (
                    LlmProvider::Ollama {
                        base_url: optional_env("OLLAMA_URL")
                            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                    },
                    "gemma3:4b",
                    "nomic-embed-text:137m-v1.5-fp16",
                ),
                other => bail!("LLM_PROVIDER must be 'openai' or 'ollama', got '{other}'"),
            };

        Ok(Config {
            provider,
            generation_model: optional_env("GENERATION_MODEL")
                .unwrap_or_else(|| default_generation.to_string()),
            embedding_model: optional_env("EMBEDDING_MODEL")
                .unwrap_or_else(|| default_embedding.to_string()),
            max_improvement_attempts: optional_env("MAX_IMPROVEMENT_ATTEMPTS")
                .unwrap_or_else(|| "3".to_string())
                .parse::<u32>()
                .context("MAX_IMPROVEMENT_ATTEMPTS must be a non-negative integer")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
