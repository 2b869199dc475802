use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Which generative backend serves `TextGenerator` calls.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmBackend {
    /// Hosted chat-completions API. Requires an API key.
    OpenAi { api_key: String, base_url: String, model: String },
    /// Local inference server. Requires the server to be reachable.
    Ollama { base_url: String, model: String },
}

/// Application configuration loaded from environment variables.
/// Built once in `main` and handed to the state and adapters by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub uploads_dir: PathBuf,
    pub signatures_dir: PathBuf,
    pub llm: LlmBackend,
    pub llm_timeout: Duration,
    pub extract_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so tests do not
    /// have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = PathBuf::from(var("DATA_DIR").unwrap_or_else(|| "data".to_string()));
        let uploads_dir = var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("uploads"));
        let signatures_dir = var("SIGNATURES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("signatures"));

        let backend = var("LLM_BACKEND").unwrap_or_else(|| "openai".to_string());
        let llm = match backend.to_ascii_lowercase().as_str() {
            "openai" => LlmBackend::OpenAi {
                api_key: var("OPENAI_API_KEY").with_context(|| {
                    "Required environment variable 'OPENAI_API_KEY' is not set (LLM_BACKEND=openai)"
                })?,
                base_url: var("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                model: var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            },
            "ollama" => LlmBackend::Ollama {
                base_url: var("OLLAMA_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:11434".to_string()),
                model: var("OLLAMA_MODEL").unwrap_or_else(|| "llama3.2:latest".to_string()),
            },
            other => bail!("LLM_BACKEND must be 'openai' or 'ollama', got '{other}'"),
        };

        Ok(Config {
            uploads_dir,
            signatures_dir,
            llm,
            llm_timeout: Duration::from_secs(parse_or(&var, "LLM_TIMEOUT_SECS", 120)?),
            extract_timeout: Duration::from_secs(parse_or(&var, "EXTRACT_TIMEOUT_SECS", 60)?),
            port: parse_or(&var, "PORT", 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
