/// LLM Client — the Generative Text Adapter. Every model call in the service
/// goes through a `TextGenerator` built here.
///
/// Two backends: a hosted chat-completions API and a local Ollama server.
/// Which one is used is decided once, from `Config`, in `build_generator`.
/// No retries: a failed call is reported to the caller as-is.
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{Config, LlmBackend};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0}")]
    Unavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM call timed out after {secs}s")]
    TimedOut { secs: u64 },
}

/// Text in, text out. Implemented once per backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system_prompt: &str, body: &str) -> Result<String, LlmError>;

    /// "openai" | "ollama" — for logs and health output.
    fn backend_name(&self) -> &'static str;

    fn model(&self) -> &str;
}

/// Builds the generator selected by configuration.
pub fn build_generator(config: &Config) -> Result<Arc<dyn TextGenerator>> {
    let client = Client::builder()
        .timeout(config.llm_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let generator: Arc<dyn TextGenerator> = match &config.llm {
        LlmBackend::OpenAi {
            api_key,
            base_url,
            model,
        } => Arc::new(OpenAiClient::new(
            client,
            api_key.clone(),
            base_url.clone(),
            model.clone(),
            config.llm_timeout,
        )),
        LlmBackend::Ollama { base_url, model } => Arc::new(OllamaClient::new(
            client,
            base_url.clone(),
            model.clone(),
            config.llm_timeout,
        )),
    };
    Ok(generator)
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

fn chat_messages<'a>(system_prompt: &'a str, body: &'a str) -> Vec<ChatMessage<'a>> {
    vec![
        ChatMessage {
            role: "system",
            content: system_prompt,
        },
        ChatMessage {
            role: "user",
            content: body,
        },
    ]
}

fn map_send_error(err: reqwest::Error, timeout: Duration) -> LlmError {
    if err.is_timeout() {
        LlmError::TimedOut {
            secs: timeout.as_secs(),
        }
    } else {
        LlmError::Http(err)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

// ────────────────────────────────────────────────────────────────────────────
// Hosted backend (OpenAI chat completions)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(
        client: Client,
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url,
            model,
            timeout,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn complete(&self, system_prompt: &str, body: &str) -> Result<String, LlmError> {
        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages: chat_messages(system_prompt, body),
        };

        let response = self
            .client
            .post(join_url(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let status = response.status();
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

        let completion: ChatCompletionResponse = response.json().await?;
        if let Some(usage) = &completion.usage {
            debug!(
                "OpenAI call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or(LlmError::EmptyContent)
    }

    fn backend_name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Local backend (Ollama)
// ────────────────────────────────────────────────────────────────────────────

const OLLAMA_NOT_RUNNING: &str = "Ollama server is not running. Start it with: ollama serve";

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(client: Client, base_url: String, model: String, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            model,
            timeout,
        }
    }

    /// Lists local models to confirm the server answers at all.
    async fn probe(&self) -> Result<(), LlmError> {
        match self
            .client
            .get(join_url(&self.base_url, "api/tags"))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(LlmError::Unavailable(format!(
                "{OLLAMA_NOT_RUNNING} (probe returned {})",
                response.status()
            ))),
            Err(e) => {
                debug!("Ollama probe failed: {e}");
                Err(LlmError::Unavailable(OLLAMA_NOT_RUNNING.to_string()))
            }
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn complete(&self, system_prompt: &str, body: &str) -> Result<String, LlmError> {
        self.probe().await?;

        let request_body = OllamaChatRequest {
            model: &self.model,
            messages: chat_messages(system_prompt, body),
            stream: false,
        };

        let response = self
            .client
            .post(join_url(&self.base_url, "api/chat"))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: format!("Ollama chat error: {message}"),
            });
        }

        let chat: OllamaChatResponse = response.json().await?;
        debug!("Ollama call succeeded: eval_count={:?}", chat.eval_count);

        chat.message
            .map(|m| m.content.trim().to_string())
            .ok_or(LlmError::EmptyContent)
    }

    fn backend_name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
