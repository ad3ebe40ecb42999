//! Text-completion capability: trait and Groq chat client.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use tenderlens_shared::{CompletionConfig, Result, TenderlensError, api_key_from_env};

const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1/";

/// Fixed system message for every completion in the pipeline.
const SYSTEM_PROMPT: &str = "You are a tender assistant. Only answer from provided context.";

/// A single-shot text-completion capability.
///
/// Callers must treat a failed completion as empty output and apply their
/// own fallback; no retries happen at this layer.
pub trait CompletionClient {
    fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Completion client for the Groq OpenAI-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct GroqChat {
    http: reqwest::Client,
    api_base: Url,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl GroqChat {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base is valid"),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Override the API base (must end with a trailing slash).
    pub fn with_api_base(mut self, base: Url) -> Self {
        self.api_base = base;
        self
    }

    /// Build a client from the `[completion]` config section.
    pub fn from_config(cfg: &CompletionConfig) -> Result<Self> {
        let key = api_key_from_env(&cfg.api_key_env)?;
        let mut client = Self::new(key, cfg.model.clone());
        if let Some(base) = &cfg.api_base {
            let url = Url::parse(base).map_err(|e| {
                TenderlensError::config(format!("bad completion api_base '{base}': {e}"))
            })?;
            client = client.with_api_base(url);
        }
        Ok(client)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionClient for GroqChat {
    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        let url = self
            .api_base
            .join("chat/completions")
            .map_err(|e| TenderlensError::Completion(format!("bad API base: {e}")))?;

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TenderlensError::Completion(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| TenderlensError::Completion(format!("provider returned error: {e}")))?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TenderlensError::Completion(format!("invalid response body: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(model = %self.model, chars = text.len(), "completion received");
        Ok(text)
    }
}
