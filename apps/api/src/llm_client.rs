//! LLM Invoker — the single point of entry for chat-completion calls.
//!
//! ARCHITECTURAL RULE: no other module may talk to the completion API
//! directly. All model traffic goes through this client so the retry and
//! timeout policy is applied in exactly one place.
//!
//! Policy: one bounded-timeout request per call, retried once on transient
//! transport failure (connection errors, 5xx). 4xx responses and rate limits
//! surface immediately; model substitution is the caller's decision, never
//! performed here.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Sampling temperature for every analysis call.
const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("model request timed out")]
    Timeout,

    #[error("rate limited by the model provider")]
    RateLimited,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// The assistant's raw reply plus the model the provider reports having used.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub text: String,
    /// Provider-reported model id; the audit trail of what actually answered.
    pub model: Option<String>,
}

/// Outcome of a single upstream attempt. Transient outcomes are worth one retry.
enum Attempt {
    Reply(LlmReply),
    Transient(LlmError),
    Fatal(LlmError),
}

/// Client for the provider's OpenAI-compatible chat-completions API.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(base_url: String, api_key: String, timeout: std::time::Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Sends one chat-completion request and returns the assistant's reply.
    ///
    /// Timeouts and 429s are surfaced immediately. Connection failures and
    /// 5xx responses get exactly one retry before being reported.
    pub async fn call(
        &self,
        model_id: &str,
        system: &str,
        prompt: &str,
    ) -> Result<LlmReply, LlmError> {
        let body = ChatRequest {
            model: model_id,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        match self.attempt(&body).await {
            Attempt::Reply(reply) => Ok(reply),
            Attempt::Fatal(err) => Err(err),
            Attempt::Transient(err) => {
                warn!("Transient upstream failure ({err}), retrying once");
                match self.attempt(&body).await {
                    Attempt::Reply(reply) => Ok(reply),
                    Attempt::Transient(err) | Attempt::Fatal(err) => Err(err),
                }
            }
        }
    }

    async fn attempt(&self, body: &ChatRequest<'_>) -> Attempt {
        let response = match self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_timeout() => return Attempt::Fatal(LlmError::Timeout),
            Err(err) => return Attempt::Transient(LlmError::Http(err)),
        };

        let status = response.status();

        if status.as_u16() == 429 {
            return Attempt::Fatal(LlmError::RateLimited);
        }

        if status.is_server_error() {
            let message = error_message(response).await;
            warn!("Model provider returned {status}: {message}");
            return Attempt::Transient(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        if !status.is_success() {
            let message = error_message(response).await;
            return Attempt::Fatal(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatResponse = match response.json().await {
            Ok(completion) => completion,
            Err(err) if err.is_timeout() => return Attempt::Fatal(LlmError::Timeout),
            Err(err) => return Attempt::Fatal(LlmError::Http(err)),
        };

        let ChatResponse { model, choices } = completion;
        debug!("Chat completion succeeded (model: {model:?})");

        let content = choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty());

        match content {
            Some(text) => Attempt::Reply(LlmReply { text, model }),
            None => Attempt::Fatal(LlmError::EmptyContent),
        }
    }
}

/// Pulls a readable message out of a provider error body.
async fn error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ProviderError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}
