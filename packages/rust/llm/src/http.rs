//! reqwest-backed [`ChatBackend`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use prompteval_shared::{LlmConfig, PromptEvalError, Result, TokenUsage, WireDialect};

use crate::wire::{
    ANTHROPIC_MAX_TOKENS, ChatCompletionRequest, ChatCompletionResponse, MessagesRequest,
    MessagesResponse, WireMessage,
};
use crate::{ChatBackend, ChatReply, ChatRequest};

/// User-Agent string for model requests.
const USER_AGENT: &str = concat!("PromptEval/", env!("CARGO_PKG_VERSION"));

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Maximum characters of an error body kept in [`PromptEvalError::Api`].
const MAX_ERROR_BODY_CHARS: usize = 320;

/// Chat backend speaking HTTP to the configured provider.
pub struct HttpChatBackend {
    config: LlmConfig,
    client: Client,
}

impl HttpChatBackend {
    /// Build a client for `config`. One request per call, no retries.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PromptEvalError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    async fn complete_openai(&self, request: &ChatRequest) -> Result<(String, ChatReplyMeta)> {
        let url = format!("{}/chat/completions", self.config.endpoint_base());
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: &request.system,
                },
                WireMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.config.temperature,
        };

        debug!(%url, model = %self.config.model, "sending chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PromptEvalError::Network(format!("{url}: {e}")))?;

        let parsed: ChatCompletionResponse = decode(&url, response).await?;
        let meta = ChatReplyMeta {
            usage: parsed.token_usage(),
            model: parsed.model.clone(),
        };
        Ok((parsed.text(), meta))
    }

    async fn complete_anthropic(&self, request: &ChatRequest) -> Result<(String, ChatReplyMeta)> {
        let url = format!("{}/messages", self.config.endpoint_base());
        let body = MessagesRequest {
            model: &self.config.model,
            system: &request.system,
            messages: vec![WireMessage {
                role: "user",
                content: &request.user,
            }],
            max_tokens: ANTHROPIC_MAX_TOKENS,
            temperature: self.config.temperature,
        };

        debug!(%url, model = %self.config.model, "sending anthropic message");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| PromptEvalError::Network(format!("{url}: {e}")))?;

        let parsed: MessagesResponse = decode(&url, response).await?;
        let meta = ChatReplyMeta {
            usage: parsed.token_usage(),
            model: parsed.model.clone(),
        };
        Ok((parsed.text(), meta))
    }
}

struct ChatReplyMeta {
    usage: TokenUsage,
    model: Option<String>,
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all)]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply> {
        let started = Instant::now();

        let (text, meta) = match self.config.kind.wire() {
            WireDialect::OpenAiCompatible => self.complete_openai(request).await?,
            WireDialect::Anthropic => self.complete_anthropic(request).await?,
        };

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            backend = %self.config.kind,
            latency_ms,
            tokens_in = meta.usage.prompt_tokens,
            tokens_out = meta.usage.completion_tokens,
            "model replied"
        );

        Ok(ChatReply {
            text,
            usage: meta.usage,
            model: meta.model.unwrap_or_else(|| self.config.model.clone()),
            latency_ms,
        })
    }
}

/// Check the status and decode the JSON body.
async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PromptEvalError::Api {
            status: status.as_u16(),
            message: truncate(body.trim(), MAX_ERROR_BODY_CHARS),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| PromptEvalError::Network(format!("{url}: failed to read body: {e}")))?;

    serde_json::from_str(&body)
        .map_err(|e| PromptEvalError::parse(format!("{url}: invalid response body: {e}")))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}…")
    }
}
