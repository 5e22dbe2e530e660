//! Chat-completion client for PromptEval.
//!
//! Every pipeline stage is a single round trip to a hosted model. This
//! crate provides:
//! - [`ChatBackend`]: the seam the pipeline talks to
//! - [`HttpChatBackend`]: reqwest implementation for OpenAI-compatible
//!   endpoints (Groq, OpenAI, Ollama) and Anthropic's messages API

mod http;
mod wire;

use async_trait::async_trait;
use prompteval_shared::{Result, TokenUsage};

pub use http::HttpChatBackend;

/// One single-turn exchange: a system prompt and one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// The model's reply plus accounting metadata.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    /// Reply text. Empty when the provider returned no usable content.
    pub text: String,
    pub usage: TokenUsage,
    /// Model that served the request, as reported by the provider.
    pub model: String,
    pub latency_ms: u64,
}

/// A text-generation endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Configured model identifier.
    fn model(&self) -> &str;

    /// Send one request and wait for the full reply.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply>;
}
