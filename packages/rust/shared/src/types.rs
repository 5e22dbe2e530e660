//! Core domain types for PromptEval runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for evaluation run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Hosted (or local) text-generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Groq,
    OpenAi,
    Anthropic,
    Ollama,
}

/// HTTP dialect a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireDialect {
    /// `POST {base}/chat/completions` with bearer auth.
    OpenAiCompatible,
    /// `POST {base}/messages` with `x-api-key`.
    Anthropic,
}

impl BackendKind {
    /// Every backend, in default-resolution priority order.
    pub const ALL: [BackendKind; 4] = [Self::Groq, Self::OpenAi, Self::Anthropic, Self::Ollama];

    /// Config/CLI key for this backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    pub fn wire(&self) -> WireDialect {
        match self {
            Self::Anthropic => WireDialect::Anthropic,
            Self::Groq | Self::OpenAi | Self::Ollama => WireDialect::OpenAiCompatible,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = crate::PromptEvalError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(crate::PromptEvalError::config(format!(
                "unknown backend '{other}': expected groq, openai, anthropic, or ollama"
            ))),
        }
    }
}

/// USD price per 1k tokens, as `[prompt, completion]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenPrice(pub f64, pub f64);

impl TokenPrice {
    /// Estimated cost of `usage` in USD.
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        (usage.prompt_tokens as f64 / 1000.0) * self.0
            + (usage.completion_tokens as f64 / 1000.0) * self.1
    }
}

/// The active model configuration shared by every agent.
///
/// Swapped wholesale when the user selects another backend.
#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    /// Provider this configuration targets.
    pub kind: BackendKind,
    /// Model identifier sent on the wire.
    pub model: String,
    /// API base URL (e.g. `https://api.groq.com/openai/v1`).
    pub base_url: Url,
    /// API key. Never logged.
    pub api_key: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Token pricing used for cost estimates.
    pub price: TokenPrice,
}

impl LlmConfig {
    /// Base URL without a trailing slash, for endpoint concatenation.
    pub fn endpoint_base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("price", &self.price)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Usage accounting
// ---------------------------------------------------------------------------

/// Token counts reported by the provider for one or more calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// Usage record for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageUsage {
    /// Stage name (`critic`, `fixer`, `generator`, `comparator`).
    pub stage: String,
    /// Model that served the call.
    pub model: String,
    #[serde(flatten)]
    pub tokens: TokenUsage,
    pub latency_ms: u64,
}

// ---------------------------------------------------------------------------
// EvaluationReport
// ---------------------------------------------------------------------------

/// Outcome of one evaluate → rewrite → regenerate → compare run.
///
/// The first seven fields form the exported JSON document; the rest is
/// run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub original_prompt: String,
    /// Answer A, as supplied by the caller.
    pub original_response: String,
    pub critic_analysis: String,
    /// At most two rewritten prompts. May be empty.
    pub improved_prompts: Vec<String>,
    /// Prompt actually used to generate Answer B.
    pub chosen_prompt: String,
    /// Answer B.
    pub new_response: String,
    pub comparison_analysis: String,

    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub backend: BackendKind,
    pub model: String,
    #[serde(default)]
    pub usage: Vec<StageUsage>,
    #[serde(default)]
    pub estimated_cost_usd: f64,
}

impl EvaluationReport {
    /// Sum of token usage across all stages.
    pub fn total_usage(&self) -> TokenUsage {
        let mut total = TokenUsage::default();
        for stage in &self.usage {
            total.add(&stage.tokens);
        }
        total
    }
}
