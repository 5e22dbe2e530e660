//! The four single-turn agents: critic, fixer, generator, comparator.
//!
//! An agent is a name plus a system prompt. It owns no connection; each
//! call borrows the evaluator's [`ChatBackend`], so swapping the backend
//! swaps it for every agent at once.

use prompteval_llm::{ChatBackend, ChatReply, ChatRequest};
use prompteval_shared::Result;
use tracing::debug;

use crate::bullets;
use crate::prompts::{
    COMPARATOR_SYSTEM_PROMPT, CRITIC_SYSTEM_PROMPT, FIXER_SYSTEM_PROMPT, GENERATOR_SYSTEM_PROMPT,
};

/// A named system prompt.
#[derive(Debug, Clone)]
pub struct Agent {
    name: String,
    system_message: String,
}

impl Agent {
    pub fn new(name: impl Into<String>, system_message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_message: system_message.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    /// Send one user message and return the raw reply.
    pub async fn ask(&self, backend: &dyn ChatBackend, user: &str) -> Result<ChatReply> {
        debug!(agent = %self.name, chars = user.len(), "agent request");
        backend
            .complete(&ChatRequest::new(self.system_message.clone(), user))
            .await
    }
}

// ---------------------------------------------------------------------------
// Critic
// ---------------------------------------------------------------------------

/// Rates an ANSWER on Correctness, Hallucination, Tone, Relevance.
#[derive(Debug, Clone)]
pub struct CriticAgent {
    agent: Agent,
}

impl Default for CriticAgent {
    fn default() -> Self {
        Self::with_system_message(CRITIC_SYSTEM_PROMPT)
    }
}

impl CriticAgent {
    pub fn with_system_message(system_message: impl Into<String>) -> Self {
        Self {
            agent: Agent::new("CriticAgent", system_message),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub async fn evaluate(&self, backend: &dyn ChatBackend, answer: &str) -> Result<ChatReply> {
        let ask = format!("Evaluate the following.\nANSWER: {}", answer.trim());
        self.agent.ask(backend, &ask).await
    }
}

// ---------------------------------------------------------------------------
// Fixer
// ---------------------------------------------------------------------------

/// Rewrites a PROMPT into clearer bullet-line versions that keep its intent
/// and keywords.
#[derive(Debug, Clone)]
pub struct PromptFixerAgent {
    agent: Agent,
}

/// Rewritten prompts plus the reply they were parsed from.
#[derive(Debug, Clone)]
pub struct Rewrite {
    /// At most [`bullets::MAX_IMPROVED_PROMPTS`] filtered bullet lines.
    pub prompts: Vec<String>,
    /// Bullet lines in the reply before keyword filtering.
    pub raw_bullets: usize,
    pub reply: ChatReply,
}

impl Default for PromptFixerAgent {
    fn default() -> Self {
        Self::with_system_message(FIXER_SYSTEM_PROMPT)
    }
}

impl PromptFixerAgent {
    pub fn with_system_message(system_message: impl Into<String>) -> Self {
        Self {
            agent: Agent::new("PromptFixerAgent", system_message),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub async fn fix(&self, backend: &dyn ChatBackend, original_prompt: &str) -> Result<Rewrite> {
        let ask = format!(
            "PROMPT:\n{}\n\nRewrite per your instructions above.",
            original_prompt.trim()
        );
        let reply = self.agent.ask(backend, &ask).await?;
        let raw_bullets = bullets::extract_bullets(&reply.text).len();
        let prompts = bullets::select_bullets(&reply.text, original_prompt);
        Ok(Rewrite {
            prompts,
            raw_bullets,
            reply,
        })
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Neutral answerer used to produce Answer B.
#[derive(Debug, Clone)]
pub struct GeneratorAgent {
    agent: Agent,
}

impl Default for GeneratorAgent {
    fn default() -> Self {
        Self::with_system_message(GENERATOR_SYSTEM_PROMPT)
    }
}

impl GeneratorAgent {
    pub fn with_system_message(system_message: impl Into<String>) -> Self {
        Self {
            agent: Agent::new("GeneratorAgent", system_message),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub async fn generate(&self, backend: &dyn ChatBackend, prompt: &str) -> Result<ChatReply> {
        self.agent.ask(backend, prompt).await
    }
}

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

/// Decides whether answer A or answer B is better.
#[derive(Debug, Clone)]
pub struct ComparatorAgent {
    agent: Agent,
}

impl Default for ComparatorAgent {
    fn default() -> Self {
        Self::with_system_message(COMPARATOR_SYSTEM_PROMPT)
    }
}

impl ComparatorAgent {
    pub fn with_system_message(system_message: impl Into<String>) -> Self {
        Self {
            agent: Agent::new("ComparatorAgent", system_message),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub async fn compare(
        &self,
        backend: &dyn ChatBackend,
        answer_a: &str,
        answer_b: &str,
    ) -> Result<ChatReply> {
        let ask = format!("A:\n{}\n\nB:\n{}", answer_a.trim(), answer_b.trim());
        self.agent.ask(backend, &ask).await
    }
}
