//! In-memory [`ChatBackend`] for pipeline tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use prompteval_llm::{ChatBackend, ChatReply, ChatRequest};
use prompteval_shared::{PromptEvalError, Result, TokenUsage};

/// Replays canned replies in order and records every request.
pub(crate) struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub(crate) fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.requests.lock().unwrap().push(request.clone());
        let text = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PromptEvalError::Network("script exhausted".into()))?;

        Ok(ChatReply {
            usage: TokenUsage {
                prompt_tokens: request.user.len() as u64,
                completion_tokens: text.len() as u64,
            },
            text,
            model: "scripted".into(),
            latency_ms: 1,
        })
    }
}
