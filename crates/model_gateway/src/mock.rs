//! Scripted chat model.
//!
//! Replays queued replies in order and records every conversation it
//! receives. Used by tests and for running without network access.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use csv_agent_core::{ChatMessage, Error, LlmClient, LlmResponse, Result};

#[derive(Debug, Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue one more reply.
    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply.into());
        }
    }

    /// Conversations received so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        self.calls
            .lock()
            .map_err(|_| Error::llm("scripted model lock poisoned"))?
            .push(messages.to_vec());

        let reply = self
            .replies
            .lock()
            .map_err(|_| Error::llm("scripted model lock poisoned"))?
            .pop_front()
            .ok_or_else(|| Error::llm("scripted model has no replies left"))?;

        Ok(LlmResponse::text(reply))
    }
}
