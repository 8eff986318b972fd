//! Query loop.
//!
//! One user action is one query:
//! 1. Build the prompt from the request
//! 2. Invoke the dataframe agent
//! 3. Decode the reply
//! 4. On a decode failure, re-prompt with the failure named, until
//!    `max_attempts` is reached
//!
//! Agent (transport) errors are returned as-is; retrying those is the
//! agent's own concern.

use std::sync::Arc;

use csv_agent_core::{AgentResponse, DataAgent, DecodeError, Error, PromptRequest, RenderSink, Result};

use crate::decoder::ResponseDecoder;
use crate::prompt::PromptBuilder;
use crate::render::render;

/// Query controller configuration.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Total attempts per query, including the first. Values below 1 act as 1.
    pub max_attempts: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

/// A successfully decoded query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub response: AgentResponse,
    /// Attempts used, starting at 1.
    pub attempts: usize,
}

/// Runs queries against a dataframe agent.
pub struct QueryController {
    /// Configuration.
    config: QueryConfig,
    /// Agent that answers prompts.
    agent: Option<Arc<dyn DataAgent>>,
    /// Prompt template.
    builder: PromptBuilder,
    decoder: ResponseDecoder,
}

impl QueryController {
    /// Create a new query controller.
    pub fn new(config: QueryConfig) -> Self {
        Self {
            config,
            agent: None,
            builder: PromptBuilder::default(),
            decoder: ResponseDecoder,
        }
    }

    /// Set the agent.
    pub fn with_agent(mut self, agent: Arc<dyn DataAgent>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Replace the prompt builder.
    pub fn with_prompt_builder(mut self, builder: PromptBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Ask one question and decode the answer.
    pub async fn ask(&self, request: &PromptRequest) -> Result<QueryOutcome> {
        let agent = self
            .agent
            .as_ref()
            .ok_or_else(|| Error::controller("dataframe agent not configured"))?;

        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<DecodeError> = None;

        for attempt in 1..=max_attempts {
            let prompt = match &last_error {
                None => self.builder.build(request),
                Some(previous) => self.builder.build_retry(request, previous),
            };

            tracing::info!(
                attempt = attempt,
                max_attempts = max_attempts,
                prompt_len = prompt.len(),
                "Invoking dataframe agent"
            );

            let raw = agent.invoke(&prompt).await?;

            tracing::debug!(response_len = raw.len(), "Agent response received");

            match self.decoder.decode(&raw) {
                Ok(response) => {
                    tracing::info!(
                        attempt = attempt,
                        kind = response.kind(),
                        "Response decoded"
                    );
                    return Ok(QueryOutcome { response, attempts: attempt });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt,
                        error_kind = e.kind(),
                        error = %e,
                        "Agent response could not be decoded"
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(Error::AttemptsExhausted {
                attempts: max_attempts,
                last,
            }),
            None => Err(Error::controller("query loop ran no attempts")),
        }
    }

    /// Ask one question and render the answer into `sink`.
    pub async fn run(&self, request: &PromptRequest, sink: &mut dyn RenderSink) -> Result<QueryOutcome> {
        let outcome = self.ask(request).await?;
        render(&outcome.response, sink)?;
        Ok(outcome)
    }
}
