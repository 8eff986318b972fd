//! Seams between the contract core and its collaborators.

use async_trait::async_trait;

use crate::types::{ChatMessage, LlmResponse};
use crate::Result;

/// Chat-completion model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the conversation and return the assistant reply.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse>;
}

/// The analysis engine behind a query: prompt in, raw text out.
///
/// Implementations own how the dataset reaches the model; callers only
/// see the returned text, which is decoded separately.
#[async_trait]
pub trait DataAgent: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String>;
}

/// Rendering surface for a decoded reply.
pub trait RenderSink {
    fn show_text(&mut self, text: &str) -> Result<()>;

    fn show_table(&mut self, columns: &[String], rows: &[Vec<crate::CellValue>]) -> Result<()>;

    fn show_bar_chart(&mut self, categories: &[String], values: &[f64]) -> Result<()>;

    fn show_line_chart(&mut self, categories: &[String], values: &[f64]) -> Result<()>;
}
