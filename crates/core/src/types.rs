//! Core type definitions for the CSV agent.
//!
//! - [`prompt`]: what the caller asks.
//! - [`response`]: what the model answers, once decoded.
//! - [`model`]: messages exchanged with the chat model.

mod model;
mod prompt;
mod response;

pub use model::{ChatMessage, LlmResponse, TokenUsage};
pub use prompt::PromptRequest;
pub use response::{AgentResponse, CellValue};
