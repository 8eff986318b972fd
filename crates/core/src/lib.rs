//! Core types for the CSV agent.
//!
//! This crate holds the response contract data model, the error taxonomy
//! and the traits at the LLM and rendering boundaries. It has no I/O of
//! its own.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{DecodeError, Error, Result};
pub use traits::{DataAgent, LlmClient, RenderSink};
pub use types::{
    AgentResponse, CellValue, ChatMessage, LlmResponse, PromptRequest, TokenUsage,
};
