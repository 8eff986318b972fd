//! Query controller for the CSV agent.
//!
//! This crate provides the response contract (prompt building and reply
//! decoding), the query loop that re-prompts on undecodable replies, and
//! the render dispatch with its built-in sinks.

pub mod decoder;
pub mod prompt;
pub mod query;
pub mod render;

pub use decoder::ResponseDecoder;
pub use prompt::PromptBuilder;
pub use query::{QueryConfig, QueryController, QueryOutcome};
pub use render::{render, TextSink, ViewBlock, ViewSink};
