//! Model gateway for the CSV agent.
//!
//! Everything on the far side of `invoke(prompt) -> text`: the chat
//! model clients, the uploaded dataset and the dataframe agent that
//! combines them.

pub mod agent;
pub mod dataset;
pub mod mock;
pub mod openai;

pub use agent::DataFrameAgent;
pub use dataset::{ColumnKind, ColumnSummary, Dataset, NumericStats};
pub use mock::ScriptedLlm;
pub use openai::{OpenAiClient, OpenAiConfig};
