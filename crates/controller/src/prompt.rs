//! Prompt construction.
//!
//! The prompt grounds the model in the caller's persona, dataset
//! description and objectives, then spells out the four reply shapes the
//! decoder accepts. The user query always comes last.

use csv_agent_core::{DecodeError, PromptRequest};

const DEFAULT_AGENT_NAME: &str = "DataFrameAI";

/// Reply grammar embedded in every prompt. Must stay in sync with the decoder.
const OUTPUT_GRAMMAR: &str = r#"For the following query, if it requires drawing a table, reply as follows:
{"table": {"columns": ["column1", "column2", ...], "data": [[value1, value2, ...], [value1, value2, ...], ...]}}

If the query requires creating a bar chart, reply as follows:
{"bar": {"columns": ["A", "B", "C", ...], "data": [25, 24, 10, ...]}}

If the query requires creating a line chart, reply as follows:
{"line": {"columns": ["A", "B", "C", ...], "data": [25, 24, 10, ...]}}

There can only be two types of charts, "bar" and "line".

If it is just asking a question that requires neither, reply as follows:
{"answer": "answer"}
Example:
{"answer": "The title with the highest rating is 'Gilead'"}

If you do not know the answer, reply as follows:
{"answer": "I do not know."}

Return all output as a single JSON object using exactly one of the keys "answer", "bar", "line" or "table".
Do not wrap it in markdown and do not add any text before or after it.
All strings in the "columns" list and the "data" list must be in double quotes.
Chart "data" entries must be plain numbers, not quoted strings.
Every row in a table's "data" must have one value per column.

For example: {"table": {"columns": ["title", "ratings_count"], "data": [["Gilead", 361], ["Spider's Web", 5164]]}}"#;

/// Builds the prompt sent to the dataframe agent.
///
/// Pure: the same request always yields the same string.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    agent_name: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            agent_name: DEFAULT_AGENT_NAME.to_string(),
        }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the name the agent is addressed by.
    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = name.into();
        self
    }

    /// Build the full prompt for one query.
    pub fn build(&self, request: &PromptRequest) -> String {
        let name = &self.agent_name;
        let PromptRequest {
            persona,
            dataset_description,
            objectives,
            query,
        } = request;

        format!(
            r#"You are {name}, a dataframe analysis agent. You are collaborating with a company to provide skilled, in-depth data analysis on a large table. They want to analyze trends, ratios, hidden insights, and more.

Here is the context about the agent:

Agent context: {persona}
Dataset description: {dataset_description}
Objectives: {objectives}
-----

{OUTPUT_GRAMMAR}

Let's think step by step, but only return the final JSON object.

When answering with "answer", provide detailed, actionable insights, including statistics and totals where relevant.

Below is the query.

Query: {query}"#
        )
    }

    /// Build the prompt for a retry after the previous reply could not be decoded.
    ///
    /// The original prompt is kept intact and a correction note naming the
    /// failure is appended after it.
    pub fn build_retry(&self, request: &PromptRequest, previous: &DecodeError) -> String {
        format!(
            "{}\n\n-----\nYour previous reply could not be used ({}). \
             Reply again with exactly one JSON object in one of the formats above.",
            self.build(request),
            previous
        )
    }
}
