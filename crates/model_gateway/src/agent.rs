//! Dataframe agent: a chat model bound to one uploaded dataset.

use std::sync::Arc;

use async_trait::async_trait;
use csv_agent_core::{ChatMessage, DataAgent, LlmClient, Result};

use crate::dataset::Dataset;

/// Answers prompts about a single dataset.
///
/// Each invocation sends the dataset context as the system message and
/// the prompt as the user message. The reply text is returned unchanged.
pub struct DataFrameAgent {
    llm: Arc<dyn LlmClient>,
    dataset: Dataset,
}

impl DataFrameAgent {
    pub fn new(llm: Arc<dyn LlmClient>, dataset: Dataset) -> Self {
        Self { llm, dataset }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn messages(&self, prompt: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.dataset.describe()),
            ChatMessage::user(prompt),
        ]
    }
}

#[async_trait]
impl DataAgent for DataFrameAgent {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let response = self.llm.chat(&self.messages(prompt)).await?;

        tracing::debug!(
            dataset = %self.dataset.name(),
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Dataframe agent replied"
        );

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedLlm;

    #[tokio::test]
    async fn test_invoke_sends_dataset_then_prompt() {
        let llm = Arc::new(ScriptedLlm::new([r#"  {"answer": "Gilead"}  "#]));
        let dataset = Dataset::from_bytes("books.csv", b"title,n\nGilead,361\n", 5).unwrap();
        let agent = DataFrameAgent::new(llm.clone(), dataset);

        let raw = agent.invoke("Which title?").await.unwrap();

        // Returned verbatim; trimming is the decoder's job.
        assert_eq!(raw, r#"  {"answer": "Gilead"}  "#);

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].role, "system");
        assert!(calls[0][0].content.contains("Gilead,361"));
        assert_eq!(calls[0][1], ChatMessage::user("Which title?"));
    }

    #[tokio::test]
    async fn test_context_reflects_rows_outside_sample() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"answer": "9990"}"#]));
        let mut raw = String::from("id,value\n");
        for i in 0..1000 {
            raw.push_str(&format!("{i},{}\n", i * 10));
        }
        let dataset = Dataset::from_bytes("big.csv", raw.as_bytes(), 20).unwrap();
        let agent = DataFrameAgent::new(llm.clone(), dataset);

        agent.invoke("What is the largest value?").await.unwrap();

        let system = &llm.calls()[0][0].content;
        assert!(system.contains("with 1000 data rows"));
        assert!(system.contains("max 9990"));
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let llm = Arc::new(ScriptedLlm::default());
        let dataset = Dataset::from_bytes("a.csv", b"a\n1\n", 5).unwrap();
        let agent = DataFrameAgent::new(llm, dataset);

        assert!(agent.invoke("q").await.is_err());
    }
}
