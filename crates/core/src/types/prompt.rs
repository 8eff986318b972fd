use serde::{Deserialize, Serialize};

/// One user question plus the free-text context that frames it.
///
/// All fields are taken verbatim; empty strings are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    /// Strengths and purpose of the agent ("You are skilled in ...").
    pub persona: String,
    /// What the uploaded dataset is.
    pub dataset_description: String,
    /// What the analysis should achieve.
    pub objectives: String,
    /// The question itself.
    pub query: String,
}

impl PromptRequest {
    /// Create a request with only a query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_dataset_description(mut self, description: impl Into<String>) -> Self {
        self.dataset_description = description.into();
        self
    }

    pub fn with_objectives(mut self, objectives: impl Into<String>) -> Self {
        self.objectives = objectives.into();
        self
    }
}
