use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};

// =============================================================================
// Decoded Model Reply
// =============================================================================

/// A decoded model reply. Exactly one shape per reply.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentResponse {
    /// Plain text answer.
    Answer { text: String },

    /// Tabular result. Every row has `columns.len()` cells.
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    },

    /// Bar chart: one value per category.
    BarSeries {
        categories: Vec<String>,
        values: Vec<f64>,
    },

    /// Line chart: one value per category, in order.
    LineSeries {
        categories: Vec<String>,
        values: Vec<f64>,
    },
}

impl AgentResponse {
    /// Wire key of this shape.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Answer { .. } => "answer",
            Self::BarSeries { .. } => "bar",
            Self::LineSeries { .. } => "line",
            Self::Table { .. } => "table",
        }
    }

    /// Serialize back to the wire format the model is asked to produce.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Answer { text } => json!({ "answer": text }),
            Self::BarSeries { categories, values } => {
                json!({ "bar": { "columns": categories, "data": values } })
            }
            Self::LineSeries { categories, values } => {
                json!({ "line": { "columns": categories, "data": values } })
            }
            Self::Table { columns, rows } => {
                json!({ "table": { "columns": columns, "data": rows } })
            }
        }
    }

    /// [`to_wire`](Self::to_wire) as a compact JSON string.
    pub fn to_wire_string(&self) -> String {
        self.to_wire().to_string()
    }
}

/// A table cell. Numbers keep their original JSON representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(Number),
    Text(String),
}

impl CellValue {
    /// Display form used by text renderers; null renders empty.
    pub fn display(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}
