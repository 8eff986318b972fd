//! Model reply decoding.
//!
//! Turns raw model text into an [`AgentResponse`] or a classified
//! [`DecodeError`]. Decoding never panics and never coerces types: a
//! quoted number where a number is expected is a schema violation.

use std::collections::{BTreeSet, HashSet};

use csv_agent_core::{AgentResponse, CellValue, DecodeError};
use serde_json::{Map, Value};

/// Recognized top-level keys, in priority order. When several are present
/// only the first one in this list is decoded.
pub const RECOGNIZED_KEYS: [&str; 4] = ["answer", "bar", "line", "table"];

/// Decodes model replies into typed responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseDecoder;

#[derive(Debug, Clone, Copy)]
enum Shape {
    Answer,
    Bar,
    Line,
    Table,
}

impl Shape {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "answer" => Some(Self::Answer),
            "bar" => Some(Self::Bar),
            "line" => Some(Self::Line),
            "table" => Some(Self::Table),
            _ => None,
        }
    }
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one raw reply.
    pub fn decode(&self, raw: &str) -> Result<AgentResponse, DecodeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DecodeError::EmptyResponse);
        }

        let value: Value = serde_json::from_str(trimmed).map_err(|e| DecodeError::MalformedJson {
            raw: raw.to_string(),
            position: error_offset(raw, trimmed, e.line(), e.column()),
        })?;

        let object = match value {
            Value::Object(object) => object,
            // Valid JSON but not an object: there are no keys to dispatch on.
            _ => {
                return Err(DecodeError::UnknownShape {
                    keys: BTreeSet::new(),
                    raw: raw.to_string(),
                })
            }
        };

        let Some((shape, payload)) = RECOGNIZED_KEYS.iter().find_map(|key| {
            let payload = object.get(*key)?;
            Shape::from_key(key).map(|shape| (shape, payload))
        }) else {
            return Err(DecodeError::UnknownShape {
                keys: object.keys().cloned().collect(),
                raw: raw.to_string(),
            });
        };

        match shape {
            Shape::Answer => decode_answer(payload),
            Shape::Bar => decode_series("bar", payload).map(|(categories, values)| {
                AgentResponse::BarSeries { categories, values }
            }),
            Shape::Line => decode_series("line", payload).map(|(categories, values)| {
                AgentResponse::LineSeries { categories, values }
            }),
            Shape::Table => decode_table(payload),
        }
    }
}

/// Shorthand for [`ResponseDecoder::decode`].
pub fn decode(raw: &str) -> Result<AgentResponse, DecodeError> {
    ResponseDecoder.decode(raw)
}

fn decode_answer(payload: &Value) -> Result<AgentResponse, DecodeError> {
    match payload {
        Value::String(text) => Ok(AgentResponse::Answer { text: text.clone() }),
        _ => Err(DecodeError::schema("answer", "value is not a string")),
    }
}

fn decode_series(variant: &str, payload: &Value) -> Result<(Vec<String>, Vec<f64>), DecodeError> {
    let object = as_object(variant, payload)?;
    let categories = string_list(variant, field(variant, object, "columns")?)?;

    let data = array(variant, field(variant, object, "data")?, "data")?;
    let values = data
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64().ok_or_else(|| {
                DecodeError::schema(
                    variant,
                    format!("data[{i}] is not a number (found {})", type_name(v)),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if categories.len() != values.len() {
        return Err(DecodeError::schema(
            variant,
            format!(
                "columns has {} entries but data has {}",
                categories.len(),
                values.len()
            ),
        ));
    }

    Ok((categories, values))
}

fn decode_table(payload: &Value) -> Result<AgentResponse, DecodeError> {
    const VARIANT: &str = "table";

    let object = as_object(VARIANT, payload)?;
    let columns = string_list(VARIANT, field(VARIANT, object, "columns")?)?;

    let mut seen = HashSet::with_capacity(columns.len());
    if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(DecodeError::schema(
            VARIANT,
            format!("duplicate column `{dup}`"),
        ));
    }

    let data = array(VARIANT, field(VARIANT, object, "data")?, "data")?;
    let mut rows = Vec::with_capacity(data.len());
    for (r, row) in data.iter().enumerate() {
        let Value::Array(cells) = row else {
            return Err(DecodeError::schema(
                VARIANT,
                format!("data[{r}] is not an array (found {})", type_name(row)),
            ));
        };
        if cells.len() != columns.len() {
            return Err(DecodeError::schema(
                VARIANT,
                format!(
                    "data[{r}] has {} values but there are {} columns",
                    cells.len(),
                    columns.len()
                ),
            ));
        }
        let row = cells
            .iter()
            .enumerate()
            .map(|(c, cell)| match cell {
                Value::Null => Ok(CellValue::Null),
                Value::Number(n) => Ok(CellValue::Number(n.clone())),
                Value::String(s) => Ok(CellValue::Text(s.clone())),
                other => Err(DecodeError::schema(
                    VARIANT,
                    format!(
                        "data[{r}][{c}] must be a string, number or null (found {})",
                        type_name(other)
                    ),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    Ok(AgentResponse::Table { columns, rows })
}

fn as_object<'a>(variant: &str, payload: &'a Value) -> Result<&'a Map<String, Value>, DecodeError> {
    payload.as_object().ok_or_else(|| {
        DecodeError::schema(
            variant,
            format!("value is not an object (found {})", type_name(payload)),
        )
    })
}

fn field<'a>(
    variant: &str,
    object: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a Value, DecodeError> {
    object
        .get(name)
        .ok_or_else(|| DecodeError::schema(variant, format!("missing field `{name}`")))
}

fn array<'a>(variant: &str, value: &'a Value, name: &str) -> Result<&'a Vec<Value>, DecodeError> {
    value.as_array().ok_or_else(|| {
        DecodeError::schema(
            variant,
            format!("`{name}` is not an array (found {})", type_name(value)),
        )
    })
}

fn string_list(variant: &str, value: &Value) -> Result<Vec<String>, DecodeError> {
    array(variant, value, "columns")?
        .iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::String(s) => Ok(s.clone()),
            other => Err(DecodeError::schema(
                variant,
                format!("columns[{i}] is not a string (found {})", type_name(other)),
            )),
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Character offset into `raw` for a 1-based (line, column) reported by
/// serde_json against `trimmed`. serde_json reports line 0 when it has no
/// position.
fn error_offset(raw: &str, trimmed: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let leading = raw[..raw.len() - raw.trim_start().len()].chars().count();
    let before: usize = trimmed
        .split('\n')
        .take(line - 1)
        .map(|l| l.chars().count() + 1)
        .sum();
    // serde_json columns count bytes within the line.
    let byte_col = column.saturating_sub(1);
    let within = trimmed
        .split('\n')
        .nth(line - 1)
        .map(|l| l.char_indices().take_while(|(i, _)| *i < byte_col).count())
        .unwrap_or(0);
    Some(leading + before + within)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn assert_schema(raw: &str, expected_variant: &str) -> String {
        match decode(raw) {
            Err(DecodeError::SchemaViolation { variant, detail }) => {
                assert_eq!(variant, expected_variant);
                detail
            }
            other => panic!("Expected SchemaViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_answer() {
        let response = decode(r#"{"answer": "The title with the highest rating is 'Gilead'"}"#)
            .unwrap();
        assert_eq!(
            response,
            AgentResponse::Answer {
                text: "The title with the highest rating is 'Gilead'".to_string()
            }
        );
    }

    #[test]
    fn test_decode_bar() {
        let response = decode(r#"{"bar": {"columns": ["a","b"], "data": [1,2]}}"#).unwrap();
        assert_eq!(
            response,
            AgentResponse::BarSeries {
                categories: strings(&["a", "b"]),
                values: vec![1.0, 2.0],
            }
        );
    }

    #[test]
    fn test_decode_line() {
        let response =
            decode(r#"{"line": {"columns": ["2021","2022","2023"], "data": [1.5, -2, 3e2]}}"#)
                .unwrap();
        assert_eq!(
            response,
            AgentResponse::LineSeries {
                categories: strings(&["2021", "2022", "2023"]),
                values: vec![1.5, -2.0, 300.0],
            }
        );
    }

    #[test]
    fn test_decode_table() {
        let response = decode(
            r#"{"table": {"columns": ["title", "ratings_count"], "data": [["Gilead", 361], ["Spider's Web", null]]}}"#,
        )
        .unwrap();
        assert_eq!(
            response,
            AgentResponse::Table {
                columns: strings(&["title", "ratings_count"]),
                rows: vec![
                    vec!["Gilead".into(), 361.into()],
                    vec!["Spider's Web".into(), CellValue::Null],
                ],
            }
        );
    }

    #[test]
    fn test_empty_series_and_table_are_valid() {
        assert_eq!(
            decode(r#"{"bar": {"columns": [], "data": []}}"#).unwrap(),
            AgentResponse::BarSeries {
                categories: vec![],
                values: vec![],
            }
        );
        assert_eq!(
            decode(r#"{"table": {"columns": ["a"], "data": []}}"#).unwrap(),
            AgentResponse::Table {
                columns: strings(&["a"]),
                rows: vec![],
            }
        );
    }

    #[test]
    fn test_empty_response() {
        assert_eq!(decode(""), Err(DecodeError::EmptyResponse));
        assert_eq!(decode("   "), Err(DecodeError::EmptyResponse));
        assert_eq!(decode("\n\t "), Err(DecodeError::EmptyResponse));
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let response = decode("  \n{\"answer\": \"ok\"}\n  ").unwrap();
        assert_eq!(
            response,
            AgentResponse::Answer {
                text: "ok".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_json() {
        match decode("{not json") {
            Err(DecodeError::MalformedJson { raw, position }) => {
                assert_eq!(raw, "{not json");
                assert_eq!(position, Some(1));
            }
            other => panic!("Expected MalformedJson, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_position_accounts_for_leading_whitespace() {
        match decode("  {not json") {
            Err(DecodeError::MalformedJson { raw, position }) => {
                assert_eq!(raw, "  {not json");
                assert_eq!(position, Some(3));
            }
            other => panic!("Expected MalformedJson, got {:?}", other),
        }
    }

    #[test]
    fn test_prose_is_malformed_json() {
        assert!(matches!(
            decode("The answer is 42."),
            Err(DecodeError::MalformedJson { .. })
        ));
    }

    #[test]
    fn test_unknown_shape() {
        match decode(r#"{"foo": 1}"#) {
            Err(DecodeError::UnknownShape { keys, .. }) => {
                assert_eq!(keys, ["foo".to_string()].into_iter().collect());
            }
            other => panic!("Expected UnknownShape, got {:?}", other),
        }
    }

    #[test]
    fn test_scatter_is_not_a_recognized_shape() {
        assert!(matches!(
            decode(r#"{"scatter": {"columns": ["x","y"], "data": [[1,2]]}}"#),
            Err(DecodeError::UnknownShape { .. })
        ));
    }

    #[test]
    fn test_non_object_json_has_no_keys() {
        match decode("[1, 2]") {
            Err(DecodeError::UnknownShape { keys, raw }) => {
                assert!(keys.is_empty());
                assert_eq!(raw, "[1, 2]");
            }
            other => panic!("Expected UnknownShape, got {:?}", other),
        }
    }

    #[test]
    fn test_first_recognized_key_wins() {
        let raw = r#"{"answer": "x", "table": {"columns": ["a"], "data": [[1]]}}"#;
        assert_eq!(
            decode(raw).unwrap(),
            AgentResponse::Answer {
                text: "x".to_string()
            }
        );

        // Priority follows the fixed key order, not the order in the reply.
        let raw = r#"{"table": {"columns": ["a"], "data": [[1]]}, "line": {"columns": ["a"], "data": [1]}}"#;
        assert_eq!(decode(raw).unwrap().kind(), "line");
    }

    #[test]
    fn test_lower_priority_key_is_not_validated() {
        let raw = r#"{"bar": {"columns": ["a"], "data": [1]}, "table": "garbage"}"#;
        assert_eq!(decode(raw).unwrap().kind(), "bar");
    }

    #[test]
    fn test_answer_must_be_string() {
        let detail = assert_schema(r#"{"answer": 42}"#, "answer");
        assert_eq!(detail, "value is not a string");
    }

    #[test]
    fn test_table_row_arity_mismatch() {
        let detail = assert_schema(
            r#"{"table": {"columns": ["a","b"], "data": [[1]]}}"#,
            "table",
        );
        assert!(detail.contains("data[0] has 1 values but there are 2 columns"));
    }

    #[test]
    fn test_table_duplicate_columns() {
        let detail = assert_schema(
            r#"{"table": {"columns": ["a","a"], "data": [[1, 2]]}}"#,
            "table",
        );
        assert!(detail.contains("duplicate column `a`"));
    }

    #[test]
    fn test_table_rejects_nested_cells() {
        let detail = assert_schema(
            r#"{"table": {"columns": ["a"], "data": [[true]]}}"#,
            "table",
        );
        assert!(detail.contains("data[0][0]"));
        assert!(detail.contains("boolean"));
    }

    #[test]
    fn test_table_row_must_be_array() {
        let detail = assert_schema(
            r#"{"table": {"columns": ["a"], "data": [1]}}"#,
            "table",
        );
        assert!(detail.contains("data[0] is not an array"));
    }

    #[test]
    fn test_numeric_strings_are_not_coerced() {
        let detail = assert_schema(r#"{"bar": {"columns": ["a"], "data": ["1"]}}"#, "bar");
        assert!(detail.contains("data[0] is not a number (found string)"));
    }

    #[test]
    fn test_series_length_mismatch() {
        let detail = assert_schema(
            r#"{"line": {"columns": ["a","b"], "data": [1]}}"#,
            "line",
        );
        assert_eq!(detail, "columns has 2 entries but data has 1");
    }

    #[test]
    fn test_series_missing_fields() {
        let detail = assert_schema(r#"{"bar": {"data": [1]}}"#, "bar");
        assert_eq!(detail, "missing field `columns`");

        let detail = assert_schema(r#"{"line": {"columns": ["a"]}}"#, "line");
        assert_eq!(detail, "missing field `data`");
    }

    #[test]
    fn test_series_payload_must_be_object() {
        let detail = assert_schema(r#"{"bar": [1, 2]}"#, "bar");
        assert_eq!(detail, "value is not an object (found array)");
    }

    #[test]
    fn test_column_names_must_be_strings() {
        let detail = assert_schema(r#"{"bar": {"columns": [1], "data": [1]}}"#, "bar");
        assert!(detail.contains("columns[0] is not a string"));
    }

    #[test]
    fn test_table_round_trip() {
        let raw = r#"{"table":{"columns":["title","ratings_count","note"],"data":[["Gilead",361,null],["Spider's Web",5164,"x"],["Other",4.25,""]]}}"#;
        let response = decode(raw).unwrap();

        let wire = response.to_wire();
        let original: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(wire, original);
        assert_eq!(decode(&response.to_wire_string()).unwrap(), response);
    }
}
