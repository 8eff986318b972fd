//! Mapping of query errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use csv_agent_core::Error;
use serde::{Deserialize, Serialize};

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable kind, e.g. `malformed_json` or `invalid_dataset`.
    pub error: String,
    pub message: String,
    /// Bounded excerpt of the model reply, for malformed or unknown replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_excerpt: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    /// Malformed request outside the dataset itself, e.g. a missing form part.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: "invalid_request".to_string(),
                message: message.into(),
                raw_excerpt: None,
            },
        }
    }

    /// Classify `err`, keeping at most `excerpt_len` characters of any raw reply.
    pub fn from_error(err: &Error, excerpt_len: usize) -> Self {
        if let Some(decode) = err.decode_error() {
            return Self {
                status: StatusCode::BAD_GATEWAY,
                body: ErrorBody {
                    error: decode.kind().to_string(),
                    message: err.to_string(),
                    raw_excerpt: decode.raw_excerpt(excerpt_len),
                },
            };
        }

        let (status, kind) = match err {
            Error::Dataset(_) => (StatusCode::BAD_REQUEST, "invalid_dataset"),
            Error::Llm(_) => (StatusCode::BAD_GATEWAY, "llm_error"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        Self {
            status,
            body: ErrorBody {
                error: kind.to_string(),
                message: err.to_string(),
                raw_excerpt: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv_agent_core::DecodeError;

    #[test]
    fn test_exhausted_decode_is_bad_gateway_with_excerpt() {
        let err = Error::AttemptsExhausted {
            attempts: 2,
            last: DecodeError::MalformedJson {
                raw: "Here is your answer: the best book is".to_string(),
                position: Some(0),
            },
        };

        let api = ApiError::from_error(&err, 7);

        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
        assert_eq!(api.body.error, "malformed_json");
        assert_eq!(api.body.raw_excerpt.as_deref(), Some("Here is..."));
    }

    #[test]
    fn test_schema_violation_has_no_excerpt() {
        let err = Error::Decode(DecodeError::schema("bar", "missing field `data`"));
        let api = ApiError::from_error(&err, 100);

        assert_eq!(api.body.error, "schema_violation");
        assert!(api.body.raw_excerpt.is_none());
    }

    #[test]
    fn test_dataset_error_is_bad_request() {
        let api = ApiError::from_error(&Error::dataset("`x.csv` is empty"), 100);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.body.error, "invalid_dataset");
    }

    #[test]
    fn test_bad_request() {
        let api = ApiError::bad_request("missing `file` part");
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.body.error, "invalid_request");
        assert_eq!(api.body.message, "missing `file` part");
    }

    #[test]
    fn test_llm_error_is_bad_gateway() {
        let api = ApiError::from_error(&Error::llm("HTTP 401"), 100);
        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
        assert_eq!(api.body.error, "llm_error");
    }
}
