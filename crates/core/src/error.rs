//! Error types.
//!
//! [`DecodeError`] classifies a model reply that does not follow the
//! response contract. [`Error`] covers everything else that can go wrong
//! around a query (transport, dataset, configuration).

use std::collections::BTreeSet;

use thiserror::Error;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Classified failure to decode a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The reply was empty or whitespace only.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// The reply was not valid JSON.
    #[error("model response is not valid JSON{}", position_suffix(.position))]
    MalformedJson {
        /// The reply exactly as received.
        raw: String,
        /// Character offset into `raw` where parsing failed.
        position: Option<usize>,
    },

    /// The reply parsed but carries none of the recognized top-level keys.
    #[error("model response has no recognized key (found: {})", join_keys(.keys))]
    UnknownShape {
        /// Top-level keys actually present.
        keys: BTreeSet<String>,
        /// The reply exactly as received.
        raw: String,
    },

    /// A recognized shape whose payload has the wrong structure.
    #[error("invalid `{variant}` response: {detail}")]
    SchemaViolation { variant: String, detail: String },
}

impl DecodeError {
    /// Shorthand for a [`DecodeError::SchemaViolation`].
    pub fn schema(variant: &str, detail: impl Into<String>) -> Self {
        Self::SchemaViolation {
            variant: variant.to_string(),
            detail: detail.into(),
        }
    }

    /// Stable identifier of the error kind, suitable for logs and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyResponse => "empty_response",
            Self::MalformedJson { .. } => "malformed_json",
            Self::UnknownShape { .. } => "unknown_shape",
            Self::SchemaViolation { .. } => "schema_violation",
        }
    }

    /// Offending raw text for the kinds where it helps debugging.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::MalformedJson { raw, .. } | Self::UnknownShape { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Raw text cut to at most `max_chars` characters, with an ellipsis when cut.
    pub fn raw_excerpt(&self, max_chars: usize) -> Option<String> {
        self.raw().map(|raw| truncate_chars(raw, max_chars))
    }

    /// Short human-readable message: the error itself plus a bounded excerpt
    /// of the raw reply when one is available.
    pub fn user_message(&self, max_chars: usize) -> String {
        match self.raw_excerpt(max_chars) {
            Some(excerpt) => format!("{self}. Raw response: {excerpt}"),
            None => self.to_string(),
        }
    }
}

/// Errors raised around a query: everything except the contract itself.
#[derive(Debug, Error)]
pub enum Error {
    /// Model reply did not follow the response contract.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Every attempt produced a reply that could not be decoded.
    #[error("no decodable response after {attempts} attempt(s): {last}")]
    AttemptsExhausted { attempts: usize, last: DecodeError },

    /// LLM transport or provider failure.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Uploaded dataset could not be used.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Controller misuse (e.g. no agent wired in).
    #[error("controller error: {0}")]
    Controller(String),

    /// Rendering sink failure.
    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn controller(msg: impl Into<String>) -> Self {
        Self::Controller(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// The contract failure behind this error, if any.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            Self::Decode(e) => Some(e),
            Self::AttemptsExhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}

fn position_suffix(position: &Option<usize>) -> String {
    position
        .map(|p| format!(" (at character {p})"))
        .unwrap_or_default()
}

fn join_keys(keys: &BTreeSet<String>) -> String {
    if keys.is_empty() {
        return "none".to_string();
    }
    keys.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Cut `s` to `max_chars` characters on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
