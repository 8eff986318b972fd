//! Process configuration.
//!
//! Read once at startup from the environment (after an optional `.env`)
//! and passed down explicitly. Unset or unparsable values fall back to
//! [`Default`]; only the API key has no default.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use csv_agent_controller::QueryConfig;
use csv_agent_core::{Error, Result};
use csv_agent_gateway::GatewayConfig;
use csv_agent_model_gateway::openai::{OpenAiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// `OPENAI_API_KEY`
    pub api_key: Option<String>,
    /// `OPENAI_BASE_URL`
    pub base_url: String,
    /// `CSV_AGENT_MODEL`
    pub model: String,
    /// `CSV_AGENT_TEMPERATURE`
    pub temperature: f32,
    /// `CSV_AGENT_TIMEOUT_SECS`
    pub timeout_secs: u64,
    /// `CSV_AGENT_MAX_ATTEMPTS`
    pub max_attempts: usize,
    /// `CSV_AGENT_PREVIEW_ROWS`
    pub preview_rows: usize,
    /// `CSV_AGENT_EXCERPT_LEN`
    pub excerpt_len: usize,
    /// `CSV_AGENT_MAX_UPLOAD_BYTES`
    pub max_upload_bytes: usize,
    /// `CSV_AGENT_BIND`
    pub bind: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        let gateway = GatewayConfig::default();
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            timeout_secs: 60,
            max_attempts: gateway.query.max_attempts,
            preview_rows: gateway.preview_rows,
            excerpt_len: gateway.excerpt_len,
            max_upload_bytes: gateway.max_upload_bytes,
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl AppConfig {
    /// Read the process environment. `.env` loading happens before this, in `main`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let text = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        Self {
            api_key: text("OPENAI_API_KEY"),
            base_url: text("OPENAI_BASE_URL").unwrap_or(default.base_url),
            model: text("CSV_AGENT_MODEL").unwrap_or(default.model),
            temperature: parse_or(lookup("CSV_AGENT_TEMPERATURE"), default.temperature),
            timeout_secs: parse_or(lookup("CSV_AGENT_TIMEOUT_SECS"), default.timeout_secs),
            max_attempts: parse_or(lookup("CSV_AGENT_MAX_ATTEMPTS"), default.max_attempts),
            preview_rows: parse_or(lookup("CSV_AGENT_PREVIEW_ROWS"), default.preview_rows),
            excerpt_len: parse_or(lookup("CSV_AGENT_EXCERPT_LEN"), default.excerpt_len),
            max_upload_bytes: parse_or(
                lookup("CSV_AGENT_MAX_UPLOAD_BYTES"),
                default.max_upload_bytes,
            ),
            bind: parse_or(lookup("CSV_AGENT_BIND"), default.bind),
        }
    }

    /// Chat client settings. Fails when no API key is configured.
    pub fn openai(&self) -> Result<OpenAiConfig> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| Error::config("OPENAI_API_KEY is not set"))?;
        Ok(OpenAiConfig::new(api_key)
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .with_temperature(self.temperature)
            .with_timeout(Duration::from_secs(self.timeout_secs)))
    }

    pub fn query(&self) -> QueryConfig {
        QueryConfig {
            max_attempts: self.max_attempts,
        }
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            query: self.query(),
            preview_rows: self.preview_rows,
            excerpt_len: self.excerpt_len,
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}
