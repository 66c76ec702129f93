//! Language-model providers behind one capability trait.
//!
//! A provider takes a system prompt, a user prompt and a JSON schema, and
//! returns the model's structured reply as a JSON value. Transport and parse
//! failures come back as `Err`; callers never confuse them with a verdict.

pub mod anthropic;
pub mod azure;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{LlmConfig, ProviderKind};
use crate::error::{BdbError, Result};

pub use anthropic::AnthropicProvider;
pub use azure::AzureOpenAiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Parsed structured reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub content: Value,
}

impl ProviderResponse {
    pub fn new(content: Value) -> Self {
        Self { content }
    }

    /// String field, or `None` when missing or not a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Value::as_str)
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn is_configured(&self) -> bool;

    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_schema: &Value,
    ) -> Result<ProviderResponse>;
}

/// Run one call under a deadline. A timeout is a provider failure.
pub async fn call_bounded(
    provider: &dyn Provider,
    timeout: Duration,
    system_prompt: &str,
    user_prompt: &str,
    response_schema: &Value,
) -> Result<ProviderResponse> {
    tracing::debug!(
        provider = provider.name(),
        prompt_len = user_prompt.len(),
        "calling provider"
    );
    match tokio::time::timeout(
        timeout,
        provider.call(system_prompt, user_prompt, response_schema),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(BdbError::ProviderTimeout {
            timeout_secs: timeout.as_secs(),
        }),
    }
}

/// Build the configured provider. `None` when the config opts out.
pub fn from_config(config: &LlmConfig) -> Result<Option<Arc<dyn Provider>>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let provider: Arc<dyn Provider> = match config.provider {
        ProviderKind::None => return Ok(None),
        ProviderKind::Openai => Arc::new(OpenAiProvider::new(
            config.resolve_api_key(),
            config.model.clone(),
            config.base_url.clone(),
            timeout,
        )?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
            config.resolve_api_key(),
            config.model.clone(),
            config.base_url.clone(),
            timeout,
        )?),
        ProviderKind::Azure => Arc::new(AzureOpenAiProvider::new(
            config.resolve_api_key(),
            config.base_url.clone(),
            config.deployment.clone(),
            config.api_version.clone(),
            timeout,
        )?),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(
            config.model.clone(),
            config.base_url.clone(),
            timeout,
        )?),
    };
    Ok(Some(provider))
}

/// JSON schema for a response type, without the `$schema` meta key.
pub fn response_schema<T: schemars::JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(schema).unwrap_or_default();
    if let Some(map) = value.as_object_mut() {
        map.remove("$schema");
    }
    value
}

/// Appended to the system prompt by providers without native schema support.
pub(crate) fn schema_instruction(schema: &Value) -> String {
    let pretty = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!("\n\nRespond with valid JSON only, matching this schema:\n{pretty}")
}

/// Parse model text as a JSON object, tolerating a fenced code block.
pub(crate) fn parse_json_reply(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    let value: Value = serde_json::from_str(body).map_err(|e| BdbError::Provider {
        reason: format!("invalid JSON in model reply: {e}"),
    })?;
    if !value.is_object() {
        return Err(BdbError::Provider {
            reason: "model reply is not a JSON object".into(),
        });
    }
    Ok(value)
}

/// Turn a non-success HTTP response into [`BdbError::Api`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "failed to read error body".to_string());
    Err(BdbError::Api {
        status: status.as_u16(),
        body,
    })
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("bdb/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
