use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{BdbError, Result};

use super::{
    check_status, http_client, parse_json_reply, schema_instruction, Provider, ProviderResponse,
};

const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Anthropic Messages API. The schema travels in the system prompt.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn request_body(&self, system_prompt: &str, user_prompt: &str, schema: &Value) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": format!("{system_prompt}{}", schema_instruction(schema)),
            "messages": [
                {"role": "user", "content": user_prompt},
            ],
        })
    }
}

/// Concatenate the text blocks of a Messages API reply.
fn reply_text(body: &Value) -> String {
    body.get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_schema: &Value,
    ) -> Result<ProviderResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| BdbError::Provider {
            reason: "no API key configured".into(),
        })?;

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.request_body(system_prompt, user_prompt, response_schema))
            .send()
            .await?;
        let body: Value = check_status(response).await?.json().await?;

        Ok(ProviderResponse::new(parse_json_reply(&reply_text(&body))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_appended_to_system_prompt() {
        let provider =
            AnthropicProvider::new(Some("k".into()), None, None, Duration::from_secs(1)).unwrap();
        let body = provider.request_body("You supervise.", "cmd", &json!({"type": "object"}));
        let system = body["system"].as_str().unwrap();
        assert!(system.starts_with("You supervise."));
        assert!(system.contains("\"type\": \"object\""));
        assert_eq!(body["max_tokens"], MAX_TOKENS);
    }

    #[test]
    fn joins_text_blocks() {
        let body = json!({"content": [
            {"type": "text", "text": "{\"decision\":"},
            {"type": "text", "text": " \"allow\"}"}
        ]});
        assert_eq!(reply_text(&body), "{\"decision\": \"allow\"}");
    }
}
