use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{BdbError, Result};

use super::{check_status, http_client, parse_json_reply, Provider, ProviderResponse};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions with strict JSON-schema output.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
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
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "response",
                    "strict": true,
                    "schema": schema,
                },
            },
            "temperature": 0,
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
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
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&self.request_body(system_prompt, user_prompt, response_schema))
            .send()
            .await?;
        let body: Value = check_status(response).await?.json().await?;

        let text = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| BdbError::Provider {
                reason: "response has no message content".into(),
            })?;
        Ok(ProviderResponse::new(parse_json_reply(text)?))
    }
}
