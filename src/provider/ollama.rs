use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{BdbError, Result};

use super::{
    check_status, http_client, parse_json_reply, schema_instruction, Provider, ProviderResponse,
};

const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Local Ollama server. Needs no key, so it always reports configured.
pub struct OllamaProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(model: Option<String>, base_url: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
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
            "prompt": format!(
                "{system_prompt}{}\nDo not include any text before or after the JSON.\n\nUser: {user_prompt}",
                schema_instruction(schema)
            ),
            "stream": false,
            "format": "json",
            "options": {"temperature": 0},
        })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_schema: &Value,
    ) -> Result<ProviderResponse> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&self.request_body(system_prompt, user_prompt, response_schema))
            .send()
            .await?;
        let body: Value = check_status(response).await?.json().await?;

        let text = body
            .get("response")
            .and_then(Value::as_str)
            .ok_or_else(|| BdbError::Provider {
                reason: "ollama reply has no response field".into(),
            })?;
        Ok(ProviderResponse::new(parse_json_reply(text)?))
    }
}
