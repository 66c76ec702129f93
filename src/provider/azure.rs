use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{BdbError, Result};

use super::{check_status, http_client, parse_json_reply, Provider, ProviderResponse};

const DEFAULT_API_VERSION: &str = "2024-08-01-preview";

/// Azure OpenAI deployment. The deployment name selects the model, so the
/// request body carries no `model` field.
pub struct AzureOpenAiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: Option<String>,
    deployment: Option<String>,
    api_version: String,
}

impl AzureOpenAiProvider {
    pub fn new(
        api_key: Option<String>,
        endpoint: Option<String>,
        deployment: Option<String>,
        api_version: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.filter(|k| !k.is_empty()),
            endpoint: endpoint
                .map(|e| e.trim_end_matches('/').to_string())
                .filter(|e| !e.is_empty()),
            deployment: deployment.filter(|d| !d.is_empty()),
            api_version: api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        })
    }

    fn url(&self, endpoint: &str, deployment: &str) -> String {
        format!(
            "{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={}",
            self.api_version
        )
    }

    fn request_body(&self, system_prompt: &str, user_prompt: &str, schema: &Value) -> Value {
        json!({
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

fn missing(what: &str) -> BdbError {
    BdbError::Provider {
        reason: format!("no {what} configured"),
    }
}

#[async_trait]
impl Provider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.endpoint.is_some() && self.deployment.is_some()
    }

    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_schema: &Value,
    ) -> Result<ProviderResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| missing("API key"))?;
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| missing("base_url (Azure endpoint)"))?;
        let deployment = self
            .deployment
            .as_deref()
            .ok_or_else(|| missing("deployment"))?;

        let response = self
            .client
            .post(self.url(endpoint, deployment))
            .header("api-key", api_key)
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
