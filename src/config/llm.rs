use serde::{Deserialize, Serialize};

/// Which provider backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Openai,
    Anthropic,
    Ollama,
    /// Azure OpenAI: needs `base_url` and `deployment`.
    Azure,
    /// No provider: every fuzzy decision goes through the fallback path.
    None,
}

impl ProviderKind {
    /// Conventional environment variable holding the API key.
    pub fn default_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Openai => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Azure => Some("AZURE_OPENAI_API_KEY"),
            ProviderKind::Ollama | ProviderKind::None => None,
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model name. Each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable to read the API key from.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Override for custom or self-hosted endpoints.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Upper bound on a single provider call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Azure deployment name, used in the request path.
    #[serde(default)]
    pub deployment: Option<String>,

    /// Azure `api-version` query parameter.
    #[serde(default)]
    pub api_version: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            api_key: None,
            api_key_env: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            deployment: None,
            api_version: None,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key: explicit value, then `api_key_env`, then the
    /// provider's conventional variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        if let Some(var) = &self.api_key_env {
            return std::env::var(var).ok().filter(|k| !k.is_empty());
        }
        self.provider
            .default_key_env()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.is_empty())
    }
}
