// Contract-Drafter: LLM Provider
// Concrete `ChatModel` backed by:
// - Cerebras: via cerebras-rs (native high-speed client)
// - Anthropic: via rig-core
// - OpenAI/OpenRouter/Compatible: via rig-core with custom base_url

use super::ChatModel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;

/// Supported LLM providers
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub enum ProviderType {
    #[default]
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "cerebras")]
    Cerebras,
    /// OpenRouter.ai - unified API for multiple models
    #[serde(rename = "openrouter")]
    OpenRouter,
    /// Any OpenAI-compatible API (requires base_url)
    #[serde(rename = "openai_compatible")]
    OpenAICompatible,
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            "cerebras" => Ok(ProviderType::Cerebras),
            "openrouter" => Ok(ProviderType::OpenRouter),
            "openai_compatible" => Ok(ProviderType::OpenAICompatible),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderType,
    pub model: String,
    /// Never written back out; keys come from the environment or the config file.
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::OpenAI,
            model: "gpt-4o".to_string(),
            api_key: env::var("OPENAI_API_KEY").ok(),
            base_url: None,
            temperature: 0.5,
            max_tokens: 4096,
        }
    }
}

impl LlmConfig {
    /// Preset for a provider. An OpenAI-compatible preset points at a local
    /// server until a `base_url` is configured.
    pub fn for_provider(provider: ProviderType) -> Self {
        match provider {
            ProviderType::OpenAI => Self::default(),
            ProviderType::Anthropic => Self::anthropic(),
            ProviderType::Cerebras => Self::cerebras(),
            ProviderType::OpenRouter => Self::openrouter(),
            ProviderType::OpenAICompatible => Self::openai_compatible(
                "http://localhost:8080/v1",
                "local",
                env::var("OPENAI_API_KEY").ok(),
            ),
        }
    }

    /// Cerebras configuration using cerebras-rs native client
    pub fn cerebras() -> Self {
        Self {
            provider: ProviderType::Cerebras,
            model: "llama-3.3-70b".to_string(),
            api_key: env::var("CEREBRAS_API_KEY").ok(),
            base_url: None,
            temperature: 0.5,
            max_tokens: 8192,
        }
    }

    /// Anthropic Claude configuration
    pub fn anthropic() -> Self {
        Self {
            provider: ProviderType::Anthropic,
            model: "claude-3-5-haiku-latest".to_string(),
            api_key: env::var("ANTHROPIC_API_KEY").ok(),
            base_url: None,
            temperature: 0.5,
            max_tokens: 4096,
        }
    }

    /// OpenRouter configuration (access multiple models via one API)
    pub fn openrouter() -> Self {
        Self {
            provider: ProviderType::OpenRouter,
            model: "anthropic/claude-3.5-haiku".to_string(),
            api_key: env::var("OPENROUTER_API_KEY").ok(),
            base_url: Some("https://openrouter.ai/api/v1".to_string()),
            temperature: 0.5,
            max_tokens: 4096,
        }
    }

    /// Custom OpenAI-compatible API (e.g., local LLM servers)
    pub fn openai_compatible(base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            provider: ProviderType::OpenAICompatible,
            model: model.to_string(),
            api_key,
            base_url: Some(base_url.to_string()),
            temperature: 0.5,
            max_tokens: 4096,
        }
    }

    /// Fill a missing API key from the provider's conventional env var.
    pub fn with_env_key(mut self) -> Self {
        if self.api_key.is_none() {
            let var = match self.provider {
                ProviderType::OpenAI | ProviderType::OpenAICompatible => "OPENAI_API_KEY",
                ProviderType::Anthropic => "ANTHROPIC_API_KEY",
                ProviderType::Cerebras => "CEREBRAS_API_KEY",
                ProviderType::OpenRouter => "OPENROUTER_API_KEY",
            };
            self.api_key = env::var(var).ok();
        }
        self
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: &str) -> Self {
        Self { role: Role::System, content: content.to_string() }
    }

    pub fn user(content: &str) -> Self {
        Self { role: Role::User, content: content.to_string() }
    }

    pub fn assistant(content: &str) -> Self {
        Self { role: Role::Assistant, content: content.to_string() }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// LLM response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub tokens_used: Option<u32>,
    pub finish_reason: Option<String>,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>, model: &str) -> Self {
        Self {
            content: content.into(),
            model: model.to_string(),
            tokens_used: None,
            finish_reason: Some("stop".to_string()),
        }
    }
}

/// Build a rig agent from `$config` on `$client` and send one prompt
macro_rules! rig_prompt {
    ($client:expr, $config:expr, $system:expr, $user:expr) => {{
        use rig::completion::Prompt;
        let agent = $client
            .agent(&$config.model)
            .preamble($system)
            .temperature($config.temperature as f64)
            .max_tokens($config.max_tokens as u64)
            .build();
        agent.prompt($user).await.map_err(anyhow::Error::from)
    }};
}

/// Multi-provider chat model
#[derive(Debug, Clone)]
pub struct LlmProvider {
    config: LlmConfig,
}

impl LlmProvider {
    pub fn new(config: LlmConfig) -> Result<Self, anyhow::Error> {
        if config.api_key.is_none() {
            anyhow::bail!("API key not configured for {:?}", config.provider);
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str, anyhow::Error> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("API key not configured for {:?}", self.config.provider))
    }

    /// One preamble plus one prompt against the configured backend
    async fn call_llm(&self, system: &str, user: &str) -> Result<String, anyhow::Error> {
        use rig::client::{CompletionClient, ProviderClient};
        use rig::providers::{anthropic, openai, openrouter};

        let key = self.api_key()?;
        match self.config.provider {
            ProviderType::Cerebras => self.call_cerebras(key, system, user).await,
            ProviderType::Anthropic => {
                // rig-core's anthropic client only reads its key from the environment
                std::env::set_var("ANTHROPIC_API_KEY", key);
                let client = anthropic::Client::from_env();
                rig_prompt!(client, self.config, system, user)
            }
            ProviderType::OpenRouter => {
                let client: openrouter::Client = openrouter::Client::new(key)?;
                rig_prompt!(client, self.config, system, user)
            }
            ProviderType::OpenAI => {
                let client: openai::Client = openai::Client::new(key)?;
                rig_prompt!(client, self.config, system, user)
            }
            ProviderType::OpenAICompatible => {
                let base_url = self
                    .config
                    .base_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("base_url required for an OpenAI-compatible provider"))?;
                let client: openai::Client =
                    openai::Client::builder().api_key(key).base_url(base_url).build()?;
                rig_prompt!(client, self.config, system, user)
            }
        }
    }

    /// Cerebras through the native cerebras-rs client
    async fn call_cerebras(&self, key: &str, system: &str, user: &str) -> Result<String, anyhow::Error> {
        use cerebras_rs::{ChatCompletionRequest, Client, ModelIdentifier};

        let model = match self.config.model.as_str() {
            "llama-3.1-8b" | "llama3.1-8b" => ModelIdentifier::Llama3Period18b,
            "llama-3.3-70b" | "llama3.3-70b" => ModelIdentifier::Llama3Period370b,
            "qwen-3-32b" | "qwen3-32b" => ModelIdentifier::Qwen332b,
            other => {
                log::debug!("No Cerebras identifier for '{}', using Llama 4 Scout", other);
                ModelIdentifier::Llama4Scout17b16eInstruct
            }
        };
        let request = ChatCompletionRequest::builder(model)
            .system_message(system)
            .user_message(user)
            .temperature(self.config.temperature as f64)
            .max_tokens(self.config.max_tokens)
            .build();

        let response = Client::new(key).chat_completion(request).await?;
        let content = response
            .choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .map(|message| message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            anyhow::bail!("Cerebras returned no message content");
        }
        Ok(content)
    }
}

#[async_trait]
impl ChatModel for LlmProvider {
    /// The providers take a single preamble and a single prompt, so the
    /// system turns are joined into the preamble and every non-system turn
    /// is replayed in order, labelled when it is not a user turn.
    async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse, anyhow::Error> {
        let system_prompt = messages.iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let conversation = messages.iter()
            .filter(|m| m.role != Role::System)
            .map(|m| match m.role {
                Role::Assistant => format!("Assistant: {}", m.content),
                _ => m.content.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        if conversation.trim().is_empty() {
            anyhow::bail!("No user content to send to {:?}", self.config.provider);
        }

        log::debug!(
            "Calling {:?} model {} ({} messages)",
            self.config.provider,
            self.config.model,
            messages.len()
        );

        let content = self.call_llm(&system_prompt, &conversation).await?;

        Ok(LlmResponse::text(content, &self.config.model))
    }
}
