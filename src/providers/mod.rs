use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::config::ProviderSettings;
use crate::error::ProviderError;

pub mod openai;

use openai::OpenAIProvider;

/// Options for a single generation call, resolved from configuration
/// defaults and per-request overrides.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait representing a hosted LLM provider.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Send a prompt to the provider and return the response text.
    async fn generate(
        &self,
        prompt: &str,
        options: &ProviderOptions,
    ) -> Result<String, ProviderError>;
}

/// Build the provider named in the settings. One implementation ships;
/// adding a second means adding a match arm here.
pub fn create_provider(settings: &ProviderSettings) -> Result<Box<dyn LLMProvider>> {
    match settings.name.as_str() {
        "openai" => Ok(Box::new(OpenAIProvider::new(settings)?)),
        other => bail!("Unsupported AI provider: {}", other),
    }
}
