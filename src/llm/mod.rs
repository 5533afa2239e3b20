//! LLM integration.
//!
//! The intake flow only needs plain chat completions, so the provider seam is
//! a single `complete()` call. Production traffic goes to Groq through
//! rig-core, bridged to `LlmProvider` by `RigAdapter`.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Default Groq endpoint root (OpenAI-compatible).
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub api_base: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::groq;

    if config.model.trim().is_empty() {
        return Err(LlmError::RequestFailed {
            provider: "groq".to_string(),
            reason: "model name is empty".to_string(),
        });
    }

    let client: groq::Client = groq::Client::builder()
        .api_key(config.api_key.expose_secret())
        .base_url(config.api_base.trim_end_matches('/'))
        .build()
        .map_err(|e| LlmError::RequestFailed {
            provider: "groq".to_string(),
            reason: format!("Failed to create Groq client: {}", e),
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Groq (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new(model, &config.model, "groq")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_constructs_without_network() {
        // rig-core clients accept any string as API key at construction time.
        let config = LlmConfig {
            api_key: secrecy::SecretString::from("gsk-test"),
            model: "llama-3.1-8b-instant".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "llama-3.1-8b-instant");
    }

    #[test]
    fn test_create_provider_rejects_blank_model() {
        let config = LlmConfig {
            api_key: secrecy::SecretString::from("gsk-test"),
            model: "  ".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        };
        assert!(create_provider(&config).is_err());
    }
}
