//! LLM completion client abstraction.
//!
//! Every tool and the synthesis pass go through this seam, so the agent core
//! stays deterministic and testable with stub implementations.

mod openai;

pub use openai::OpenAiLlm;

use crate::config::LlmSettings;
use crate::error::Result;
use async_trait::async_trait;

/// Options for a single completion call.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Model to use.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl CompletionOptions {
    /// Build options from LLM settings.
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::from_settings(&LlmSettings::default())
    }
}

/// Trait for LLM completion clients.
///
/// Fails with `PuggError::Provider` on network/HTTP failure and
/// `PuggError::RateLimited` on quota exhaustion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for a single prompt.
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String>;
}
