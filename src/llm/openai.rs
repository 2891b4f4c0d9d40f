//! OpenAI-backed LLM client.

use super::{CompletionOptions, LlmClient};
use crate::error::{PuggError, Result};
use crate::openai::create_client;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// OpenAI chat-completions client.
pub struct OpenAiLlm {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    system_prompt: String,
    fallback_model: Option<String>,
}

impl OpenAiLlm {
    /// Create a new client with the given system identity prompt.
    pub fn new(system_prompt: &str) -> Self {
        Self {
            client: create_client(),
            system_prompt: system_prompt.to_string(),
            fallback_model: None,
        }
    }

    /// Set a fallback model tried once when the primary model fails with a
    /// provider error. Rate limits are not retried.
    pub fn with_fallback_model(mut self, model: Option<String>) -> Self {
        self.fallback_model = model;
        self
    }

    async fn complete_with_model(
        &self,
        model: &str,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt.clone())
                .build()
                .map_err(|e| PuggError::Provider(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PuggError::Provider(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .max_tokens(options.max_tokens)
            .temperature(options.temperature)
            .build()
            .map_err(|e| PuggError::Provider(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| PuggError::Provider("Empty response from model".to_string()))?
            .clone();

        debug!("Completion from {} ({} chars)", model, answer.len());
        Ok(answer)
    }
}

#[async_trait]
impl LlmClient for OpenAiLlm {
    #[instrument(skip(self, prompt), fields(model = %options.model))]
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String> {
        match self.complete_with_model(&options.model, prompt, options).await {
            Ok(answer) => Ok(answer),
            Err(e @ PuggError::RateLimited(_)) => Err(e),
            Err(e) => {
                if let Some(fallback) = &self.fallback_model {
                    warn!("Model {} failed ({}), trying fallback {}", options.model, e, fallback);
                    self.complete_with_model(fallback, prompt, options).await
                } else {
                    Err(e)
                }
            }
        }
    }
}

/// Map an async-openai error into the Pugg error taxonomy.
fn map_openai_error(err: OpenAIError) -> PuggError {
    match err {
        OpenAIError::ApiError(api) => {
            classify_api_error(api.r#type.as_deref().unwrap_or_default(), &api.message)
        }
        other => PuggError::Provider(other.to_string()),
    }
}

/// Classify an API error by its type tag: quota exhaustion is `RateLimited`,
/// everything else is `Provider`.
fn classify_api_error(kind: &str, message: &str) -> PuggError {
    if kind.contains("rate_limit") || kind.contains("insufficient_quota") {
        PuggError::RateLimited(message.to_string())
    } else {
        PuggError::Provider(message.to_string())
    }
}
