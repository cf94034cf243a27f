//! services/api/src/adapters/llm.rs
//!
//! This module contains the adapter for the text-generation engine.
//! It implements the `GenerationEngine` port from the `core` crate using
//! an OpenAI-compatible chat-completions API.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use study_assistant_core::ports::{GenerationEngine, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerationEngine` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiGenerationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerationAdapter {
    /// Creates a new `OpenAiGenerationAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Maps an OpenAI client error onto the port taxonomy. Quota and rate-limit
/// exhaustion get their own variant so callers can distinguish them from
/// transport failures.
fn map_openai_error(error: OpenAIError) -> PortError {
    match error {
        OpenAIError::ApiError(api_error) => {
            let code = api_error.code.as_deref().unwrap_or("");
            if code == "insufficient_quota" || code == "rate_limit_exceeded" {
                PortError::QuotaExceeded
            } else {
                PortError::Generation(api_error.message)
            }
        }
        other => PortError::Generation(other.to_string()),
    }
}

//=========================================================================================
// `GenerationEngine` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerationEngine for OpenAiGenerationAdapter {
    /// Sends the fully rendered prompt as a single user message and returns
    /// the first choice's text content.
    async fn generate(&self, prompt: &str) -> PortResult<String> {
        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| PortError::Generation(e.to_string()))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Generation(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(PortError::Generation(
                    "Generation engine response contained no text content.".to_string(),
                ))
            }
        } else {
            Err(PortError::Generation(
                "Generation engine returned no choices in its response.".to_string(),
            ))
        }
    }
}
