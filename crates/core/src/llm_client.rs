use crate::{
    error::GenerationError,
    prompt::{PromptMessage, PromptRole},
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// A stream of text fragments from the LLM.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

/// A token-streaming chat completion backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Opens a streaming completion for the given messages.
    ///
    /// Implementations yield only non-empty fragments and report transport or
    /// API failures as [`GenerationError::Backend`].
    async fn stream_completion(
        &self,
        messages: Vec<PromptMessage>,
    ) -> Result<CompletionStream, GenerationError>;
}

/// Sampling parameters for a chat completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            temperature: 1.0,
        }
    }
}

/// An implementation of `CompletionBackend` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
    params: CompletionParams,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The specific model identifier to use for chat completions (e.g., "gpt-3.5-turbo").
    /// * `params` - Token limit and temperature applied to every request.
    pub fn new(config: OpenAIConfig, model: String, params: CompletionParams) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            params,
        }
    }
}

fn backend_error(err: OpenAIError) -> GenerationError {
    GenerationError::Backend(err.to_string())
}

fn to_request_messages(
    messages: Vec<PromptMessage>,
) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
    messages
        .into_iter()
        .map(|msg| {
            Ok(match msg.role {
                PromptRole::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.content)
                    .build()?
                    .into(),
                PromptRole::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content)
                    .build()?
                    .into(),
                PromptRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.content)
                    .build()?
                    .into(),
            })
        })
        .collect()
}

#[async_trait]
impl CompletionBackend for OpenAICompatibleClient {
    async fn stream_completion(
        &self,
        messages: Vec<PromptMessage>,
    ) -> Result<CompletionStream, GenerationError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(to_request_messages(messages).map_err(backend_error)?)
            .max_completion_tokens(self.params.max_tokens)
            .temperature(self.params.temperature)
            .stream(true)
            .build()
            .map_err(backend_error)?;

        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(backend_error)?;

        Ok(Box::pin(stream.filter_map(|result| async move {
            match result {
                Ok(response) => response
                    .choices
                    .first()
                    .and_then(|choice| choice.delta.content.clone())
                    .filter(|content| !content.is_empty())
                    .map(Ok),
                Err(e) => Some(Err(backend_error(e))),
            }
        })))
    }
}
