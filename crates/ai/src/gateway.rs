use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;
use plastmem_completion::{CompletionErrorKind, CompletionGateway, CompletionRequest, CompletionResponse};
use plastmem_shared::AppError;

use crate::env::APP_ENV;

/// `CompletionGateway` over `async-openai`'s streaming chat completion API. Chunk-level
/// transport errors are classified into `CompletionErrorKind` and surfaced as `error_kind`
/// rather than propagated as `Err` — only a failure to start the stream at all does that.
pub struct OpenAiCompletionGateway {
  client: Client<OpenAIConfig>,
}

impl Default for OpenAiCompletionGateway {
  fn default() -> Self {
    let config = OpenAIConfig::new().with_api_key(&APP_ENV.openai_api_key).with_api_base(&APP_ENV.openai_base_url);
    Self { client: Client::with_config(config) }
  }
}

impl OpenAiCompletionGateway {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }
}

fn classify(err: &OpenAIError) -> CompletionErrorKind {
  let message = err.to_string().to_lowercase();
  if message.contains("rate limit") || message.contains("429") {
    CompletionErrorKind::RateLimit
  } else if message.contains("invalid_api_key") || message.contains("authentication") || message.contains("401") {
    CompletionErrorKind::Auth
  } else if message.contains("quota") || message.contains("billing") || message.contains("insufficient") {
    CompletionErrorKind::Billing
  } else if message.contains("invalid_request") || message.contains("400") {
    CompletionErrorKind::InvalidRequest
  } else {
    CompletionErrorKind::Unknown(err.to_string())
  }
}

#[async_trait]
impl CompletionGateway for OpenAiCompletionGateway {
  async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AppError> {
    let messages: Vec<ChatCompletionRequestMessage> = vec![ChatCompletionRequestUserMessageArgs::default()
      .content(request.prompt)
      .build()
      .map_err(AppError::new)?
      .into()];

    let openai_request = CreateChatCompletionRequestArgs::default()
      .model(&request.model.model)
      .temperature(request.temperature)
      .messages(messages)
      .stream(true)
      .build()
      .map_err(AppError::new)?;

    let mut stream = self.client.chat().create_stream(openai_request).await.map_err(AppError::new)?;

    let mut text = String::new();
    let mut error_kind = None;

    while let Some(chunk) = stream.next().await {
      match chunk {
        Ok(response) => {
          for choice in response.choices {
            if let Some(delta) = choice.delta.content {
              text.push_str(&delta);
            }
          }
        }
        Err(err) => {
          tracing::warn!(%err, "completion stream emitted an error event");
          error_kind = Some(classify(&err));
          break;
        }
      }
    }

    Ok(CompletionResponse { text, error_kind })
  }
}
