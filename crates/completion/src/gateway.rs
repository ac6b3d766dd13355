use plastmem_shared::AppError;

/// Identifies a model for a single completion call, plus the provider it's bound to so a
/// `FailoverPolicy` can decide eligibility without the gateway leaking its own internals.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
  pub provider: String,
  pub model: String,
}

impl ModelDescriptor {
  #[must_use]
  pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
    Self { provider: provider.into(), model: model.into() }
  }
}

/// A single-prompt streaming text completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
  pub prompt: String,
  pub model: ModelDescriptor,
  pub temperature: f32,
}

impl CompletionRequest {
  #[must_use]
  pub fn new(prompt: impl Into<String>, model: ModelDescriptor, temperature: f32) -> Self {
    Self { prompt: prompt.into(), model, temperature }
  }
}

/// Provider-classified error surfaced as an event rather than thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionErrorKind {
  RateLimit,
  Auth,
  Billing,
  InvalidRequest,
  Unknown(String),
}

/// Output of a completion call. A stream chunk carrying `type == "error"` surfaces here as
/// `error_kind` instead of propagating as an `Err` — only a transport-level failure that
/// prevents any response at all returns `Err(AppError)` from `complete`.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
  pub text: String,
  pub error_kind: Option<CompletionErrorKind>,
}

impl CompletionResponse {
  #[must_use]
  pub fn is_empty_with_error(&self) -> bool {
    self.text.trim().is_empty() && self.error_kind.is_some()
  }
}

/// A single-prompt, streaming text completion capability.
#[async_trait::async_trait]
pub trait CompletionGateway: Send + Sync {
  async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AppError>;
}
