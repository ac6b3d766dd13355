use plastmem_shared::AppError;

use crate::{CompletionGateway, CompletionRequest, CompletionResponse, ModelDescriptor};

/// Caller-configurable failover policy layered on top of `CompletionGateway::complete`.
/// Failovers beyond the single retry here are the caller's responsibility.
#[derive(Debug, Clone)]
pub struct FailoverPolicy {
  /// Providers for which a primary-model error event is eligible for failover.
  pub eligible_providers: Vec<String>,
  pub fallback_model: ModelDescriptor,
  pub fallback_temperature: f32,
}

impl FailoverPolicy {
  #[must_use]
  pub fn new(fallback_model: ModelDescriptor) -> Self {
    Self { eligible_providers: Vec::new(), fallback_model, fallback_temperature: 0.3 }
  }

  #[must_use]
  pub fn eligible_for(&self, provider: &str) -> bool {
    self.eligible_providers.iter().any(|p| p == provider)
  }
}

/// Runs `request` against `gateway`; if the primary model emits an error event on a
/// failover-eligible provider and the collected text is empty, retries once against the
/// policy's fallback model at temperature 0.3.
pub async fn complete_with_failover(
  gateway: &dyn CompletionGateway,
  request: CompletionRequest,
  policy: &FailoverPolicy,
) -> Result<CompletionResponse, AppError> {
  let provider = request.model.provider.clone();
  let prompt = request.prompt.clone();
  let response = gateway.complete(request).await?;

  if response.is_empty_with_error() && policy.eligible_for(&provider) {
    tracing::warn!(provider, "primary completion failed, retrying on fallback model");
    let fallback_request =
      CompletionRequest::new(prompt, policy.fallback_model.clone(), policy.fallback_temperature);
    return gateway.complete(fallback_request).await;
  }

  Ok(response)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::CompletionErrorKind;
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct FlakyGateway {
    calls: AtomicUsize,
  }

  #[async_trait]
  impl CompletionGateway for FlakyGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AppError> {
      let call = self.calls.fetch_add(1, Ordering::SeqCst);
      if call == 0 {
        Ok(CompletionResponse { text: String::new(), error_kind: Some(CompletionErrorKind::RateLimit) })
      } else {
        Ok(CompletionResponse { text: format!("ok from {}", request.model.model), error_kind: None })
      }
    }
  }

  #[tokio::test]
  async fn non_eligible_provider_does_not_retry() {
    let gateway = FlakyGateway { calls: AtomicUsize::new(0) };
    let policy = FailoverPolicy::new(ModelDescriptor::new("openai", "fallback"));
    let req = CompletionRequest::new("hi", ModelDescriptor::new("other", "primary"), 0.0);
    let resp = complete_with_failover(&gateway, req, &policy).await.unwrap();
    assert!(resp.error_kind.is_some());
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn eligible_provider_retries_on_fallback() {
    let gateway = FlakyGateway { calls: AtomicUsize::new(0) };
    let mut policy = FailoverPolicy::new(ModelDescriptor::new("openai", "fallback-model"));
    policy.eligible_providers.push("openai".to_owned());
    let req = CompletionRequest::new("remember Julio's birthday", ModelDescriptor::new("openai", "primary-model"), 0.0);

    let resp = complete_with_failover(&gateway, req, &policy).await.unwrap();

    assert_eq!(resp.text, "ok from fallback-model");
    assert!(resp.error_kind.is_none());
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
  }
}
