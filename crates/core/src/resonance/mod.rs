mod block;
mod filtering;
mod labeling;
mod retrieval;
mod rewrite;
mod seed;

pub use filtering::effective_timestamp;
pub use labeling::Flashback;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use plastmem_completion::{CompletionGateway, ModelDescriptor};
use plastmem_graph::GraphAdapter;
use plastmem_shared::AppError;

use crate::config::resonance_skipped;
use crate::echo_buffer::EchoBuffer;
use crate::identity_bundle::IdentityBundle;

/// Everything the pipeline needs to process one turn.
pub struct TurnInput<'a> {
  pub current_prompt: &'a str,
  /// Last <= 20 non-system turns, oldest first.
  pub recent_messages: &'a [String],
  pub story_context: Option<&'a str>,
  pub identity: &'a IdentityBundle,
  /// The earliest timestamp currently visible in the live chat window.
  pub oldest_context_timestamp: DateTime<Utc>,
}

/// Produces a `ResonanceBlock` for the current turn, or the empty string if nothing
/// resonates. Single-threaded per turn — internal phases fan out concurrently,
/// but the `EchoBuffer` and sort tie-breaks are serialized through the `&mut self` borrow.
pub struct ResonancePipeline {
  graph: Arc<dyn GraphAdapter>,
  gateway: Option<Arc<dyn CompletionGateway>>,
  model: ModelDescriptor,
  scope: String,
  echo: Mutex<EchoBuffer>,
  rewrite_enabled: bool,
}

impl ResonancePipeline {
  #[must_use]
  pub fn new(graph: Arc<dyn GraphAdapter>, gateway: Option<Arc<dyn CompletionGateway>>, model: ModelDescriptor, scope: impl Into<String>) -> Self {
    Self { graph, gateway, model, scope: scope.into(), echo: Mutex::new(EchoBuffer::default()), rewrite_enabled: true }
  }

  #[must_use]
  pub fn with_rewrite_enabled(mut self, enabled: bool) -> Self {
    self.rewrite_enabled = enabled;
    self
  }

  /// Runs all six phases (state machine: `Idle -> ExtractingSeeds -> SearchingGraph ->
  /// Filtering -> (Rewriting | Fallback) -> Emitting -> Idle`). Any phase may short-circuit
  /// to an empty result — that's a normal outcome, not an error.
  pub async fn run(&self, input: TurnInput<'_>) -> Result<String, AppError> {
    if resonance_skipped() {
      tracing::debug!("MIND_SKIP_RESONANCE set, bypassing resonance pipeline");
      return Ok(String::new());
    }

    tracing::debug!("resonance phase: ExtractingSeeds");
    let queries = seed::extract_seed_queries(
      input.current_prompt,
      input.recent_messages,
      input.story_context,
      self.gateway.as_deref().map(|g| g as &dyn CompletionGateway),
      &self.model,
    )
    .await;

    if queries.is_empty() {
      return Ok(String::new());
    }

    tracing::debug!(?queries, "resonance phase: SearchingGraph");
    let results = retrieval::search_all(&queries, Arc::clone(&self.graph), &self.scope).await;
    if results.is_empty() {
      return Ok(String::new());
    }

    tracing::debug!("resonance phase: Filtering");
    let now = Utc::now();
    let results = filtering::memory_horizon_filter(results, input.oldest_context_timestamp);

    let results = {
      let mut echo = self.echo.lock().expect("echo buffer mutex poisoned");
      filtering::echo_filter(results, &mut echo)
    };

    let old_first: bool = rand::random();
    let results = filtering::priority_sort(results, old_first);
    let groups = filtering::cap_and_clean(results);

    if groups.is_empty() {
      return Ok(String::new());
    }

    let labeled_groups: Vec<(String, Vec<Flashback>)> = groups
      .into_iter()
      .map(|(query, items)| (query, items.into_iter().map(|r| labeling::label(r, now)).collect()))
      .collect();

    tracing::debug!("resonance phase: {}", if self.rewrite_enabled { "Rewriting" } else { "Fallback" });
    let gateway = if self.rewrite_enabled { self.gateway.as_deref() } else { None };
    let blocks = rewrite::rewrite_groups(labeled_groups, input.identity, input.current_prompt, gateway, &self.model).await;

    tracing::debug!("resonance phase: Emitting");
    Ok(block::wrap(&blocks))
  }
}
