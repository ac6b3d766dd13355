//! In-crate mock capability implementations, kept close to the code under test rather than
//! pulling in a mocking-macro framework.
#![cfg(test)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plastmem_completion::{CompletionErrorKind, CompletionGateway, CompletionRequest, CompletionResponse};
use plastmem_graph::{Episode, GraphAdapter, MemoryResult, MemoryResultKind};
use plastmem_shared::AppError;

/// An in-memory `GraphAdapter` fixture: substring-matching "search" over seeded fixtures,
/// and an append-only episode log. Good enough to exercise the pipeline's control flow
/// without a real Graphiti/FalkorDB/Postgres backend.
#[derive(Default)]
pub struct FixtureGraphAdapter {
  nodes: Mutex<Vec<MemoryResult>>,
  facts: Mutex<Vec<MemoryResult>>,
  episodes: Mutex<Vec<(String, Episode)>>,
}

impl FixtureGraphAdapter {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn seed_node(&self, content: &str, timestamp: Option<DateTime<Utc>>) {
    self.nodes.lock().unwrap().push(MemoryResult {
      content: content.to_owned(),
      timestamp,
      uuid: None,
      kind: MemoryResultKind::Node,
      boosted: false,
      source_query: String::new(),
    });
  }

  pub fn seed_fact(&self, content: &str, timestamp: Option<DateTime<Utc>>) {
    self.facts.lock().unwrap().push(MemoryResult {
      content: content.to_owned(),
      timestamp,
      uuid: None,
      kind: MemoryResultKind::Fact,
      boosted: false,
      source_query: String::new(),
    });
  }

  #[must_use]
  pub fn episode_count(&self) -> usize {
    self.episodes.lock().unwrap().len()
  }
}

fn matches(content: &str, query: &str) -> bool {
  query.split_whitespace().any(|word| content.to_lowercase().contains(&word.to_lowercase()))
}

#[async_trait]
impl GraphAdapter for FixtureGraphAdapter {
  async fn add_episode(&self, scope: &str, episode: Episode) -> Result<(), AppError> {
    self.episodes.lock().unwrap().push((scope.to_owned(), episode));
    Ok(())
  }

  async fn search_nodes(&self, _scope: &str, query: &str) -> Result<Vec<MemoryResult>, AppError> {
    Ok(self.nodes.lock().unwrap().iter().filter(|r| matches(&r.content, query)).cloned().collect())
  }

  async fn search_facts(&self, _scope: &str, query: &str) -> Result<Vec<MemoryResult>, AppError> {
    Ok(self.facts.lock().unwrap().iter().filter(|r| matches(&r.content, query)).cloned().collect())
  }

  async fn episodes_since(&self, scope: &str, since: DateTime<Utc>, limit: Option<u64>) -> Result<Vec<Episode>, AppError> {
    let episodes = self.episodes.lock().unwrap();
    let mut matching: Vec<Episode> = episodes
      .iter()
      .filter(|(s, e)| s == scope && e.created_at > since)
      .map(|(_, e)| e.clone())
      .collect();
    matching.sort_by_key(|e| e.created_at);
    if let Some(limit) = limit {
      matching.truncate(limit as usize);
    }
    Ok(matching)
  }
}

/// A scripted `CompletionGateway`: returns queued responses in order, repeating the last one
/// once exhausted. Useful for asserting what the consolidation/rewrite prompts produce without
/// a live model.
pub struct ScriptedGateway {
  responses: Mutex<Vec<CompletionResponse>>,
  pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
  #[must_use]
  pub fn new(responses: Vec<&str>) -> Self {
    Self {
      responses: Mutex::new(responses.into_iter().map(|text| CompletionResponse { text: text.to_owned(), error_kind: None }).collect()),
      prompts: Mutex::new(Vec::new()),
    }
  }

  #[must_use]
  pub fn always_empty_error() -> Self {
    Self {
      responses: Mutex::new(vec![CompletionResponse { text: String::new(), error_kind: Some(CompletionErrorKind::Unknown("boom".to_owned())) }]),
      prompts: Mutex::new(Vec::new()),
    }
  }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
  async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AppError> {
    self.prompts.lock().unwrap().push(request.prompt);
    let mut responses = self.responses.lock().unwrap();
    if responses.len() > 1 {
      Ok(responses.remove(0))
    } else {
      Ok(responses.first().cloned().unwrap_or_default())
    }
  }
}
