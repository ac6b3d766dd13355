use chrono::{DateTime, Utc};
use plastmem_shared::AppError;

use crate::{Episode, MemoryResult};

/// The capability the core consumes for all persistence and retrieval.
///
/// Implementers bind this to a concrete graph backend (Graphiti/FalkorDB, a relational store,
/// an in-memory fixture for tests, ...). The core never talks to a backend directly.
#[async_trait::async_trait]
pub trait GraphAdapter: Send + Sync {
  /// Append an episode. Returns once the write is queued, not once it is indexed.
  /// `ts` may predate wall clock for historical backfill.
  async fn add_episode(&self, scope: &str, episode: Episode) -> Result<(), AppError>;

  /// Entity-oriented semantic search. Results carry `kind = Node`.
  async fn search_nodes(&self, scope: &str, query: &str) -> Result<Vec<MemoryResult>, AppError>;

  /// Relation-oriented semantic search. Results carry `kind = Fact`.
  async fn search_facts(&self, scope: &str, query: &str) -> Result<Vec<MemoryResult>, AppError>;

  /// Chronological backlog since `since`, used by bootstrap and the Story-sync fallback.
  async fn episodes_since(
    &self,
    scope: &str,
    since: DateTime<Utc>,
    limit: Option<u64>,
  ) -> Result<Vec<Episode>, AppError>;
}
