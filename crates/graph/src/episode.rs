use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored an episode's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorRole {
  Human,
  Assistant,
  System,
  HistoricalFile,
}

/// An append-only record in the graph.
///
/// Bodies may be prefixed with a `FECHA: <date>` anchor when importing historical files;
/// that anchor is authoritative for temporal filtering (see `plastmem_core` Phase 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
  pub id: Option<String>,
  pub author: AuthorRole,
  pub body: String,
  /// Caller-assignable; may predate wall clock for historical backfill.
  pub created_at: DateTime<Utc>,
  pub source: Option<String>,
}

impl Episode {
  #[must_use]
  pub fn new(author: AuthorRole, body: impl Into<String>, created_at: DateTime<Utc>) -> Self {
    Self { id: None, author, body: body.into(), created_at, source: None }
  }

  #[must_use]
  pub fn with_source(mut self, source: impl Into<String>) -> Self {
    self.source = Some(source.into());
    self
  }
}
