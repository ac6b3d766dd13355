//! A concrete [`GraphAdapter`] over `sea-orm` + Postgres full-text search.
//!
//! Demonstrates how a real graph/vector backend (Graphiti, FalkorDB, or plain Postgres as
//! here) binds to the core's capability trait. Not required to exercise `plastmem_core` —
//! the core's tests use an in-memory fixture adapter instead.

mod entity;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plastmem_graph::{AuthorRole, Episode, GraphAdapter, MemoryResult, MemoryResultKind};
use plastmem_shared::AppError;
use sea_orm::{
  ColumnTrait, Condition, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, PaginatorTrait,
  QueryFilter, QueryOrder, QuerySelect, Set, Statement,
};

pub use entity::Model as EpisodeRow;

/// Postgres-backed [`GraphAdapter`]. Episodes are stored in a single flat table; "node" and
/// "fact" retrieval share the same full-text index and are distinguished only by which search
/// method the caller invoked — Nodes and Facts are variants of one `MemoryResult` sum type
/// rather than structurally different storage.
pub struct PostgresGraphAdapter {
  db: DatabaseConnection,
}

impl PostgresGraphAdapter {
  #[must_use]
  pub const fn new(db: DatabaseConnection) -> Self {
    Self { db }
  }

  async fn search(
    &self,
    scope: &str,
    query: &str,
    kind: MemoryResultKind,
  ) -> Result<Vec<MemoryResult>, AppError> {
    if query.trim().is_empty() {
      return Ok(Vec::new());
    }

    #[derive(Debug, FromQueryResult)]
    struct Row {
      id: uuid::Uuid,
      body: String,
      created_at: DateTime<Utc>,
    }

    let sql = "SELECT id, body, created_at FROM episodes \
               WHERE scope = $1 AND to_tsvector('simple', body) @@ websearch_to_tsquery('simple', $2) \
               ORDER BY ts_rank(to_tsvector('simple', body), websearch_to_tsquery('simple', $2)) DESC \
               LIMIT 20";

    let rows = Row::find_by_statement(Statement::from_sql_and_values(
      DbBackend::Postgres,
      sql,
      [scope.into(), query.into()],
    ))
    .all(&self.db)
    .await
    .map_err(AppError::new)?;

    Ok(
      rows
        .into_iter()
        .map(|row| MemoryResult {
          content: row.body,
          timestamp: Some(row.created_at),
          uuid: Some(row.id.to_string()),
          kind,
          boosted: false,
          source_query: query.to_owned(),
        })
        .collect(),
    )
  }
}

#[async_trait]
impl GraphAdapter for PostgresGraphAdapter {
  async fn add_episode(&self, scope: &str, episode: Episode) -> Result<(), AppError> {
    let active = entity::ActiveModel {
      id: Set(uuid::Uuid::now_v7()),
      scope: Set(scope.to_owned()),
      author: Set(author_role_str(episode.author).to_owned()),
      body: Set(episode.body),
      created_at: Set(episode.created_at),
      source: Set(episode.source),
    };

    entity::Entity::insert(active).exec(&self.db).await.map_err(AppError::new)?;
    Ok(())
  }

  async fn search_nodes(&self, scope: &str, query: &str) -> Result<Vec<MemoryResult>, AppError> {
    self.search(scope, query, MemoryResultKind::Node).await
  }

  async fn search_facts(&self, scope: &str, query: &str) -> Result<Vec<MemoryResult>, AppError> {
    self.search(scope, query, MemoryResultKind::Fact).await
  }

  async fn episodes_since(
    &self,
    scope: &str,
    since: DateTime<Utc>,
    limit: Option<u64>,
  ) -> Result<Vec<Episode>, AppError> {
    let mut select = entity::Entity::find()
      .filter(
        Condition::all()
          .add(entity::Column::Scope.eq(scope))
          .add(entity::Column::CreatedAt.gt(since)),
      )
      .order_by_asc(entity::Column::CreatedAt);

    if let Some(limit) = limit {
      select = select.limit(limit);
    }

    let rows = select.all(&self.db).await.map_err(AppError::new)?;

    Ok(
      rows
        .into_iter()
        .map(|row| {
          let mut episode = Episode::new(author_role_from_str(&row.author), row.body, row.created_at);
          episode.id = Some(row.id.to_string());
          episode.source = row.source;
          episode
        })
        .collect(),
    )
  }
}

/// Total episode count for a scope — used by setup tooling to decide whether bootstrap has
/// already run; not part of the `GraphAdapter` contract itself.
pub async fn episode_count(db: &DatabaseConnection, scope: &str) -> Result<u64, AppError> {
  entity::Entity::find().filter(entity::Column::Scope.eq(scope)).count(db).await.map_err(AppError::new)
}

const fn author_role_str(role: AuthorRole) -> &'static str {
  match role {
    AuthorRole::Human => "human",
    AuthorRole::Assistant => "assistant",
    AuthorRole::System => "system",
    AuthorRole::HistoricalFile => "historical-file",
  }
}

fn author_role_from_str(s: &str) -> AuthorRole {
  match s {
    "assistant" => AuthorRole::Assistant,
    "system" => AuthorRole::System,
    "historical-file" => AuthorRole::HistoricalFile,
    _ => AuthorRole::Human,
  }
}
