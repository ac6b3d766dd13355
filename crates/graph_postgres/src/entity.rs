use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// The `episodes` table backing [`crate::PostgresGraphAdapter`]. A minimal flat schema —
/// a real Graphiti/FalkorDB binding would additionally maintain extracted entity/relation
/// projections, which this adapter leaves to the backend rather than owning itself.
#[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "episodes")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub scope: String,
  pub author: String,
  #[sea_orm(column_type = "Text")]
  pub body: String,
  pub created_at: DateTime<Utc>,
  pub source: Option<String>,
}

#[derive(Debug, Copy, Clone, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
