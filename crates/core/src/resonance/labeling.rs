use chrono::{DateTime, Utc};
use plastmem_graph::MemoryResult;
use plastmem_shared::relative_time_label;

use super::filtering::effective_timestamp;

/// A memory annotated with a human-readable relative-time label from the fixed label table,
/// ready for grouping into a rewrite prompt or a raw fallback bullet.
#[derive(Debug, Clone)]
pub struct Flashback {
  pub content: String,
  pub relative_label: String,
  pub effective_timestamp: Option<DateTime<Utc>>,
  pub source_query: String,
}

/// Phase 4 — Temporal labeling. Memories with no resolvable timestamp get a neutral label
/// rather than a fabricated one.
#[must_use]
pub fn label(result: MemoryResult, now: DateTime<Utc>) -> Flashback {
  let timestamp = effective_timestamp(&result);
  let relative_label =
    timestamp.map_or_else(|| "at some point".to_owned(), |then| relative_time_label(then, now));

  Flashback { content: result.content, relative_label, effective_timestamp: timestamp, source_query: result.source_query }
}
