use std::collections::HashSet;
use std::sync::Arc;

use plastmem_graph::{sanitize_query, GraphAdapter, MemoryResult};
use tokio::task::JoinSet;

/// Phase 2 — graph retrieval. For each seed query, sanitizes it and calls `searchNodes` and
/// `searchFacts` concurrently; results are tagged with the query that surfaced them and
/// deduplicated across all queries by [`MemoryResult::dedup_key`].
///
/// A failed search for a given query contributes zero results for that call rather than
/// failing the whole phase, per the `GraphUnavailable` degraded-but-never-corrupt policy.
pub async fn search_all(queries: &[String], graph: Arc<dyn GraphAdapter>, scope: &str) -> Vec<MemoryResult> {
  let mut join_set: JoinSet<Vec<MemoryResult>> = JoinSet::new();

  for query in queries {
    let sanitized = sanitize_query(query);
    if sanitized.is_empty() {
      continue;
    }

    let graph = Arc::clone(&graph);
    let scope = scope.to_owned();
    let display_query = query.clone();

    join_set.spawn(async move {
      let (nodes, facts) = tokio::join!(
        graph.search_nodes(&scope, &sanitized),
        graph.search_facts(&scope, &sanitized),
      );

      let mut results = Vec::new();
      for outcome in [nodes, facts] {
        match outcome {
          Ok(mut found) => {
            for result in &mut found {
              result.source_query = display_query.clone();
            }
            results.append(&mut found);
          }
          Err(err) => {
            tracing::warn!(query = %display_query, %err, "graph search failed, contributing zero results");
          }
        }
      }
      results
    });
  }

  let mut seen = HashSet::new();
  let mut out = Vec::new();

  while let Some(joined) = join_set.join_next().await {
    let Ok(results) = joined else {
      continue;
    };
    for result in results {
      if seen.insert(result.dedup_key()) {
        out.push(result);
      }
    }
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::FixtureGraphAdapter;

  #[tokio::test]
  async fn dedupes_across_queries() {
    let graph = Arc::new(FixtureGraphAdapter::new());
    graph.seed_node("same content", None);
    graph.seed_node("same content", None);

    let queries = vec!["q1".to_owned(), "q2".to_owned()];
    let results = search_all(&queries, graph, "scope").await;
    assert_eq!(results.len(), 1);
  }

  #[tokio::test]
  async fn tags_results_with_source_query() {
    let graph = Arc::new(FixtureGraphAdapter::new());
    graph.seed_node("Julio's mother lives in Miguelturra", None);

    let queries = vec!["Julio's mother".to_owned()];
    let results = search_all(&queries, graph, "scope").await;
    assert_eq!(results[0].source_query, "Julio's mother");
  }
}
