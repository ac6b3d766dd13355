use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use plastmem_graph::{MemoryResult, MemoryResultKind};
use regex::Regex;

use crate::echo_buffer::EchoBuffer;

static DATE_ANCHOR: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?:Ocurrido el|memory log for|FECHA:|DATE:)\s*(\d{4}-\d{2}-\d{2})").unwrap());
static TIMESTAMP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[TIMESTAMP:([^\]]+)\]").unwrap());

const TOTAL_CAP: usize = 10;
const PER_GROUP_CAP: usize = 5;
const DEDUP_KEY_LEN: usize = 30;

/// Resolves the timestamp the Memory Horizon filter and temporal labeling should use for a
/// result: an in-body date anchor takes priority, then a `[TIMESTAMP:...]` tag, then the
/// result's own timestamp. Unparseable date text falls through rather than erroring.
#[must_use]
pub fn effective_timestamp(result: &MemoryResult) -> Option<DateTime<Utc>> {
  if let Some(captures) = DATE_ANCHOR.captures(&result.content) {
    if let Some(date) = NaiveDate::parse_from_str(&captures[1], "%Y-%m-%d").ok() {
      return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
  }

  if let Some(captures) = TIMESTAMP_TAG.captures(&result.content) {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(captures[1].trim()) {
      return Some(parsed.with_timezone(&Utc));
    }
  }

  result.timestamp
}

/// Phase 3.1 — Memory Horizon. Drops any result whose effective timestamp is at or after
/// `oldest_context_timestamp`; a result with no resolvable timestamp at all is kept (fail
/// open) since it cannot be proven to overlap the live context window.
#[must_use]
pub fn memory_horizon_filter(results: Vec<MemoryResult>, oldest_context_timestamp: DateTime<Utc>) -> Vec<MemoryResult> {
  results
    .into_iter()
    .filter(|result| match effective_timestamp(result) {
      Some(ts) => ts < oldest_context_timestamp,
      None => true,
    })
    .collect()
}

/// Phase 3.2 — Echo Filter. Drops any result whose id is already in the `EchoBuffer` unless
/// it's `_boosted`. Ids of results that survive are inserted into the buffer.
pub fn echo_filter(results: Vec<MemoryResult>, echo: &mut EchoBuffer) -> Vec<MemoryResult> {
  let mut out = Vec::with_capacity(results.len());
  for result in results {
    let key = result.dedup_key();
    if echo.contains(&key) && !result.boosted {
      continue;
    }
    echo.insert(key);
    out.push(result);
  }
  out
}

/// Phase 3.3 — Priority sort. `_boosted` first, then Facts before Nodes, then a temporal
/// direction flipped once per pipeline invocation (not re-flipped per group) so a turn's
/// flashbacks read as one coherent temporal sweep rather than a jumble.
#[must_use]
pub fn priority_sort(mut results: Vec<MemoryResult>, old_first: bool) -> Vec<MemoryResult> {
  results.sort_by(|a, b| {
    b.boosted
      .cmp(&a.boosted)
      .then_with(|| matches!(b.kind, MemoryResultKind::Fact).cmp(&matches!(a.kind, MemoryResultKind::Fact)))
      .then_with(|| {
        let (ea, eb) = (effective_timestamp(a), effective_timestamp(b));
        let ordering = match (ea, eb) {
          (Some(ta), Some(tb)) => ta.cmp(&tb),
          (Some(_), None) => std::cmp::Ordering::Less,
          (None, Some(_)) => std::cmp::Ordering::Greater,
          (None, None) => std::cmp::Ordering::Equal,
        };
        if old_first {
          ordering
        } else {
          ordering.reverse()
        }
      })
  });
  results
}

fn normalized_dedup_key(content: &str) -> String {
  content.to_lowercase().chars().filter(|c| c.is_alphanumeric()).take(DEDUP_KEY_LEN).collect()
}

fn strip_timestamp_noise(content: &str) -> String {
  TIMESTAMP_TAG.replace_all(content, "").trim().to_owned()
}

fn is_json_only(content: &str) -> bool {
  let trimmed = content.trim();
  trimmed.starts_with('{') && trimmed.ends_with('}')
}

/// Phase 3.4 — Caps and cleanup. Accepts up to [`TOTAL_CAP`] results overall, groups them by
/// `_sourceQuery`, and caps each group's final rendering at [`PER_GROUP_CAP`]. Strips
/// `[TIMESTAMP:…]` noise, skips JSON-only bodies, and rejects near-duplicate bullets using a
/// 30-char normalized content key.
#[must_use]
pub fn cap_and_clean(results: Vec<MemoryResult>) -> HashMap<String, Vec<MemoryResult>> {
  let mut groups: HashMap<String, Vec<MemoryResult>> = HashMap::new();
  let mut seen_keys = std::collections::HashSet::new();
  let mut accepted = 0usize;

  for mut result in results {
    if accepted >= TOTAL_CAP {
      break;
    }

    if is_json_only(&result.content) {
      continue;
    }

    result.content = strip_timestamp_noise(&result.content);
    if result.content.is_empty() {
      continue;
    }

    let key = normalized_dedup_key(&result.content);
    if !seen_keys.insert(key) {
      continue;
    }

    let group = groups.entry(result.source_query.clone()).or_default();
    if group.len() >= PER_GROUP_CAP {
      continue;
    }

    group.push(result);
    accepted += 1;
  }

  groups
}
