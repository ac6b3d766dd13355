use chrono::{DateTime, Utc};

/// Nodes are entity-centric retrieval results, Facts are relation-centric. The core treats
/// them as variants of one sum type rather than duck-typing on a `_sourceQuery` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryResultKind {
  Node,
  Fact,
}

/// A read-only retrieval result returned by a `GraphAdapter` search call.
#[derive(Debug, Clone)]
pub struct MemoryResult {
  pub content: String,
  pub timestamp: Option<DateTime<Utc>>,
  pub uuid: Option<String>,
  pub kind: MemoryResultKind,
  /// Priority flag during ranking; boosted results survive the Echo Filter.
  pub boosted: bool,
  /// The seed query that surfaced this result.
  pub source_query: String,
}

impl MemoryResult {
  /// Identity for deduplication: the `uuid` if present, else a stable hash of the content.
  #[must_use]
  pub fn dedup_key(&self) -> String {
    match &self.uuid {
      Some(uuid) => uuid.clone(),
      None => format!("{:016x}", fnv1a64(self.content.trim())),
    }
  }
}

/// A small, dependency-free 64-bit FNV-1a hash — deterministic and auditable, in keeping
/// with not pulling in a hashing crate for one function.
fn fnv1a64(s: &str) -> u64 {
  const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
  const PRIME: u64 = 0x0000_0100_0000_01b3;
  let mut hash = OFFSET_BASIS;
  for byte in s.as_bytes() {
    hash ^= u64::from(*byte);
    hash = hash.wrapping_mul(PRIME);
  }
  hash
}

#[cfg(test)]
mod tests {
  use super::*;

  fn result(content: &str, uuid: Option<&str>) -> MemoryResult {
    MemoryResult {
      content: content.to_owned(),
      timestamp: None,
      uuid: uuid.map(ToOwned::to_owned),
      kind: MemoryResultKind::Node,
      boosted: false,
      source_query: "q".to_owned(),
    }
  }

  #[test]
  fn prefers_uuid_identity() {
    let r = result("hello", Some("abc-123"));
    assert_eq!(r.dedup_key(), "abc-123");
  }

  #[test]
  fn falls_back_to_content_hash() {
    let a = result("Julio's mother lives in Miguelturra", None);
    let b = result("Julio's mother lives in Miguelturra", None);
    assert_eq!(a.dedup_key(), b.dedup_key());
  }

  #[test]
  fn hash_ignores_surrounding_whitespace() {
    let a = result("hello world", None);
    let b = result("  hello world  ", None);
    assert_eq!(a.dedup_key(), b.dedup_key());
  }

  #[test]
  fn distinct_content_hashes_differ() {
    let a = result("one thing", None);
    let b = result("another thing", None);
    assert_ne!(a.dedup_key(), b.dedup_key());
  }
}
