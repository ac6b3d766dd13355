use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use plastmem_completion::{CompletionGateway, ModelDescriptor};
use plastmem_shared::{is_heartbeat, AppError};
use serde::Deserialize;

use crate::identity_bundle::IdentityBundle;
use crate::lock::NarrativeLock;
use crate::story::Story;

use super::chunking::{chunked_consolidate, ChunkItem};

/// One line of a session transcript (NDJSON), as read by global narrative sync. Unrecognized
/// fields are ignored; lines that fail to parse are skipped rather than aborting the scan
/// (the scan is resilient to malformed entries by construction).
#[derive(Debug, Clone, Deserialize)]
pub struct SessionMessage {
  #[serde(rename = "type")]
  pub kind: String,
  pub timestamp: DateTime<Utc>,
  #[serde(default)]
  pub content: Option<String>,
}

impl SessionMessage {
  fn is_usable(&self, since: DateTime<Utc>) -> bool {
    if self.kind != "message" || self.timestamp <= since {
      return false;
    }
    match &self.content {
      Some(text) => !text.trim().is_empty() && !is_heartbeat(text),
      None => false,
    }
  }
}

/// Finds the `limit` most-recently-modified `*.jsonl` files in `sessions_dir`, excluding
/// `exclude` (typically the caller's own in-progress session) if given.
fn recent_session_files(sessions_dir: &Path, exclude: Option<&Path>, limit: usize) -> Vec<PathBuf> {
  let Ok(entries) = std::fs::read_dir(sessions_dir) else {
    return Vec::new();
  };

  let mut files: Vec<(std::time::SystemTime, PathBuf)> = entries
    .filter_map(Result::ok)
    .filter_map(|entry| {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
        return None;
      }
      if exclude.is_some_and(|excluded| excluded == path) {
        return None;
      }
      let modified = entry.metadata().ok()?.modified().ok()?;
      Some((modified, path))
    })
    .collect();

  files.sort_by(|a, b| b.0.cmp(&a.0));
  files.truncate(limit);
  files.into_iter().map(|(_, path)| path).collect()
}

fn parse_session_file(path: &Path, since: DateTime<Utc>) -> Vec<SessionMessage> {
  let Ok(raw) = std::fs::read_to_string(path) else {
    tracing::warn!(path = %path.display(), "failed to read session transcript, skipping");
    return Vec::new();
  };

  raw
    .lines()
    .filter_map(|line| serde_json::from_str::<SessionMessage>(line).ok())
    .filter(|message| message.is_usable(since))
    .collect()
}

/// Cross-session recovery of un-narrated messages on agent startup, protected by the
/// `NarrativeLock`. Returns `Ok(false)` without error if another process holds the lock —
/// that is a normal, expected outcome, not a failure.
pub async fn sync_global_narrative(
  story_path: &Path,
  sessions_dir: &Path,
  exclude_session: Option<&Path>,
  identity: &IdentityBundle,
  safe_token_limit: u64,
  lock: &NarrativeLock,
  gateway: &dyn CompletionGateway,
  model: &ModelDescriptor,
) -> Result<bool, AppError> {
  let Some(_guard) = lock.acquire()? else {
    return Ok(false);
  };

  let story = Story::read(story_path)?;
  let since = story.effective_anchor(story_path).unwrap_or_else(|| {
    DateTime::parse_from_rfc3339("1970-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
  });

  let files = recent_session_files(sessions_dir, exclude_session, 5);
  let mut messages: Vec<SessionMessage> = files.iter().flat_map(|path| parse_session_file(path, since)).collect();
  messages.sort_by_key(|message| message.timestamp);

  if messages.is_empty() {
    return Ok(false);
  }

  let items: Vec<ChunkItem> = messages
    .into_iter()
    .filter_map(|message| Some(ChunkItem { text: message.content?, timestamp: message.timestamp }))
    .collect();

  let Some((new_story, anchor)) = chunked_consolidate(items, story.body, identity, safe_token_limit, gateway, model).await? else {
    return Ok(false);
  };

  Story::write(story_path, &new_story, anchor)?;
  Ok(true)
  // `_guard` drops here, releasing the lock unconditionally on every return path.
}

/// Post-compaction sync. Fire-and-forget from the caller's perspective — use
/// [`super::ConsolidationEngine::spawn_sync_story_with_session`] to get that behaviour; this
/// function itself still returns a `Result` for callers that want to await and handle it
/// directly.
pub async fn sync_story_with_session(
  story_path: &Path,
  messages: Vec<SessionMessage>,
  identity: &IdentityBundle,
  safe_token_limit: u64,
  gateway: &dyn CompletionGateway,
  model: &ModelDescriptor,
) -> Result<bool, AppError> {
  let story = Story::read(story_path)?;
  let since = story.effective_anchor(story_path).unwrap_or_else(|| {
    DateTime::parse_from_rfc3339("1970-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
  });

  let mut usable: Vec<SessionMessage> = messages.into_iter().filter(|m| m.is_usable(since)).collect();
  usable.sort_by_key(|m| m.timestamp);

  if usable.is_empty() {
    return Ok(false);
  }

  let items: Vec<ChunkItem> =
    usable.into_iter().filter_map(|message| Some(ChunkItem { text: message.content?, timestamp: message.timestamp })).collect();

  let Some((new_story, anchor)) = chunked_consolidate(items, story.body, identity, safe_token_limit, gateway, model).await? else {
    return Ok(false);
  };

  Story::write(story_path, &new_story, anchor)?;
  Ok(true)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::ScriptedGateway;
  use tempfile::tempdir;

  fn message(kind: &str, ts: DateTime<Utc>, content: Option<&str>) -> SessionMessage {
    SessionMessage { kind: kind.to_owned(), timestamp: ts, content: content.map(ToOwned::to_owned) }
  }

  #[test]
  fn heartbeat_session_message_is_unusable() {
    let since = Utc::now() - chrono::TimeDelta::days(1);
    let m = message("message", Utc::now(), Some("HEARTBEAT_OK"));
    assert!(!m.is_usable(since));
  }

  #[test]
  fn old_message_is_unusable() {
    let since = Utc::now();
    let m = message("message", since - chrono::TimeDelta::days(1), Some("hello"));
    assert!(!m.is_usable(since));
  }

  #[tokio::test]
  async fn post_compaction_sync_updates_story() {
    let dir = tempdir().unwrap();
    let story_path = dir.path().join("STORY.md");
    let identity = IdentityBundle::new("soul", "");
    let gateway = ScriptedGateway::new(vec!["### [2026-01-01 00:00] Chapter\n\nNarrated."]);

    let messages = vec![message("message", Utc::now(), Some("something worth remembering"))];
    let updated = sync_story_with_session(&story_path, messages, &identity, 100_000, &gateway, &ModelDescriptor::new("openai", "x"))
      .await
      .unwrap();
    assert!(updated);
    assert!(story_path.exists());
  }

  #[tokio::test]
  async fn empty_messages_do_not_touch_the_story() {
    let dir = tempdir().unwrap();
    let story_path = dir.path().join("STORY.md");
    let identity = IdentityBundle::new("soul", "");
    let gateway = ScriptedGateway::new(vec!["unused"]);

    let updated = sync_story_with_session(&story_path, Vec::new(), &identity, 100_000, &gateway, &ModelDescriptor::new("openai", "x"))
      .await
      .unwrap();
    assert!(!updated);
    assert!(!story_path.exists());
  }
}
