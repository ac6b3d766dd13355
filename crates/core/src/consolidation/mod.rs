mod bootstrap;
mod chunking;
mod sync;
mod synthesis;

pub use chunking::ChunkItem;
pub use sync::{sync_global_narrative, sync_story_with_session, SessionMessage};
pub use synthesis::{compress_story, update_narrative_story, word_count};

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use plastmem_completion::{CompletionGateway, ModelDescriptor};
use plastmem_graph::GraphAdapter;
use plastmem_shared::{AppError, MemoryErrorKind};
use regex::Regex;

use crate::config::NarrativeConfig;
use crate::identity_bundle::IdentityBundle;
use crate::lock::{default_lock_path, NarrativeLock};
use crate::pending_log::PendingEpisodeLog;
use crate::story::{story_path, Story};

use self::chunking::chunked_consolidate;

static PENDING_ENTRY_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]\s?").unwrap());

/// Parses `pending-episodes.log` entries (`[<iso>] text`, `\n---\n`-separated) back into
/// `ChunkItem`s so a consolidation batch anchors at the max timestamp actually present in it,
/// never at wall-clock "now" (see the Story anchoring invariant in `story.rs`).
fn parse_pending_transcript(transcript: &str) -> Vec<ChunkItem> {
  transcript
    .split("\n---\n")
    .filter(|entry| !entry.trim().is_empty())
    .filter_map(|entry| {
      let entry = entry.trim_start_matches('\n');
      let captures = PENDING_ENTRY_HEADER.captures(entry)?;
      let timestamp = DateTime::parse_from_rfc3339(&captures[1]).ok()?.with_timezone(&Utc);
      let text = entry[captures[0].len()..].to_owned();
      Some(ChunkItem { text, timestamp })
    })
    .collect()
}

/// Keeps `STORY.md` in sync with the growing backlog of non-heartbeat turns.
pub struct ConsolidationEngine {
  workspace: PathBuf,
  memory_dir: PathBuf,
  config: NarrativeConfig,
  graph: Arc<dyn GraphAdapter>,
  gateway: Arc<dyn CompletionGateway>,
  model: ModelDescriptor,
  scope: String,
  lock: NarrativeLock,
}

impl ConsolidationEngine {
  #[must_use]
  pub fn new(
    workspace: impl Into<PathBuf>,
    config: NarrativeConfig,
    graph: Arc<dyn GraphAdapter>,
    gateway: Arc<dyn CompletionGateway>,
    model: ModelDescriptor,
    scope: impl Into<String>,
  ) -> Self {
    let workspace = workspace.into();
    let memory_dir = workspace.join("memory");
    Self { workspace, memory_dir, config, graph, gateway, model, scope: scope.into(), lock: NarrativeLock::new(default_lock_path()) }
  }

  fn story_path(&self) -> PathBuf {
    story_path(&self.workspace, &self.config.story_filename)
  }

  fn pending_log(&self) -> PendingEpisodeLog {
    PendingEpisodeLog::new(&self.workspace)
  }

  /// Checks whether enough pending work has accumulated to narrativize, and does so if so.
  /// `safe_token_limit` is typically 50% of the model's context window; `identity` is the
  /// caller's current persona + Story bundle (the Story text it carries may be stale by one
  /// turn — this function re-reads the on-disk Story as the source of truth).
  pub async fn check_and_consolidate(&self, identity: &IdentityBundle, safe_token_limit: u64) -> Result<bool, AppError> {
    if !self.config.enabled {
      return Ok(false);
    }

    let story_path = self.story_path();
    let story = Story::read(&story_path)?;

    if story.is_new() {
      return self.bootstrap(identity, safe_token_limit).await;
    }

    let status = self.pending_log().status();
    if status.messages == 0 && status.tokens == 0 {
      return Ok(false);
    }
    if status.tokens < self.config.threshold {
      return Ok(false);
    }

    let pending_log = self.pending_log();
    let transcript = pending_log.read_transcript();
    let items = if !transcript.trim().is_empty() {
      parse_pending_transcript(&transcript)
    } else {
      tracing::warn!("pending log missing while status reports pending work, falling back to graph backlog");
      let since = story.effective_anchor(&story_path).unwrap_or_else(|| Utc::now() - chrono::TimeDelta::days(365));
      let episodes = self.graph.episodes_since(&self.scope, since, None).await?;
      episodes.into_iter().map(|e| ChunkItem { text: e.body, timestamp: e.created_at }).collect()
    };

    if items.is_empty() {
      return Ok(false);
    }

    let identity_current = IdentityBundle::new(identity.soul.clone(), story.body.clone());
    let outcome =
      chunked_consolidate(items, story.body.clone(), &identity_current, safe_token_limit, self.gateway.as_ref(), &self.model).await;

    let (new_story, anchor) = match outcome {
      Ok(Some(result)) => result,
      Ok(None) => return Ok(false),
      Err(err) if err.is_kind(&MemoryErrorKind::CompletionEmpty) => {
        tracing::warn!(%err, "narrative synthesis returned no usable text, leaving Story unchanged");
        return Ok(false);
      }
      Err(err) => return Err(err),
    };

    Story::write(&story_path, &new_story, anchor)?;
    pending_log.reset()?;

    Ok(true)
  }

  async fn bootstrap(&self, identity: &IdentityBundle, safe_token_limit: u64) -> Result<bool, AppError> {
    let story_path = self.story_path();

    if !self.config.auto_bootstrap_history {
      bootstrap::write_skeleton(&story_path)?;
      return Ok(true);
    }

    bootstrap::bootstrap_from_history(&self.memory_dir, &story_path, identity, safe_token_limit, self.gateway.as_ref(), &self.model).await
  }

  /// Cross-session recovery on agent startup.
  pub async fn sync_global_narrative(&self, sessions_dir: &Path, exclude_session: Option<&Path>, identity: &IdentityBundle, safe_token_limit: u64) -> Result<bool, AppError> {
    sync_global_narrative(&self.story_path(), sessions_dir, exclude_session, identity, safe_token_limit, &self.lock, self.gateway.as_ref(), &self.model).await
  }

  /// Post-compaction sync, awaited directly.
  pub async fn sync_story_with_session(&self, messages: Vec<SessionMessage>, identity: &IdentityBundle, safe_token_limit: u64) -> Result<bool, AppError> {
    sync_story_with_session(&self.story_path(), messages, identity, safe_token_limit, self.gateway.as_ref(), &self.model).await
  }

  /// Fire-and-forget variant of [`Self::sync_story_with_session`] for callers that only want
  /// to report the compaction event and move on — exceptions are logged, never propagated.
  pub fn spawn_sync_story_with_session(self: &Arc<Self>, messages: Vec<SessionMessage>, identity: IdentityBundle, safe_token_limit: u64) {
    let engine = Arc::clone(self);
    tokio::spawn(async move {
      if let Err(err) = engine.sync_story_with_session(messages, &identity, safe_token_limit).await {
        tracing::error!(%err, "post-compaction story sync failed");
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::{FixtureGraphAdapter, ScriptedGateway};
  use tempfile::tempdir;

  fn engine(workspace: &Path, config: NarrativeConfig, gateway: ScriptedGateway) -> ConsolidationEngine {
    ConsolidationEngine::new(
      workspace,
      config,
      Arc::new(FixtureGraphAdapter::new()),
      Arc::new(gateway),
      ModelDescriptor::new("openai", "x"),
      "scope",
    )
  }

  #[tokio::test]
  async fn new_story_without_bootstrap_writes_skeleton() {
    let dir = tempdir().unwrap();
    let config = NarrativeConfig { auto_bootstrap_history: false, ..NarrativeConfig::default() };
    let engine = engine(dir.path(), config, ScriptedGateway::new(vec!["unused"]));
    let identity = IdentityBundle::new("soul", "");

    let changed = engine.check_and_consolidate(&identity, 100_000).await.unwrap();
    assert!(changed);

    let story = Story::read(&engine.story_path()).unwrap();
    assert!(!story.is_new());
    assert_eq!(story.last_processed, Some(chrono::DateTime::parse_from_rfc3339("1970-01-01T00:00:00Z").unwrap().with_timezone(&Utc)));
  }

  #[tokio::test]
  async fn below_threshold_does_not_consolidate() {
    let dir = tempdir().unwrap();
    // Seed an existing (non-new) story so we skip the bootstrap branch.
    Story::write(&dir.path().join("STORY.md"), "### [2026-01-01 00:00] Prologue\n\nBegun.", Utc::now()).unwrap();
    let config = NarrativeConfig { threshold: 5000, ..NarrativeConfig::default() };
    let engine = engine(dir.path(), config, ScriptedGateway::new(vec!["unused"]));
    engine.pending_log().track("a short message").unwrap();
    let identity = IdentityBundle::new("soul", "");

    let changed = engine.check_and_consolidate(&identity, 100_000).await.unwrap();
    assert!(!changed);
  }

  #[tokio::test]
  async fn above_threshold_consolidates_and_resets_log() {
    let dir = tempdir().unwrap();
    Story::write(&dir.path().join("STORY.md"), "### [2026-01-01 00:00] Prologue\n\nBegun.", Utc::now()).unwrap();
    let config = NarrativeConfig { threshold: 10, ..NarrativeConfig::default() };
    let engine = engine(dir.path(), config, ScriptedGateway::new(vec!["### [2026-01-02 00:00] New Chapter\n\nSomething happened."]));
    engine.pending_log().track("a message that is definitely long enough to cross the ten token threshold").unwrap();
    let identity = IdentityBundle::new("soul", "");

    let changed = engine.check_and_consolidate(&identity, 100_000).await.unwrap();
    assert!(changed);
    assert_eq!(engine.pending_log().status(), crate::pending_log::PendingStatus::default());
  }

  #[tokio::test]
  async fn anchor_is_the_pending_entrys_own_timestamp_not_now() {
    let dir = tempdir().unwrap();
    Story::write(&dir.path().join("STORY.md"), "### [2026-01-01 00:00] Prologue\n\nBegun.", Utc::now()).unwrap();
    let config = NarrativeConfig { threshold: 10, ..NarrativeConfig::default() };
    let engine = engine(dir.path(), config, ScriptedGateway::new(vec!["### [2026-01-02 00:00] New Chapter\n\nSomething happened."]));

    // Backdate the pending entry so the anchor can only be right if it was parsed from the
    // log line itself rather than stamped at `Utc::now()` when consolidation runs.
    let backdated = Utc::now() - chrono::TimeDelta::days(10);
    let entry = format!("[{}] a message long enough to cross the ten token threshold\n---\n", backdated.to_rfc3339());
    std::fs::write(dir.path().join("pending-episodes.log"), entry).unwrap();
    std::fs::write(
      dir.path().join(".pending-consolidation-status"),
      serde_json::to_vec(&crate::pending_log::PendingStatus { messages: 1, tokens: 20 }).unwrap(),
    )
    .unwrap();

    engine.check_and_consolidate(&identity_for_anchor_test(), 100_000).await.unwrap();

    let story = Story::read(&engine.story_path()).unwrap();
    let last_processed = story.last_processed.expect("anchor header must be present");
    assert!((last_processed - backdated).num_seconds().abs() < 2, "anchor should equal the pending entry's own timestamp");
  }

  fn identity_for_anchor_test() -> IdentityBundle {
    IdentityBundle::new("soul", "")
  }

  #[tokio::test]
  async fn empty_completion_leaves_story_unchanged_and_returns_ok_false() {
    let dir = tempdir().unwrap();
    Story::write(&dir.path().join("STORY.md"), "### [2026-01-01 00:00] Prologue\n\nBegun.", Utc::now()).unwrap();
    let config = NarrativeConfig { threshold: 10, ..NarrativeConfig::default() };
    let engine = engine(dir.path(), config, ScriptedGateway::always_empty_error());
    engine.pending_log().track("a message that is definitely long enough to cross the ten token threshold").unwrap();
    let identity = IdentityBundle::new("soul", "");

    let changed = engine.check_and_consolidate(&identity, 100_000).await.unwrap();
    assert!(!changed);

    let story = Story::read(&engine.story_path()).unwrap();
    assert_eq!(story.body.trim(), "### [2026-01-01 00:00] Prologue\n\nBegun.");
  }
}
