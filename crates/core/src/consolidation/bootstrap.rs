use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use plastmem_completion::{CompletionGateway, ModelDescriptor};
use plastmem_shared::AppError;
use regex::Regex;

use crate::identity_bundle::IdentityBundle;
use crate::story::Story;

use super::chunking::{chunked_consolidate, ChunkItem};

static LEADING_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})").unwrap());

/// Lists `memory/YYYY-MM-DD*.md` files in filename-sorted order, skipping anything that
/// doesn't start with a parseable date. Unreadable files are logged and skipped as a
/// `HistoricalIngestFailure`, not fatal to the rest of the bootstrap.
fn list_historical_files(memory_dir: &Path) -> Vec<(NaiveDate, std::path::PathBuf)> {
  let Ok(entries) = std::fs::read_dir(memory_dir) else {
    return Vec::new();
  };

  let mut files: Vec<(NaiveDate, std::path::PathBuf)> = entries
    .filter_map(Result::ok)
    .filter_map(|entry| {
      let path = entry.path();
      let name = path.file_name()?.to_str()?;
      let date_str = LEADING_DATE.captures(name)?.get(1)?.as_str();
      let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
      Some((date, path))
    })
    .collect();

  files.sort_by(|a, b| a.1.cmp(&b.1));
  files
}

/// Cold-start bootstrap: narrativizes historical daily logs into the Story using the shared
/// dynamic chunker. Returns `true` if any chapters were written.
pub async fn bootstrap_from_history(
  memory_dir: &Path,
  story_path: &Path,
  identity: &IdentityBundle,
  safe_token_limit: u64,
  gateway: &dyn CompletionGateway,
  model: &ModelDescriptor,
) -> Result<bool, AppError> {
  let files = list_historical_files(memory_dir);
  if files.is_empty() {
    return Ok(false);
  }

  let mut items = Vec::with_capacity(files.len());
  for (date, path) in files {
    match std::fs::read_to_string(&path) {
      Ok(text) => {
        let timestamp = date.and_hms_opt(0, 0, 0).map(|n| n.and_utc()).unwrap_or_else(Utc::now);
        items.push(ChunkItem { text, timestamp });
      }
      Err(err) => {
        tracing::warn!(path = %path.display(), %err, "failed to read historical file, skipping");
      }
    }
  }

  let Some((story, anchor)) = chunked_consolidate(items, String::new(), identity, safe_token_limit, gateway, model).await? else {
    return Ok(false);
  };

  Story::write(story_path, &story, anchor)?;
  Ok(true)
}

/// When the caller has not opted into historical narrativization, write a skeleton Story
/// anchored at the Unix epoch so the "new story" branch is not re-taken next turn.
pub fn write_skeleton(story_path: &Path) -> Result<(), AppError> {
  Story::write_skeleton(story_path)
}

#[must_use]
pub fn anchor_from_filename(name: &str) -> Option<DateTime<Utc>> {
  let date_str = LEADING_DATE.captures(name)?.get(1)?.as_str();
  let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
  date.and_hms_opt(0, 0, 0).map(|n| n.and_utc())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::ScriptedGateway;
  use tempfile::tempdir;

  #[tokio::test]
  async fn no_memory_dir_skips_bootstrap() {
    let dir = tempdir().unwrap();
    let gateway = ScriptedGateway::new(vec!["unused"]);
    let identity = IdentityBundle::new("soul", "");
    let ran = bootstrap_from_history(
      &dir.path().join("memory"),
      &dir.path().join("STORY.md"),
      &identity,
      100_000,
      &gateway,
      &ModelDescriptor::new("openai", "x"),
    )
    .await
    .unwrap();
    assert!(!ran);
  }

  #[tokio::test]
  async fn ingests_files_in_filename_order() {
    let dir = tempdir().unwrap();
    let memory_dir = dir.path().join("memory");
    std::fs::create_dir_all(&memory_dir).unwrap();
    std::fs::write(memory_dir.join("2026-02-01-log.md"), "first day content").unwrap();
    std::fs::write(memory_dir.join("2026-01-01-log.md"), "earlier day content").unwrap();

    let gateway = ScriptedGateway::new(vec!["### [2026-02-01 00:00] Chapter\n\nNarrated."]);
    let identity = IdentityBundle::new("soul", "");
    let story_path = dir.path().join("STORY.md");

    let ran = bootstrap_from_history(&memory_dir, &story_path, &identity, 100_000, &gateway, &ModelDescriptor::new("openai", "x"))
      .await
      .unwrap();
    assert!(ran);

    let prompt = gateway.prompts.lock().unwrap()[0].clone();
    let earlier_pos = prompt.find("earlier day content").unwrap();
    let first_pos = prompt.find("first day content").unwrap();
    assert!(earlier_pos < first_pos, "earlier file must appear before later file in the batch");
  }

  #[tokio::test]
  async fn skeleton_is_not_new() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("STORY.md");
    write_skeleton(&path).unwrap();
    let story = Story::read(&path).unwrap();
    assert!(!story.is_new());
  }
}
