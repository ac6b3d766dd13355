use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use plastmem_shared::{AppError, MemoryErrorKind};
use serde::{Deserialize, Serialize};

/// A lock older than this is considered stale and may be stolen.
pub const STALE_AFTER: Duration = Duration::from_secs(120);

/// Default global lock path shared by all agent processes.
#[must_use]
pub fn default_lock_path() -> PathBuf {
  std::env::temp_dir().join("mind_narrative_sync.lock")
}

#[derive(Debug, Serialize, Deserialize)]
struct LockBody {
  pid: u32,
  started_at: DateTime<Utc>,
}

/// Process-external mutex file guarding `STORY.md` across concurrent agent processes.
pub struct NarrativeLock {
  path: PathBuf,
}

/// RAII guard: the lock file is unlinked when this drops, so guaranteed release falls out of
/// normal Rust scoping instead of a manual try/finally.
#[must_use = "the lock is released when this guard is dropped"]
pub struct LockGuard {
  path: PathBuf,
}

impl Drop for LockGuard {
  fn drop(&mut self) {
    if let Err(err) = std::fs::remove_file(&self.path) {
      if err.kind() != std::io::ErrorKind::NotFound {
        tracing::warn!(path = %self.path.display(), %err, "failed to release narrative lock");
      }
    }
  }
}

impl NarrativeLock {
  #[must_use]
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Attempts to acquire the lock. Returns `Ok(None)` (`LockHeld`) if a fresh lock is held by
  /// another process; `Ok(Some(guard))` once this process has written its own lock body,
  /// whether the slot was free or a stale lock (`LockStale`) was reclaimed.
  pub fn acquire(&self) -> Result<Option<LockGuard>, AppError> {
    if let Some(age) = self.existing_lock_age() {
      if age < STALE_AFTER {
        tracing::debug!(path = %self.path.display(), "narrative lock held by another process");
        return Ok(None);
      }
      tracing::warn!(path = %self.path.display(), ?age, "reclaiming stale narrative lock");
    }

    let body = LockBody { pid: std::process::id(), started_at: Utc::now() };
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&self.path, serde_json::to_vec(&body)?)?;

    Ok(Some(LockGuard { path: self.path.clone() }))
  }

  /// Age of the existing lock file, if one exists and is parseable. An unparseable lock body
  /// is treated as stale (age = infinite) rather than permanently wedging the lock.
  fn existing_lock_age(&self) -> Option<Duration> {
    let raw = std::fs::read_to_string(&self.path).ok()?;
    match serde_json::from_str::<LockBody>(&raw) {
      Ok(body) => {
        let age = Utc::now().signed_duration_since(body.started_at);
        Some(Duration::from_secs(age.num_seconds().max(0) as u64))
      }
      Err(_) => Some(Duration::from_secs(STALE_AFTER.as_secs() + 1)),
    }
  }
}

/// Maps an acquisition outcome to the error-taxonomy kinds, for callers that want to
/// log/propagate `LockHeld`/`LockStale` explicitly rather than branch on `Option`.
#[must_use]
pub const fn outcome_kind(held: bool) -> MemoryErrorKind {
  if held {
    MemoryErrorKind::LockHeld
  } else {
    MemoryErrorKind::LockStale
  }
}
