use std::path::{Path, PathBuf};

use chrono::Utc;
use plastmem_shared::{estimate_tokens, is_heartbeat, AppError};
use serde::{Deserialize, Serialize};

const LOG_FILE: &str = "pending-episodes.log";
const STATUS_FILE: &str = ".pending-consolidation-status";

/// Running totals tracked alongside the pending-episode log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStatus {
  pub messages: u64,
  pub tokens: u64,
}

/// Append-only audit trail of non-heartbeat turns awaiting narrativization, plus a
/// token-counted running total used by [`crate::consolidation::ConsolidationEngine`] to
/// decide when to fire.
pub struct PendingEpisodeLog {
  dir: PathBuf,
}

impl PendingEpisodeLog {
  #[must_use]
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  fn log_path(&self) -> PathBuf {
    self.dir.join(LOG_FILE)
  }

  fn status_path(&self) -> PathBuf {
    self.dir.join(STATUS_FILE)
  }

  /// Records a turn, unless it is a heartbeat — heartbeats must never enter long-term
  /// memory. The log append and the status update are each individually crash-safe but not
  /// atomic with respect to each other — a crash between them still leaves `status()`
  /// re-readable.
  pub fn track(&self, text: &str) -> Result<(), AppError> {
    if is_heartbeat(text) {
      return Ok(());
    }

    std::fs::create_dir_all(&self.dir)?;

    let entry = format!("[{}] {text}\n---\n", Utc::now().to_rfc3339());
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(self.log_path())?;
    file.write_all(entry.as_bytes())?;

    let mut status = self.status();
    status.messages += 1;
    status.tokens += estimate_tokens(text);
    self.write_status(status)?;

    Ok(())
  }

  /// `{0, 0}` if the status file is missing or malformed — never raises.
  #[must_use]
  pub fn status(&self) -> PendingStatus {
    std::fs::read_to_string(self.status_path())
      .ok()
      .and_then(|raw| serde_json::from_str(&raw).ok())
      .unwrap_or_default()
  }

  fn write_status(&self, status: PendingStatus) -> Result<(), AppError> {
    std::fs::create_dir_all(&self.dir)?;
    let tmp = self.status_path().with_extension("tmp");
    std::fs::write(&tmp, serde_json::to_vec(&status)?)?;
    std::fs::rename(&tmp, self.status_path())?;
    Ok(())
  }

  /// Resets status to `{0, 0}`, then best-effort unlinks the log. A missing log with a
  /// nonzero status beforehand is a recoverable anomaly, not an error — callers should treat
  /// it as "nothing pending" (see [`Self::status`]).
  pub fn reset(&self) -> Result<(), AppError> {
    self.write_status(PendingStatus::default())?;
    let _ = std::fs::remove_file(self.log_path());
    Ok(())
  }

  /// The raw log contents, or an empty string if the file is missing.
  #[must_use]
  pub fn read_transcript(&self) -> String {
    std::fs::read_to_string(self.log_path()).unwrap_or_default()
  }

  #[must_use]
  pub fn exists(dir: &Path) -> bool {
    dir.join(LOG_FILE).exists()
  }
}
