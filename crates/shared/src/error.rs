use std::fmt::Display;

/// Error taxonomy for the memory subsystem.
///
/// These are the degraded-but-recoverable outcomes the subsystem is allowed to produce;
/// every one of them is handled by its caller rather than propagated as a crash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryErrorKind {
  #[error("graph adapter unavailable")]
  GraphUnavailable,
  #[error("completion returned empty text")]
  CompletionEmpty,
  #[error("completion stream emitted an error event")]
  CompletionStreamError,
  #[error("story exceeds the word budget after compression")]
  StoryTooLong,
  #[error("narrative lock is held by another process")]
  LockHeld,
  #[error("narrative lock is stale and was reclaimed")]
  LockStale,
  #[error("pending episode log missing while status reports pending work")]
  PendingLogMissing,
  #[error("failed to ingest historical file: {0}")]
  HistoricalIngestFailure(String),
}

/// General-purpose application error, wrapping `anyhow::Error`. No HTTP response mapping
/// here — this subsystem has no web surface.
#[derive(Debug)]
pub struct AppError {
  err: anyhow::Error,
  kind: Option<MemoryErrorKind>,
}

impl AppError {
  pub fn new<E: Into<anyhow::Error>>(err: E) -> Self {
    Self { err: err.into(), kind: None }
  }

  pub fn from_kind(kind: MemoryErrorKind) -> Self {
    let err = anyhow::anyhow!(kind.to_string());
    Self { err, kind: Some(kind) }
  }

  /// The recognized error kind, if this error was constructed from one.
  /// Arbitrary I/O/serde errors surface as `None` — callers treat that as a generic failure.
  #[must_use]
  pub const fn kind(&self) -> Option<&MemoryErrorKind> {
    self.kind.as_ref()
  }

  #[must_use]
  pub fn is_kind(&self, kind: &MemoryErrorKind) -> bool {
    self.kind.as_ref() == Some(kind)
  }
}

impl Display for AppError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.err)
  }
}

impl From<std::io::Error> for AppError {
  fn from(err: std::io::Error) -> Self {
    Self::new(err)
  }
}

impl From<serde_json::Error> for AppError {
  fn from(err: serde_json::Error) -> Self {
    Self::new(err)
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    Self { err, kind: None }
  }
}

impl From<MemoryErrorKind> for AppError {
  fn from(kind: MemoryErrorKind) -> Self {
    Self::from_kind(kind)
  }
}
