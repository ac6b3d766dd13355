/// Recognized configuration surface.
///
/// CLI/config-file loading is out of scope — callers populate this struct however they like
/// (env vars, a config crate, hardcoded defaults) and hand it to the engines below.
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
  /// Gate for Story consolidation and injection.
  pub enabled: bool,
  /// Token threshold that triggers consolidation.
  pub threshold: u64,
  /// Story file name, relative to the identity's workspace directory.
  pub story_filename: String,
  /// Enable cold-start historical narrativization from `memory/YYYY-MM-DD*.md` files.
  pub auto_bootstrap_history: bool,
  /// Verbose logging to standard error.
  pub debug: bool,
}

impl Default for NarrativeConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      threshold: 5000,
      story_filename: "STORY.md".to_owned(),
      auto_bootstrap_history: false,
      debug: false,
    }
  }
}

/// `MIND_SKIP_RESONANCE=1` bypasses the Resonance Pipeline while retaining Story injection.
/// Read once by the turn entry point, not cached — tests can flip the env var between calls.
#[must_use]
pub fn resonance_skipped() -> bool {
  std::env::var("MIND_SKIP_RESONANCE").as_deref() == Ok("1")
}
