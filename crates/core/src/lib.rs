pub mod config;
pub mod consolidation;
pub mod echo_buffer;
pub mod identity_bundle;
pub mod lock;
pub mod pending_log;
pub mod resonance;
pub mod story;

#[cfg(test)]
mod test_support;

pub use config::{resonance_skipped, NarrativeConfig};
pub use consolidation::{ConsolidationEngine, SessionMessage};
pub use echo_buffer::EchoBuffer;
pub use identity_bundle::IdentityBundle;
pub use lock::{default_lock_path, NarrativeLock};
pub use pending_log::{PendingEpisodeLog, PendingStatus};
pub use resonance::{ResonancePipeline, TurnInput};
pub use story::{story_path, Story};
