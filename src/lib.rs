//! Public surface for embedding this memory subsystem into an agent runtime.
//!
//! Prompt assembly, transport, and the agent loop itself live outside this crate; what's here
//! is the capability contracts plus the two engines (`ResonancePipeline`, `ConsolidationEngine`)
//! that turn them into per-turn retrieval and ongoing narrative upkeep.

pub use plastmem_completion::{
  complete_with_failover, CompletionErrorKind, CompletionGateway, CompletionRequest, CompletionResponse, FailoverPolicy, ModelDescriptor,
};
pub use plastmem_core::{
  default_lock_path, resonance_skipped, ConsolidationEngine, EchoBuffer, IdentityBundle, NarrativeConfig, NarrativeLock, PendingEpisodeLog,
  PendingStatus, ResonancePipeline, SessionMessage, Story, TurnInput,
};
pub use plastmem_graph::{sanitize_query, AuthorRole, Episode, GraphAdapter, MemoryResult, MemoryResultKind};
pub use plastmem_shared::{estimate_tokens, is_heartbeat, relative_time_label, truncate_repetitive, AppError, MemoryErrorKind, GLOBAL_IDENTITY_SCOPE};

pub use plastmem_ai::OpenAiCompletionGateway;
pub use plastmem_graph_postgres::PostgresGraphAdapter;
