/// The single process-wide logical identity key all episodes and the Story are grouped under.
///
/// The subsystem does not implement cross-agent or cross-user memory isolation beyond this
/// one scope — callers that need per-user isolation run one subsystem instance per identity
/// rather than partitioning within a shared instance.
pub const GLOBAL_IDENTITY_SCOPE: &str = "global-user-memory";
