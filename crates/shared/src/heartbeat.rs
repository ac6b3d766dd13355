/// A message is a heartbeat iff it both references `HEARTBEAT.md` and confirms `HEARTBEAT_OK`,
/// or is exactly `HEARTBEAT_OK` once trimmed. Heartbeats must never enter long-term memory.
///
/// This is intentionally string-based, not intent-based: a message that happens to contain
/// both substrings for unrelated reasons is still dropped. Don't try to be clever here.
#[must_use]
pub fn is_heartbeat(text: &str) -> bool {
  (text.contains("Read HEARTBEAT.md") && text.contains("HEARTBEAT_OK")) || text.trim() == "HEARTBEAT_OK"
}
