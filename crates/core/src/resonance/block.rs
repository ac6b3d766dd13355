/// Phase 6 — Injection. Wraps the concatenated group blocks in fixed `ResonanceBlock`
/// delimiters so the caller can append the result verbatim to its system prompt. An empty
/// `groups` list means nothing resonated this turn and yields the empty string — a normal,
/// non-error outcome, not a degraded one.
#[must_use]
pub fn wrap(group_blocks: &[String]) -> String {
  if group_blocks.is_empty() {
    return String::new();
  }

  let body = group_blocks.join("\n\n");
  format!("\n---\n[SUBCONSCIOUS RESONANCE]\n{body}\n---\n")
}
