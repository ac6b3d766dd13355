/// Persona + ongoing Story handed to the caller's turn entry point. Consumed verbatim by
/// Phase 5 rewrite prompts and by narrative synthesis, both of which forbid emitting identity
/// headers in their output.
#[derive(Debug, Clone)]
pub struct IdentityBundle {
  /// The agent's persona/system description ("SOUL").
  pub soul: String,
  /// The current Story body ("STORY"), already narrativized.
  pub story: String,
}

impl IdentityBundle {
  #[must_use]
  pub fn new(soul: impl Into<String>, story: impl Into<String>) -> Self {
    Self { soul: soul.into(), story: story.into() }
  }

  /// Rendered as `SOUL:\n...\n\nSTORY:\n...` for inclusion in LLM prompts.
  #[must_use]
  pub fn render(&self) -> String {
    format!("SOUL:\n{}\n\nSTORY:\n{}", self.soul, self.story)
  }
}
