use plastmem_completion::{CompletionGateway, CompletionRequest, ModelDescriptor};
use plastmem_shared::{AppError, MemoryErrorKind};

use crate::identity_bundle::IdentityBundle;

const WORD_BUDGET: usize = 4000;

const BOOTSTRAP_PERSONA: &str = "\
You are narrating your own life story in the first person — 'I', 'me', 'my'. You have no \
story yet; this is the beginning. Read the transcript below and write your autobiography so \
far as a sequence of chapters.";

const UPDATE_PERSONA: &str = "\
You are narrating your own life story in the first person — 'I', 'me', 'my'. You already have \
a story; weave the new transcript below into it, continuing naturally. Do not duplicate prior \
events — focus on what has grown or changed since.";

const FORMAT_RULES: &str = "\
Format: chapters headed `### [YYYY-MM-DD HH:MM] Title`, paragraphs separated by a blank line, \
total length at most 4000 words. Do not emit any `LAST_PROCESSED` comment or other identity \
headers — those are added separately.";

/// Builds and runs the narrative-synthesis prompt. Returns the new Story body, compressed if
/// it exceeds the word budget. On any failure the *previous* Story text is returned
/// unchanged — no partial Story is ever observable.
pub async fn update_narrative_story(
  transcript: &str,
  current_story: &str,
  identity: &IdentityBundle,
  gateway: &dyn CompletionGateway,
  model: &ModelDescriptor,
) -> Result<String, AppError> {
  let bootstrap = current_story.trim().is_empty();
  let persona = if bootstrap { BOOTSTRAP_PERSONA } else { UPDATE_PERSONA };

  let prompt = format!(
    "{persona}\n\n{FORMAT_RULES}\n\nIdentity (for voice and context only — never echo these headers):\n{}\n\nCurrent story so far:\n{current_story}\n\nNew transcript to narrativize:\n{transcript}",
    identity.render(),
  );

  let request = CompletionRequest::new(prompt, model.clone(), 0.0);
  let response = gateway.complete(request).await?;

  if response.is_empty_with_error() || response.text.trim().is_empty() {
    tracing::warn!("narrative synthesis returned no usable text, keeping story unchanged");
    return Err(MemoryErrorKind::CompletionEmpty.into());
  }

  let new_story = response.text.trim().to_owned();

  if word_count(&new_story) > WORD_BUDGET {
    return Ok(compress_story(&new_story, gateway, model).await.unwrap_or(new_story));
  }

  Ok(new_story)
}

const COMPRESSION_SYSTEM_PROMPT: &str = "\
Compress the following first-person autobiography to at most 4000 words. Preserve the \
narrator's voice, keep every chapter header, and preserve the emotional arc — cut detail, \
not substance.";

/// Separate compression pass, raised as `StoryTooLong` on failure. If this also fails, the
/// caller should keep the uncompressed text rather than lose the Story entirely.
pub async fn compress_story(story: &str, gateway: &dyn CompletionGateway, model: &ModelDescriptor) -> Result<String, AppError> {
  let prompt = format!("{COMPRESSION_SYSTEM_PROMPT}\n\n{story}");
  let request = CompletionRequest::new(prompt, model.clone(), 0.0);
  let response = gateway.complete(request).await?;

  if response.is_empty_with_error() || response.text.trim().is_empty() {
    tracing::warn!("story compression failed, keeping uncompressed text");
    return Err(MemoryErrorKind::StoryTooLong.into());
  }

  Ok(response.text.trim().to_owned())
}

#[must_use]
pub fn word_count(text: &str) -> usize {
  text.split_whitespace().count()
}
