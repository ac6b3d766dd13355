use chrono::{DateTime, Utc};
use plastmem_completion::{CompletionGateway, ModelDescriptor};
use plastmem_shared::{estimate_tokens, AppError};

use crate::identity_bundle::IdentityBundle;

use super::synthesis::update_narrative_story;

/// One unit of input to the dynamic chunker: text plus the timestamp it should anchor the
/// batch at if it is the last item flushed in that batch.
pub struct ChunkItem {
  pub text: String,
  pub timestamp: DateTime<Utc>,
}

/// Dynamic chunking shared by cold-start bootstrap and both narrative-sync paths: accumulate
/// items into a rolling batch; whenever adding the next
/// item would exceed `safe_token_limit`, flush the batch through `updateNarrativeStory`
/// (evolving the running story) before starting a new one. The final non-empty batch is
/// always flushed.
///
/// Returns the final story text and the anchor timestamp of the last successful flush, or
/// `None` if nothing was flushed (e.g. all items were skipped/empty).
pub async fn chunked_consolidate(
  items: Vec<ChunkItem>,
  mut story: String,
  identity: &IdentityBundle,
  safe_token_limit: u64,
  gateway: &dyn CompletionGateway,
  model: &ModelDescriptor,
) -> Result<Option<(String, DateTime<Utc>)>, AppError> {
  let mut batch = String::new();
  let mut batch_tokens = 0u64;
  let mut batch_anchor: Option<DateTime<Utc>> = None;
  let mut last_flush: Option<DateTime<Utc>> = None;

  for item in items {
    if item.text.trim().is_empty() {
      continue;
    }

    let item_tokens = estimate_tokens(&item.text);

    if !batch.is_empty() && batch_tokens + item_tokens > safe_token_limit {
      let anchor = batch_anchor.expect("non-empty batch always has an anchor");
      story = update_narrative_story(&batch, &story, identity, gateway, model).await?;
      last_flush = Some(anchor);
      batch.clear();
      batch_tokens = 0;
      batch_anchor = None;
    }

    if !batch.is_empty() {
      batch.push_str("\n---\n");
    }
    batch.push_str(&item.text);
    batch_tokens += item_tokens;
    batch_anchor = Some(batch_anchor.map_or(item.timestamp, |current| current.max(item.timestamp)));
  }

  if !batch.is_empty() {
    let anchor = batch_anchor.expect("non-empty batch always has an anchor");
    story = update_narrative_story(&batch, &story, identity, gateway, model).await?;
    last_flush = Some(anchor);
  }

  Ok(last_flush.map(|anchor| (story, anchor)))
}
