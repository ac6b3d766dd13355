use std::sync::LazyLock;

use futures::future::join_all;
use plastmem_completion::{CompletionGateway, CompletionRequest, ModelDescriptor};
use regex::Regex;

use super::labeling::Flashback;
use crate::identity_bundle::IdentityBundle;

const ANTI_HALLUCINATION_RULES: &str = "\
Rules: do not invent anything not present in the memories below. Do not add sensory details \
that are not in the source. Only rephrase style and point of view into first person. Keep \
every fact. Do not emit any identity/persona headers in your output.";

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(-|\*|•|---)").unwrap());

fn group_header(display_query: &str) -> String {
  format!("--- PENSAR EN \"{display_query}\" ME RECUERDA QUE ---")
}

fn render_bullets(items: &[Flashback]) -> String {
  let mut sorted = items.to_vec();
  sorted.sort_by_key(|f| f.effective_timestamp);
  sorted.iter().map(|f| format!("- ({}) {}", f.relative_label, f.content)).collect::<Vec<_>>().join("\n")
}

/// The programmatic fallback block used when rewriting is unavailable, disabled, or the LLM
/// call fails/returns nothing usable — the raw grouped bullets with a transition line.
fn fallback_block(display_query: &str, items: &[Flashback]) -> String {
  format!("{}\n{}", group_header(display_query), render_bullets(items))
}

fn rewrite_prompt(display_query: &str, items: &[Flashback], identity: &IdentityBundle, current_user_message: &str) -> String {
  format!(
    "{}\n{}\n\n{}\n\nCurrent user message (for language detection only):\n{current_user_message}\n\n{ANTI_HALLUCINATION_RULES}",
    group_header(display_query),
    render_bullets(items),
    identity.render(),
  )
}

/// Keeps only lines that begin with a list marker or mention "reminds me" / "recuerda que".
/// Can be over-aggressive if the LLM phrases things differently; widened here to also keep
/// the header line itself.
fn filter_rewrite_output(text: &str, display_query: &str) -> String {
  let header = group_header(display_query);
  let kept: Vec<&str> = text
    .lines()
    .filter(|line| {
      let lower = line.to_lowercase();
      line.trim() == header
        || LIST_MARKER.is_match(line)
        || lower.contains("reminds me")
        || lower.contains("recuerda que")
    })
    .collect();
  kept.join("\n")
}

async fn rewrite_one(
  display_query: String,
  items: Vec<Flashback>,
  identity: &IdentityBundle,
  current_user_message: &str,
  gateway: &dyn CompletionGateway,
  model: &ModelDescriptor,
) -> String {
  let prompt = rewrite_prompt(&display_query, &items, identity, current_user_message);
  let request = CompletionRequest::new(prompt, model.clone(), 0.0);

  match gateway.complete(request).await {
    Ok(response) if !response.is_empty_with_error() && !response.text.trim().is_empty() => {
      let filtered = filter_rewrite_output(&response.text, &display_query);
      if filtered.trim().is_empty() {
        fallback_block(&display_query, &items)
      } else {
        filtered
      }
    }
    Ok(_) => fallback_block(&display_query, &items),
    Err(err) => {
      tracing::warn!(query = %display_query, %err, "rewrite call failed, falling back to raw bullets");
      fallback_block(&display_query, &items)
    }
  }
}

/// Phase 5 — Re-narrativization. For each query-group, independently (and concurrently) asks
/// the `CompletionGateway` to rewrite the grouped bullets as first-person flashback prose. If
/// no gateway is available, the call fails, or the filtered output is empty, falls back to
/// the raw grouped bullets with a programmatic transition line.
pub async fn rewrite_groups(
  groups: Vec<(String, Vec<Flashback>)>,
  identity: &IdentityBundle,
  current_user_message: &str,
  gateway: Option<&dyn CompletionGateway>,
  model: &ModelDescriptor,
) -> Vec<String> {
  let Some(gateway) = gateway else {
    return groups.iter().map(|(query, items)| fallback_block(query, items)).collect();
  };

  let futures = groups
    .into_iter()
    .map(|(display_query, items)| rewrite_one(display_query, items, identity, current_user_message, gateway, model));

  join_all(futures).await
}
