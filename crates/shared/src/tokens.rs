/// Rough token estimate used for the pending-log running total and consolidation thresholds.
///
/// Approximates the common "~4 chars per token" rule of thumb rather than invoking a real
/// tokenizer — the threshold comparisons this feeds are coarse-grained (thousands of tokens)
/// and don't need exact BPE counts.
#[must_use]
pub fn estimate_tokens(text: &str) -> u64 {
  let chars = text.chars().count() as u64;
  chars.div_ceil(4).max(u64::from(!text.is_empty()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_text_is_zero_tokens() {
    assert_eq!(estimate_tokens(""), 0);
  }

  #[test]
  fn nonempty_text_is_at_least_one_token() {
    assert_eq!(estimate_tokens("hi"), 1);
  }

  #[test]
  fn scales_roughly_with_length() {
    let short = estimate_tokens("a".repeat(40).as_str());
    let long = estimate_tokens("a".repeat(400).as_str());
    assert_eq!(short * 10, long);
  }
}
