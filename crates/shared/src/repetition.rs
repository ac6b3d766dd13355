/// Suppresses LLM degenerate repetition loops.
///
/// For descending `len` from `floor(n/2)` down to 3, scans for the first position `i` such
/// that `text[i..i+len] == text[i+len..i+2*len]` and the matched chunk has at least 3
/// non-whitespace characters. On the first such match the text is truncated to `text[..i+len]`.
/// Operates on `char` boundaries so multi-byte UTF-8 content is never split mid-character.
#[must_use]
pub fn truncate_repetitive(text: &str) -> String {
  let chars: Vec<char> = text.chars().collect();
  let n = chars.len();
  let max_len = n / 2;

  if max_len < 3 {
    return text.to_owned();
  }

  for len in (3..=max_len).rev() {
    for i in 0..=(n - 2 * len) {
      let first = &chars[i..i + len];
      let second = &chars[i + len..i + 2 * len];
      if first != second {
        continue;
      }
      let non_whitespace = first.iter().filter(|c| !c.is_whitespace()).count();
      if non_whitespace >= 3 {
        return chars[..i + len].iter().collect();
      }
    }
  }

  text.to_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn leaves_non_repetitive_text_untouched() {
    let text = "the quick brown fox jumps over the lazy dog";
    assert_eq!(truncate_repetitive(text), text);
  }

  #[test]
  fn truncates_an_exact_doubled_phrase() {
    let text = "I am stuck in a loop I am stuck in a loop and more garbage after";
    let out = truncate_repetitive(text);
    assert_eq!(out, "I am stuck in a loop I am stuck in a loop");
  }

  #[test]
  fn ignores_short_whitespace_only_matches() {
    // Repeated short/whitespace-dominated chunks shouldn't trigger truncation.
    let text = "a  a  a  a  a  a  a  a";
    let out = truncate_repetitive(text);
    assert_eq!(out, text);
  }

  #[test]
  fn is_idempotent() {
    let cases = [
      "the quick brown fox jumps over the lazy dog",
      "I am stuck in a loop I am stuck in a loop and more garbage after",
      "hello hello hello hello hello hello",
      "",
      "ab",
    ];
    for case in cases {
      let once = truncate_repetitive(case);
      let twice = truncate_repetitive(&once);
      assert_eq!(once, twice, "not idempotent for {case:?}");
    }
  }
}
