/// Strips any character that is not a letter, number, whitespace, `-`, or `_`, collapses
/// runs of whitespace to a single space, and trims the result.
///
/// RediSearch-class engines reject punctuation and operator tokens, so every query the core
/// hands to a `GraphAdapter` search call passes through here first.
#[must_use]
pub fn sanitize_query(query: &str) -> String {
  let filtered: String = query
    .chars()
    .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
    .collect();

  let collapsed = filtered.split_whitespace().collect::<Vec<_>>().join(" ");
  collapsed.trim().to_owned()
}
