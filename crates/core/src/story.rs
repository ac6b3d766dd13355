use std::path::{Path, PathBuf};

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use plastmem_shared::AppError;
use regex::Regex;

static LAST_PROCESSED_COMMENT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)^<!--\s*LAST_PROCESSED:\s*([^>]*?)\s*-->\s*\n?").unwrap());

const EPOCH: &str = "1970-01-01T00:00:00Z";
const PLACEHOLDER_BODY: &str = "### [1970-01-01 00:00] Beginnings\n\nI have not begun narrating my story yet.\n";

/// The first-person Story file plus its high-water mark.
#[derive(Debug, Clone)]
pub struct Story {
  pub last_processed: Option<DateTime<Utc>>,
  /// Narrative body with the `LAST_PROCESSED` header stripped.
  pub body: String,
}

impl Story {
  /// Reads and parses the Story file. A missing file reads as a brand-new, empty Story.
  pub fn read(path: &Path) -> Result<Self, AppError> {
    let raw = std::fs::read_to_string(path).unwrap_or_default();
    Ok(Self::parse(&raw))
  }

  fn parse(raw: &str) -> Self {
    let mut lines = raw.lines();
    let last_processed = lines.next().and_then(parse_header_line);
    let body = LAST_PROCESSED_COMMENT.replace_all(raw, "").trim_start_matches('\n').to_owned();
    Self { last_processed, body }
  }

  /// Readers treat `LAST_PROCESSED` as authoritative; if unparseable, fall back to the file's
  /// mtime, and if that's unavailable too, `None` (legacy/missing file).
  #[must_use]
  pub fn effective_anchor(&self, path: &Path) -> Option<DateTime<Utc>> {
    self.last_processed.or_else(|| mtime(path))
  }

  /// A Story is "new" if, after stripping any header comments, the remaining content is
  /// empty or whitespace-only — including a file that contains only a header.
  #[must_use]
  pub fn is_new(&self) -> bool {
    self.body.trim().is_empty()
  }

  #[must_use]
  pub fn word_count(&self) -> usize {
    self.body.split_whitespace().count()
  }

  /// Writes `body` anchored at `anchor`, stripping any `LAST_PROCESSED` comments the caller's
  /// generated body may already contain, then prepending a fresh header. Crash-safe: writes
  /// to `<path>.tmp`, then renames over `path`.
  pub fn write(path: &Path, body: &str, anchor: DateTime<Utc>) -> Result<(), AppError> {
    let stripped = LAST_PROCESSED_COMMENT.replace_all(body, "");
    let contents = format!("<!-- LAST_PROCESSED: {} -->\n\n{}", anchor.to_rfc3339(), stripped.trim_start_matches('\n'));

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
  }

  /// Writes a skeleton Story anchored at the Unix epoch, used when cold-start bootstrap is
  /// disabled so the "new story" branch is not re-taken on the next turn.
  pub fn write_skeleton(path: &Path) -> Result<(), AppError> {
    let anchor = DateTime::parse_from_rfc3339(EPOCH).unwrap().with_timezone(&Utc);
    Self::write(path, PLACEHOLDER_BODY, anchor)
  }
}

fn parse_header_line(line: &str) -> Option<DateTime<Utc>> {
  let captures = LAST_PROCESSED_COMMENT.captures(&format!("{line}\n"))?;
  let raw = captures.get(1)?.as_str();
  DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

fn mtime(path: &Path) -> Option<DateTime<Utc>> {
  let metadata = std::fs::metadata(path).ok()?;
  let modified = metadata.modified().ok()?;
  Some(DateTime::<Utc>::from(modified))
}

/// Default resolved path for a Story file given the configured filename and workspace dir.
#[must_use]
pub fn story_path(workspace: &Path, filename: &str) -> PathBuf {
  workspace.join(filename)
}
