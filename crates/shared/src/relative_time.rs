use chrono::{DateTime, Datelike, Timelike, Utc};

/// `<day-part>` suffix used by several buckets in the relative-time label table.
fn day_part(hour: u32) -> &'static str {
  match hour {
    6..=12 => "in the morning",
    13..=19 => "in the afternoon",
    1..=5 => "in the early morning",
    _ => "at night", // 20..=23, 0
  }
}

fn exact_date_suffix(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let day_month = then.format("%-d %b");
  if then.year() == now.year() {
    format!(" — {day_month}")
  } else {
    format!(" — {day_month} {}", then.year())
  }
}

/// Computes the human-readable relative-time label described by the fixed label table,
/// with the exact calendar date appended. `then` must not be later than `now`; if it is
/// (clock skew), the label degrades to "just a moment ago" rather than panicking.
#[must_use]
pub fn relative_time_label(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let delta = now.signed_duration_since(then);
  let seconds = delta.num_seconds().max(0);
  let label = label_for_delta(seconds, then.hour());
  format!("{label}{}", exact_date_suffix(then, now))
}

fn label_for_delta(seconds: i64, then_hour: u32) -> String {
  if seconds < 60 {
    return "just a moment ago".to_owned();
  }

  let minutes = seconds / 60;
  if minutes < 60 {
    return match minutes {
      1 => "a minute ago".to_owned(),
      2..=4 => "a few minutes ago".to_owned(),
      n => format!("about {n} minutes ago"),
    };
  }

  let hours = minutes / 60;
  if hours < 24 {
    return match hours {
      1 => "almost 1h ago".to_owned(),
      2..=3 => format!("less than {}h ago", hours + 1),
      4..=7 => "a few hours ago".to_owned(),
      _ => format!("this {}", day_part(then_hour)),
    };
  }

  let days = hours / 24;
  match days {
    1 => return format!("yesterday {}", day_part(then_hour)),
    2 => return format!("the day before yesterday {}", day_part(then_hour)),
    3..=6 => return format!("{days} days ago {}", day_part(then_hour)),
    7..=13 => return "last week".to_owned(),
    14..=29 => return format!("{} weeks ago", days / 7),
    _ => {}
  }

  let months = days / 30;
  if months <= 10 {
    return format!("{months} month{} ago", if months == 1 { "" } else { "s" });
  }
  if months == 11 {
    return "almost a year ago".to_owned();
  }
  if months <= 23 {
    return if months < 18 {
      "a year and a few months ago".to_owned()
    } else {
      "almost 2 years ago".to_owned()
    };
  }

  let years = months / 12;
  let remainder_months = months % 12;
  if years <= 4 {
    return if remainder_months < 6 {
      format!("{years} years ago or so")
    } else {
      format!("almost {} years ago", years + 1)
    };
  }

  format!("about {years} years ago")
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeDelta;

  #[test]
  fn just_a_moment_ago() {
    let now = Utc::now();
    let then = now - TimeDelta::seconds(10);
    assert!(relative_time_label(then, now).starts_with("just a moment ago"));
  }

  #[test]
  fn yesterday_includes_day_part() {
    let now = Utc::now();
    let then = now - TimeDelta::hours(26);
    let label = relative_time_label(then, now);
    assert!(label.starts_with("yesterday "), "{label}");
  }

  #[test]
  fn last_week_bucket() {
    let now = Utc::now();
    let then = now - TimeDelta::days(10);
    assert!(relative_time_label(then, now).starts_with("last week"));
  }

  #[test]
  fn old_memories_say_about_n_years() {
    let now = Utc::now();
    let then = now - TimeDelta::days(365 * 6);
    assert!(relative_time_label(then, now).starts_with("about 6 years ago"));
  }

  #[test]
  fn future_timestamp_degrades_gracefully() {
    let now = Utc::now();
    let then = now + TimeDelta::hours(5);
    assert!(relative_time_label(then, now).starts_with("just a moment ago"));
  }

  #[test]
  fn appends_exact_date() {
    let now = Utc::now();
    let then = now - TimeDelta::days(40);
    let label = relative_time_label(then, now);
    assert!(label.contains(" — "), "{label}");
  }
}
