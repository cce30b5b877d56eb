//! Small rendering helpers shared by the views.

use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Human-readable age of a cache timestamp ("just now", "42s ago", "3m ago")
pub fn age(fetched_at: Option<DateTime<Utc>>) -> String {
  let Some(at) = fetched_at else {
    return "never".to_string();
  };
  let seconds = (Utc::now() - at).num_seconds();
  if seconds < 2 {
    // Covers clock skew too
    "just now".to_string()
  } else if seconds < 60 {
    format!("{}s ago", seconds)
  } else if seconds < 3600 {
    format!("{}m ago", seconds / 60)
  } else {
    format!("{}h ago", seconds / 3600)
  }
}

/// Color for a movie rating out of 10
pub fn rating_color(rate: f64) -> Color {
  if rate >= 8.0 {
    Color::Green
  } else if rate >= 6.0 {
    Color::Yellow
  } else {
    Color::Red
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_age_never() {
    assert_eq!(age(None), "never");
  }

  #[test]
  fn test_age_just_now() {
    assert_eq!(age(Some(Utc::now())), "just now");
  }

  #[test]
  fn test_age_seconds_and_minutes() {
    assert_eq!(age(Some(Utc::now() - Duration::seconds(42))), "42s ago");
    assert_eq!(age(Some(Utc::now() - Duration::seconds(200))), "3m ago");
  }

  #[test]
  fn test_rating_color_bands() {
    assert_eq!(rating_color(9.1), Color::Green);
    assert_eq!(rating_color(6.5), Color::Yellow);
    assert_eq!(rating_color(4.0), Color::Red);
  }
}
