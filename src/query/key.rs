use std::fmt;

/// Address of one cache entry.
///
/// Keys are composite: a resource tag plus an optional discriminator (item
/// identifier or page number). At most one entry exists per key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueryKey {
  /// The full collection for a resource
  Collection(&'static str),
  /// A single item, addressed by identifier
  Item(&'static str, String),
  /// One page of a paged listing
  Page(&'static str, u32),
  /// The accumulated page window of an infinite feed
  Feed(&'static str),
}

impl QueryKey {
  pub fn collection(resource: &'static str) -> Self {
    QueryKey::Collection(resource)
  }

  pub fn item(resource: &'static str, id: impl fmt::Display) -> Self {
    QueryKey::Item(resource, id.to_string())
  }

  pub fn page(resource: &'static str, page: u32) -> Self {
    QueryKey::Page(resource, page)
  }

  pub fn feed(resource: &'static str) -> Self {
    QueryKey::Feed(resource)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      QueryKey::Collection(resource) => write!(f, "{}", resource),
      QueryKey::Item(resource, id) => write!(f, "{}/{}", resource, id),
      QueryKey::Page(resource, page) => write!(f, "{}?page={}", resource, page),
      QueryKey::Feed(resource) => write!(f, "{}#feed", resource),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_item_keys_distinct_per_id() {
    assert_ne!(QueryKey::item("movies", 1), QueryKey::item("movies", 2));
    assert_eq!(QueryKey::item("movies", 1), QueryKey::item("movies", 1));
  }

  #[test]
  fn test_collection_and_feed_are_distinct() {
    assert_ne!(
      format!("{}", QueryKey::collection("commodities")),
      format!("{}", QueryKey::feed("commodities"))
    );
  }
}
