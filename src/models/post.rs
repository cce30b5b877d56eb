use serde::{Deserialize, Serialize};

use super::Entity;

/// A post, used by the deduplication screen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
  pub user_id: u64,
  pub id: u64,
  pub title: String,
  pub body: String,
}

impl Entity for Post {
  type Id = u64;

  fn id(&self) -> u64 {
    self.id
  }

  fn resource() -> &'static str {
    "posts"
  }
}
