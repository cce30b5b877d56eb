use serde::{Deserialize, Serialize};

use super::Entity;

/// A report summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
  pub id: u64,
  pub title: String,
  pub description: String,
  pub date: String,
}

impl Entity for Report {
  type Id = u64;

  fn id(&self) -> u64 {
    self.id
  }

  fn resource() -> &'static str {
    "reports"
  }
}
