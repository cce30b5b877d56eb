use serde::{Deserialize, Serialize};

use super::Entity;

/// A movie in the watch history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
  pub id: u64,
  pub title: String,
  pub description: String,
  pub image_url: String,
  pub year: u32,
  pub director: String,
  pub duration: String,
  #[serde(default)]
  pub genre: Vec<String>,
  pub rate: f64,
}

impl Entity for Movie {
  type Id = u64;

  fn id(&self) -> u64 {
    self.id
  }

  fn resource() -> &'static str {
    "movies"
  }
}
