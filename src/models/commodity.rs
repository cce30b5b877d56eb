use serde::{Deserialize, Serialize};

use super::Entity;

/// A commodity row from the paged listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commodity {
  pub id: u64,
  pub name: String,
  pub price: f64,
  pub quantity: u64,
}

/// One page of commodities in the server's paginate envelope.
///
/// `prev`/`next` are page numbers and are null at the edges of the
/// collection, which is how callers detect the first and last page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityPage {
  pub first: u32,
  pub prev: Option<u32>,
  pub next: Option<u32>,
  pub last: u32,
  pub pages: u32,
  pub items: u64,
  pub data: Vec<Commodity>,
}

impl Entity for Commodity {
  type Id = u64;

  fn id(&self) -> u64 {
    self.id
  }

  fn resource() -> &'static str {
    "commodities"
  }
}
