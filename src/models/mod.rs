//! Resource types served by the catalog server.

mod commodity;
mod movie;
mod post;
mod report;
mod todo;

pub use commodity::{Commodity, CommodityPage};
pub use movie::Movie;
pub use post::Post;
pub use report::Report;
pub use todo::{NewTodo, Todo};

use std::fmt::Display;

use serde::{de::DeserializeOwned, Serialize};

/// Trait for uniquely-identified resources that participate in the query cache.
///
/// The identifier is an opaque token: it is compared for equality and printed
/// into cache keys, nothing else.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Identifier type (e.g. a numeric id assigned by the server)
  type Id: Clone + PartialEq + Display + Send + Sync + 'static;

  /// The identifier of this item
  fn id(&self) -> Self::Id;

  /// Collection path segment on the server (e.g. "movies")
  fn resource() -> &'static str;
}
