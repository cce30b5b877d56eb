use serde::{Deserialize, Serialize};

use super::Entity;

/// A todo item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
  pub id: u64,
  pub title: String,
  pub completed: bool,
}

/// Body for creating a todo; the server assigns the id
#[derive(Debug, Clone, Serialize)]
pub struct NewTodo {
  pub title: String,
  pub completed: bool,
}

impl NewTodo {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      completed: false,
    }
  }
}

impl Entity for Todo {
  type Id = u64;

  fn id(&self) -> u64 {
    self.id
  }

  fn resource() -> &'static str {
    "todos"
  }
}
