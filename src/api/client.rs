//! Request/response wrapper for the catalog server's JSON endpoints.

use color_eyre::{eyre::eyre, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::models::{CommodityPage, Movie, NewTodo, Post, Report, Todo};

use super::ApiError;

/// Client for the catalog server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  base: Url,
}

impl ApiClient {
  /// Create a client from the configured base address and timeout.
  pub fn new(config: &Config) -> Result<Self> {
    // A trailing slash keeps Url::join appending instead of replacing
    let mut raw = config.server.url.trim_end_matches('/').to_string();
    raw.push('/');
    let base = Url::parse(&raw)
      .map_err(|e| eyre!("Invalid server url {}: {}", config.server.url, e))?;

    let client = Client::builder()
      .timeout(std::time::Duration::from_secs(config.server.timeout_secs))
      .build()?;

    Ok(Self { client, base })
  }

  /// Host and port of the server, for header display
  pub fn server_label(&self) -> String {
    match (self.base.host_str(), self.base.port()) {
      (Some(host), Some(port)) => format!("{}:{}", host, port),
      (Some(host), None) => host.to_string(),
      _ => self.base.to_string(),
    }
  }

  fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
    self
      .base
      .join(path)
      .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
  }

  async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
      Ok(response)
    } else {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      Err(ApiError::from_status(status, &body))
    }
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    let url = self.endpoint(path)?;
    debug!(%url, "GET");
    let response = self.client.get(url).send().await?;
    let response = Self::check(response).await?;
    Ok(response.json().await?)
  }

  async fn post_json<T: DeserializeOwned, B: Serialize>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, ApiError> {
    let url = self.endpoint(path)?;
    debug!(%url, "POST");
    let response = self.client.post(url).json(body).send().await?;
    let response = Self::check(response).await?;
    Ok(response.json().await?)
  }

  async fn delete(&self, path: &str) -> Result<(), ApiError> {
    let url = self.endpoint(path)?;
    debug!(%url, "DELETE");
    let response = self.client.delete(url).send().await?;
    Self::check(response).await?;
    Ok(())
  }

  // ===== Movies =====

  pub async fn movies(&self) -> Result<Vec<Movie>, ApiError> {
    self.get_json("movies").await
  }

  pub async fn movie(&self, id: u64) -> Result<Movie, ApiError> {
    self.get_json(&format!("movies/{}", id)).await
  }

  pub async fn delete_movie(&self, id: u64) -> Result<(), ApiError> {
    self.delete(&format!("movies/{}", id)).await
  }

  // ===== Todos =====

  pub async fn todos(&self) -> Result<Vec<Todo>, ApiError> {
    self.get_json("todos").await
  }

  pub async fn create_todo(&self, title: &str) -> Result<Todo, ApiError> {
    self.post_json("todos", &NewTodo::new(title)).await
  }

  // ===== Commodities =====

  /// Fetch one page of commodities in the server's paginate envelope
  pub async fn commodities(&self, page: u32, per_page: u32) -> Result<CommodityPage, ApiError> {
    self
      .get_json(&format!("commodities?_page={}&_per_page={}", page, per_page))
      .await
  }

  // ===== Reports =====

  pub async fn reports(&self) -> Result<Vec<Report>, ApiError> {
    self.get_json("reports").await
  }

  pub async fn report(&self, id: u64) -> Result<Report, ApiError> {
    self.get_json(&format!("reports/{}", id)).await
  }

  // ===== Posts =====

  pub async fn posts(&self) -> Result<Vec<Post>, ApiError> {
    self.get_json("posts").await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;

  fn client_for(url: &str) -> ApiClient {
    let mut config = Config::default();
    config.server.url = url.to_string();
    ApiClient::new(&config).expect("client")
  }

  #[test]
  fn test_endpoint_joins_under_base() {
    let client = client_for("http://localhost:8080");
    let url = client.endpoint("movies/3").unwrap();
    assert_eq!(url.as_str(), "http://localhost:8080/movies/3");
  }

  #[test]
  fn test_endpoint_keeps_base_path() {
    let client = client_for("http://localhost:8080/api/");
    let url = client.endpoint("todos").unwrap();
    assert_eq!(url.as_str(), "http://localhost:8080/api/todos");
  }

  #[test]
  fn test_server_label() {
    let client = client_for("http://localhost:8080");
    assert_eq!(client.server_label(), "localhost:8080");
  }

  #[test]
  fn test_parse_paginate_envelope() {
    let json = r#"{
      "first": 1, "prev": null, "next": 2, "last": 5,
      "pages": 5, "items": 42,
      "data": [{"id": 1, "name": "Gold", "price": 1812.5, "quantity": 3}]
    }"#;

    let page: CommodityPage = serde_json::from_str(json).expect("parse envelope");
    assert_eq!(page.prev, None);
    assert_eq!(page.next, Some(2));
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].name, "Gold");
  }

  #[test]
  fn test_parse_movie_camel_case() {
    let json = r#"{
      "id": 7, "title": "Arrival", "description": "First contact",
      "imageUrl": "http://localhost:8080/img/arrival.jpg",
      "year": 2016, "director": "Denis Villeneuve", "duration": "1h 56m",
      "genre": ["sci-fi"], "rate": 7.9
    }"#;

    let movie: Movie = serde_json::from_str(json).expect("parse movie");
    assert_eq!(movie.image_url, "http://localhost:8080/img/arrival.jpg");
    assert_eq!(movie.year, 2016);
  }
}
