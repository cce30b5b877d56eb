use thiserror::Error;

/// Maximum length of a response body quoted in an error message
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Errors surfaced by the catalog server client.
///
/// All variants are recoverable from the caller's point of view: the query
/// layer records them as failed fetch or mutation results, it never panics
/// on them.
#[derive(Error, Debug)]
pub enum ApiError {
  #[error("request timed out")]
  Timeout,

  #[error("resource not found: {0}")]
  NotFound(String),

  #[error("server returned {status}: {message}")]
  Status { status: u16, message: String },

  #[error("network error: {0}")]
  Network(reqwest::Error),

  #[error("invalid response: {0}")]
  InvalidResponse(String),

  #[error("invalid request url: {0}")]
  InvalidUrl(String),
}

impl ApiError {
  /// Classify a non-2xx response by status code.
  pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
    let message = truncate_body(body);
    match status.as_u16() {
      404 => ApiError::NotFound(message),
      code => ApiError::Status {
        status: code,
        message,
      },
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      ApiError::Timeout
    } else if err.is_decode() {
      ApiError::InvalidResponse(err.to_string())
    } else {
      ApiError::Network(err)
    }
  }
}

/// Truncate a response body so error messages stay readable
fn truncate_body(body: &str) -> String {
  if body.len() <= MAX_ERROR_BODY_LENGTH {
    body.to_string()
  } else {
    let cut = body
      .char_indices()
      .take_while(|(i, _)| *i < MAX_ERROR_BODY_LENGTH)
      .last()
      .map(|(i, c)| i + c.len_utf8())
      .unwrap_or(0);
    format!("{}... ({} bytes total)", &body[..cut], body.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_status_not_found() {
    let err = ApiError::from_status(reqwest::StatusCode::NOT_FOUND, "no such movie");
    assert!(matches!(err, ApiError::NotFound(_)));
  }

  #[test]
  fn test_from_status_server_error() {
    let err = ApiError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom");
    match err {
      ApiError::Status { status, message } => {
        assert_eq!(status, 500);
        assert_eq!(message, "boom");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn test_truncate_body_long() {
    let body = "x".repeat(500);
    let truncated = truncate_body(&body);
    assert!(truncated.len() < body.len());
    assert!(truncated.contains("500 bytes total"));
  }
}
