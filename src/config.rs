use std::path::{Path, PathBuf};

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  pub server: ServerConfig,
  /// Custom title for the header (defaults to the server host if not set)
  pub title: Option<String>,
  /// Age in seconds after which cached pages re-validate
  pub stale_secs: u32,
  /// Auto-refetch period for the polling screen, in seconds
  pub poll_secs: u32,
  /// Page size for page-by-page browsing
  pub page_size: u32,
  /// Page size for the infinite feed
  pub feed_page_size: u32,
  /// Maximum pages retained by the infinite feed window
  pub max_feed_pages: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub url: String,
  pub timeout_secs: u64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      server: ServerConfig::default(),
      title: None,
      stale_secs: 60,
      poll_secs: 10,
      page_size: 10,
      feed_page_size: 7,
      max_feed_pages: 3,
    }
  }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      url: "http://localhost:8080".to_string(),
      timeout_secs: 10,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./marquee.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/marquee/config.yaml
  ///
  /// The demo server needs no credentials, so a missing config file just
  /// means defaults.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("marquee.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("marquee").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.server.url, "http://localhost:8080");
    assert_eq!(config.stale_secs, 60);
    assert_eq!(config.max_feed_pages, 3);
  }

  #[test]
  fn test_parse_partial_yaml() {
    let yaml = "server:\n  url: http://10.0.2.2:8080\npoll_secs: 5\n";
    let config: Config = serde_yaml::from_str(yaml).expect("parse config");
    assert_eq!(config.server.url, "http://10.0.2.2:8080");
    assert_eq!(config.poll_secs, 5);
    // Unspecified fields keep their defaults
    assert_eq!(config.server.timeout_secs, 10);
    assert_eq!(config.page_size, 10);
  }
}
