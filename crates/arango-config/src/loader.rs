//! Loading [`ClientConfig`] from TOML

use crate::{ConnectionConfig, CursorDefaults};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level client configuration
///
/// ```toml
/// [connection]
/// host = "localhost"
/// port = 8529
/// database = "shop"
///
/// [cursor]
/// count = true
/// batch_size = 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server location
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Cursor defaults
    #[serde(default)]
    pub cursor: CursorDefaults,
}

impl ClientConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML configuration file
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading client config from {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_parse_full_toml() {
        let content = r#"
[connection]
host = "arango"
port = 9000
https = true
database = "shop"
timeout_secs = 3

[cursor]
count = false
batch_size = 50
"#;

        let config = ClientConfig::from_toml_str(content).unwrap();
        assert_eq!(config.connection.host, "arango");
        assert_eq!(config.connection.port, 9000);
        assert!(config.connection.https);
        assert_eq!(config.connection.database, Some("shop".to_string()));
        assert_eq!(config.connection.timeout_secs, 3);
        assert!(!config.cursor.count);
        assert_eq!(config.cursor.batch_size, Some(50));
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = ClientConfig::from_toml_str("[connection]\nport = 1234\n").unwrap();
        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.connection.port, 1234);
        assert!(config.cursor.count);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = ClientConfig::from_toml_str("[connection\nport = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arango.toml");
        std::fs::write(&path, "[cursor]\nbatch_size = 10\n").unwrap();

        let config = ClientConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.cursor.batch_size, Some(10));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = ClientConfig::load_from_file("/nonexistent/arango.toml")
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
