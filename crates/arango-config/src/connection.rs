//! Connection and cursor settings

use serde::{Deserialize, Serialize};

/// Where the database server lives and how long to wait for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host name
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use `https://` instead of `http://`
    #[serde(default)]
    pub https: bool,
    /// Database name; requests are routed through `/_db/{name}` when set
    #[serde(default)]
    pub database: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String { "localhost".to_string() }
fn default_port() -> u16 { 8529 }
fn default_timeout() -> u64 { 30 }
fn default_true() -> bool { true }

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            https: false,
            database: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl ConnectionConfig {
    /// Scheme, host and port, e.g. `http://localhost:8529`
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Base URL including the database prefix, if any
    pub fn endpoint(&self) -> String {
        match &self.database {
            Some(name) => format!("{}/_db/{}", self.base_url(), name),
            None => self.base_url(),
        }
    }
}

/// Defaults applied to every cursor created through a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorDefaults {
    /// Ask the server for the total row count
    #[serde(default = "default_true")]
    pub count: bool,
    /// Rows per batch; the server picks when unset
    #[serde(default)]
    pub batch_size: Option<u32>,
}

impl Default for CursorDefaults {
    fn default() -> Self {
        Self {
            count: true,
            batch_size: None,
        }
    }
}
