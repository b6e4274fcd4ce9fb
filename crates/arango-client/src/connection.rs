//! Connection to a database endpoint.
//!
//! A [`Connection`] pairs an injected [`Transport`] with the endpoint URL and
//! the cursor defaults from configuration. Cloning is cheap; all clones share
//! the same transport and collection registry.

use crate::aql::Query;
use crate::cursor::{Cursor, CursorOptions};
use crate::transport::{ReqwestTransport, Transport};
use arango_config::{ClientConfig, CursorDefaults};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Handle to an ArangoDB endpoint
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    transport: Arc<dyn Transport>,
    endpoint: String,
    cursor_defaults: CursorDefaults,
    collections: Mutex<HashMap<String, Arc<Collection>>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.inner.endpoint)
            .field("cursor_defaults", &self.inner.cursor_defaults)
            .finish()
    }
}

impl Connection {
    /// Connection using the given transport and configuration
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                transport,
                endpoint: config.connection.endpoint(),
                cursor_defaults: config.cursor.clone(),
                collections: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Connection over reqwest, configured entirely from `config`
    pub fn from_config(config: &ClientConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::from_config(&config.connection));
        Self::new(transport, config)
    }

    /// Connection to an explicit endpoint URL with default cursor settings
    pub fn with_endpoint(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                transport,
                endpoint: endpoint.into().trim_end_matches('/').to_string(),
                cursor_defaults: CursorDefaults::default(),
                collections: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Base URL every request path is appended to
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Absolute URL for an API path such as `/_api/cursor`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.endpoint, path)
    }

    /// The injected transport
    pub fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    /// Defaults applied to cursors that do not override them
    pub fn cursor_defaults(&self) -> &CursorDefaults {
        &self.inner.cursor_defaults
    }

    /// Get the handle for `name`, creating it on first use
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        let mut collections = self.inner.collections.lock();
        collections
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating collection handle '{}'", name);
                Arc::new(Collection {
                    name: name.to_string(),
                })
            })
            .clone()
    }

    /// Names of collection handles created so far, sorted
    pub fn known_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.collections.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Cursor over hand-written AQL
    pub fn query(&self, aql: impl Into<String>) -> Cursor<Value> {
        self.query_with(aql, Map::new(), CursorOptions::default())
    }

    /// Cursor over hand-written AQL with bind variables and options
    pub fn query_with(
        &self,
        aql: impl Into<String>,
        bind_vars: Map<String, Value>,
        options: CursorOptions,
    ) -> Cursor<Value> {
        Cursor::new(self.clone(), aql.into(), bind_vars, options)
    }
}

/// Lazily created handle to a named collection
#[derive(Debug, PartialEq, Eq)]
pub struct Collection {
    name: String,
}

impl Collection {
    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start a query iterating over this collection
    pub fn query(&self) -> Query {
        Query::new(self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arango_config::ConnectionConfig;

    fn config() -> ClientConfig {
        ClientConfig {
            connection: ConnectionConfig {
                database: Some("shop".to_string()),
                ..ConnectionConfig::default()
            },
            cursor: CursorDefaults {
                count: false,
                batch_size: Some(25),
            },
        }
    }

    #[test]
    fn test_url_includes_database_prefix() {
        let conn = Connection::from_config(&config());
        assert_eq!(
            conn.url("/_api/cursor"),
            "http://localhost:8529/_db/shop/_api/cursor"
        );
        assert_eq!(conn.cursor_defaults().batch_size, Some(25));
    }

    #[test]
    fn test_with_endpoint_trims_trailing_slash() {
        let conn = Connection::with_endpoint(Arc::new(ReqwestTransport::new()), "http://db:1/");
        assert_eq!(conn.url("/_api/cursor"), "http://db:1/_api/cursor");
    }

    #[test]
    fn test_collection_get_or_create_returns_same_handle() {
        let conn = Connection::from_config(&ClientConfig::default());
        let first = conn.collection("users");
        let again = conn.clone().collection("users");
        conn.collection("orders");

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(conn.known_collections(), vec!["orders", "users"]);
    }

    #[test]
    fn test_collection_query_starts_builder() {
        let conn = Connection::from_config(&ClientConfig::default());
        let mut query = conn.collection("users").query().iterate_as("u");
        assert_eq!(query.render().unwrap(), "FOR u IN users RETURN u");
    }

    #[test]
    fn test_raw_query_uses_connection_defaults() {
        let conn = Connection::from_config(&config());
        let cursor = conn.query("RETURN 1");
        assert_eq!(cursor.query(), "RETURN 1");
        assert!(!cursor.wants_count());
        assert_eq!(cursor.batch_size(), Some(25));
    }
}
