//! # Arango Configuration
//!
//! Typed configuration for the ArangoDB client: where the server lives and
//! which defaults new cursors start with.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arango_config::ClientConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::load_from_file("arango.toml").await?;
//!     println!("{}", config.connection.base_url());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod connection;
mod loader;

pub use connection::{ConnectionConfig, CursorDefaults};
pub use loader::{ClientConfig, ConfigError};
