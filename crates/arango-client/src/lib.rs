//! # Arango Client
//!
//! Builds AQL queries and streams their results from ArangoDB over HTTP.
//!
//! ## Modules
//!
//! - [`aql`]: fluent query builder and expression nodes
//! - [`cursor`]: lazily paginated server-side cursors
//! - [`transport`]: the injected HTTP seam and its reqwest implementation
//!
//! ## Example
//!
//! ```rust,no_run
//! use arango_client::{aql::Query, Connection};
//! use arango_config::ClientConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = Connection::from_config(&ClientConfig::default());
//!
//!     let mut cursor = Query::new("users")
//!         .iterate_as("u")
//!         .filter("u.age >= @age")
//!         .bind("age", 18)
//!         .result_field("name", "u.name")
//!         .execute(&conn)?;
//!
//!     while let Some(row) = cursor.next_row().await? {
//!         println!("{}", row);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aql;
pub mod connection;
pub mod cursor;
pub mod error;
pub mod transport;

pub use aql::{Expr, Func, Query, ReturnExpr, Var};
pub use connection::{Collection, Connection};
pub use cursor::{Cursor, CursorOptions, CursorState};
pub use error::{Error, QueryError, Result, TransportError};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
