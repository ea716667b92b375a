//! Database access layer.
//!
//! - Sessions: one MySQL connection per tool call, behind a provider trait
//! - Schema introspection over `information_schema`
//! - MySQL value to JSON mappings

pub mod schema;
pub mod session;
pub mod types;

pub use schema::SchemaInspector;
pub use session::{MySqlSession, MySqlSessionProvider, Session, SessionProvider};
