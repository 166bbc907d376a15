//! Fluent SQLite statement builder bound to a single table.
//!
//! # Intention
//!
//! - Declare a table once (create it, or introspect an existing one) and compose
//!   SELECT/UPDATE statements against it through chained calls.
//! - Keep SQL text and positional parameters aligned: every fragment that adds a
//!   `?` binds its value in the same call.
//!
//! # Architectural Boundaries
//!
//! - Only statement building and single-statement execution belong here.
//! - Storage sits behind the [`Storage`] trait; [`SqliteStorage`] opens one
//!   connection per call.
//! - No transactions, pooling, migrations or async execution.

pub mod builder;
pub mod error;
pub mod schema;
pub mod sqlite;
pub mod storage;
pub mod value;

pub use builder::{Match, Statement, StatementBuilder};
pub use error::{Error, Result};
pub use schema::{ColumnDefinition, DataType, TableDefinition};
pub use sqlite::{SqliteConfig, SqliteStorage};
pub use storage::Storage;
pub use value::{Row, Value};
