//! The backend contract the builder executes statements against.

use crate::error::Result;
use crate::value::{Row, Value};

/// A relational store that runs one SQL statement per call.
///
/// Parameters are positional and bound in slice order. Implementations
/// acquire whatever connection they need inside the call and release it on
/// every exit path.
pub trait Storage {
    /// Run a query and return every row.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a query and return its first row, or `None` when it matches nothing.
    fn query_first(&self, sql: &str, params: &[Value]) -> Result<Option<Row>>;

    /// Run a mutating or DDL statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize>;

    /// Column names of `table` in declaration order, or `None` if it does not exist.
    fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>>;
}
