//! Table-bound statement builder.
//!
//! A [`StatementBuilder`] owns a table's schema and its storage. It opens
//! [`Statement`]s, which accumulate SQL text and positional parameters as the
//! caller chains fragment operations, and which are consumed when executed:
//!
//! ```ignore
//! let rows = table
//!     .select_where_equals("a, b", "c", 4)?
//!     .and_where([("d", 5), ("a", 2)], Match::Is)?
//!     .fetch_all()?;
//! ```
//!
//! Nothing is carried over between statements, so the builder can be reused
//! for an unrelated query right after one runs.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::schema::{check_column, check_select_list, ColumnDefinition, DataType, TableDefinition};
use crate::sqlite::{SqliteConfig, SqliteStorage};
use crate::storage::Storage;
use crate::value::{Row, Value};

/// Comparison used by [`Statement::and_where`] and [`Statement::or_where`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Match {
    /// `col = ?`
    #[default]
    Is,
    /// `col LIKE ?`; wildcards are part of the bound value.
    Like,
}

impl Match {
    fn operator(self) -> &'static str {
        match self {
            Match::Is => "=",
            Match::Like => "LIKE",
        }
    }
}

impl FromStr for Match {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "is" => Ok(Match::Is),
            "like" => Ok(Match::Like),
            other => Err(Error::argument(format!(
                "match mode must be 'is' or 'like', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Connective {
    And,
    Or,
}

impl Connective {
    fn as_sql(self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

/// Builds and runs statements against one table.
///
/// Construction always issues `CREATE TABLE IF NOT EXISTS` for the table.
/// A builder is meant for a single owner: it can move between threads but
/// cannot be shared by reference across them (`!Sync`).
pub struct StatementBuilder<S = SqliteStorage> {
    storage: S,
    table: TableDefinition,
    _not_sync: PhantomData<Cell<()>>,
}

impl StatementBuilder<SqliteStorage> {
    /// Open `table` in the SQLite file described by `config`.
    ///
    /// If `table` has no columns the existing table is introspected.
    pub fn open(config: SqliteConfig, table: TableDefinition) -> Result<Self> {
        let storage = SqliteStorage::new(&config)?;
        Self::with_storage(storage, table)
    }

    /// Open an existing table, reading its column names from the database.
    pub fn open_existing(config: SqliteConfig, table_name: impl Into<String>) -> Result<Self> {
        Self::open(config, TableDefinition::new(table_name))
    }
}

impl<S: Storage> StatementBuilder<S> {
    /// Bind `table` to any [`Storage`].
    ///
    /// With no columns, the column names are read from the existing table
    /// (all typed `TEXT`); a missing table is a configuration error. Either
    /// way `CREATE TABLE IF NOT EXISTS` is issued before returning.
    pub fn with_storage(storage: S, mut table: TableDefinition) -> Result<Self> {
        table.validate()?;

        if table.columns.is_empty() {
            let names = storage.table_columns(&table.name)?.ok_or_else(|| {
                Error::configuration(format!(
                    "table '{}' does not exist and no columns were given",
                    table.name
                ))
            })?;
            debug!(table = %table.name, columns = ?names, "introspected existing table");
            table.columns = names
                .into_iter()
                .map(|name| ColumnDefinition::new(name, DataType::Text))
                .collect();
        }

        storage.execute(&table.create_sql(), &[])?;
        info!(table = %table.name, columns = table.columns.len(), "table ready");

        Ok(Self {
            storage,
            table,
            _not_sync: PhantomData,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.table.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.table.column_names()
    }

    pub fn column_types(&self) -> Vec<DataType> {
        self.table.columns.iter().map(|c| c.data_type).collect()
    }

    pub fn create_table_sql(&self) -> String {
        self.table.create_sql()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// `SELECT * FROM table` with no parameters.
    pub fn select_all(&self) -> Statement<'_, S> {
        Statement::new(self, format!("SELECT * FROM {}", self.table.name))
    }

    /// `SELECT cols FROM table WHERE col = ?`
    ///
    /// `select_columns` is `*` or a comma-separated list of plain column
    /// names; expressions belong in [`custom_sql`](Self::custom_sql).
    pub fn select_where_equals(
        &self,
        select_columns: &str,
        where_column: &str,
        query: impl Into<Value>,
    ) -> Result<Statement<'_, S>> {
        let mut stmt = self.select_where(select_columns, where_column)?;
        stmt.sql.push_str(" = ?");
        stmt.params.push(query.into());
        stmt.open_predicate = false;
        Ok(stmt)
    }

    /// `SELECT cols FROM table WHERE col LIKE ?`
    ///
    /// Same select-list rules as [`select_where_equals`](Self::select_where_equals).
    pub fn select_where_like(
        &self,
        select_columns: &str,
        where_column: &str,
        pattern: impl Into<Value>,
    ) -> Result<Statement<'_, S>> {
        let mut stmt = self.select_where(select_columns, where_column)?;
        stmt.sql.push_str(" LIKE ?");
        stmt.params.push(pattern.into());
        stmt.open_predicate = false;
        Ok(stmt)
    }

    /// `SELECT cols FROM table WHERE col`, with the predicate left open for
    /// [`Statement::between`] to complete.
    pub fn select_where(&self, select_columns: &str, where_column: &str) -> Result<Statement<'_, S>> {
        check_select_list(select_columns)?;
        check_column(where_column)?;
        let mut stmt = Statement::new(
            self,
            format!(
                "SELECT {} FROM {} WHERE {}",
                select_columns, self.table.name, where_column
            ),
        );
        stmt.open_predicate = true;
        Ok(stmt)
    }

    /// `UPDATE table SET c1 = ?, c2 = ? WHERE w = ?`
    ///
    /// Exactly one where pair is accepted; extend the condition with
    /// [`Statement::and_where`] or [`Statement::or_where`].
    pub fn update<C1, V1, C2, V2>(
        &self,
        set_pairs: impl IntoIterator<Item = (C1, V1)>,
        where_pairs: impl IntoIterator<Item = (C2, V2)>,
    ) -> Result<Statement<'_, S>>
    where
        C1: AsRef<str>,
        V1: Into<Value>,
        C2: AsRef<str>,
        V2: Into<Value>,
    {
        let mut where_pairs = where_pairs.into_iter().collect::<Vec<_>>();
        if where_pairs.len() != 1 {
            return Err(Error::argument(format!(
                "update takes exactly one where pair, got {}; chain and_where/or_where for more",
                where_pairs.len()
            )));
        }

        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (column, value) in set_pairs {
            let column = column.as_ref();
            check_column(column)?;
            assignments.push(format!("{column} = ?"));
            params.push(value.into());
        }
        if assignments.is_empty() {
            return Err(Error::argument("update needs at least one column to set"));
        }

        let (where_column, where_value) = where_pairs.remove(0);
        let where_column = where_column.as_ref();
        check_column(where_column)?;
        params.push(where_value.into());

        let mut stmt = Statement::new(
            self,
            format!(
                "UPDATE {} SET {} WHERE {} = ?",
                self.table.name,
                assignments.join(", "),
                where_column
            ),
        );
        stmt.params = params;
        Ok(stmt)
    }

    /// Start a statement from raw SQL. Bind its placeholders with [`Statement::bind`].
    pub fn custom_sql(&self, sql: impl Into<String>) -> Statement<'_, S> {
        Statement::new(self, sql.into())
    }

    /// Insert one row, values in column order.
    pub fn insert_row<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Result<usize> {
        let values = values.into_iter().map(Into::into).collect::<Vec<Value>>();
        let width = self.table.columns.len();
        if values.len() != width {
            return Err(Error::argument(format!(
                "{} values given for {} columns",
                values.len(),
                width
            )));
        }
        let placeholders = vec!["?"; width].join(", ");
        let sql = format!("INSERT INTO {} VALUES ({})", self.table.name, placeholders);
        debug!(sql = %sql, params = values.len(), "insert row");
        self.storage.execute(&sql, &values)
    }
}

impl<S> fmt::Debug for StatementBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementBuilder")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Accumulated SQL text and positional parameters for one statement.
///
/// Fragment operations take the statement by value and hand it back
/// extended; [`fetch_all`](Self::fetch_all), [`fetch_opt`](Self::fetch_opt)
/// and [`commit`](Self::commit) consume it.
#[must_use]
pub struct Statement<'a, S = SqliteStorage> {
    builder: &'a StatementBuilder<S>,
    sql: String,
    params: Vec<Value>,
    open_predicate: bool,
}

impl<'a, S: Storage> Statement<'a, S> {
    fn new(builder: &'a StatementBuilder<S>, sql: String) -> Self {
        Self {
            builder,
            sql,
            params: Vec::new(),
            open_predicate: false,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }

    /// Append ` AND col = ?` (or `LIKE`) per pair, binding values in pair order.
    pub fn and_where<C, V>(self, pairs: impl IntoIterator<Item = (C, V)>, mode: Match) -> Result<Self>
    where
        C: AsRef<str>,
        V: Into<Value>,
    {
        self.push_conditions(Connective::And, pairs, mode)
    }

    /// Append ` OR col = ?` (or `LIKE`) per pair, binding values in pair order.
    pub fn or_where<C, V>(self, pairs: impl IntoIterator<Item = (C, V)>, mode: Match) -> Result<Self>
    where
        C: AsRef<str>,
        V: Into<Value>,
    {
        self.push_conditions(Connective::Or, pairs, mode)
    }

    fn push_conditions<C, V>(
        mut self,
        connective: Connective,
        pairs: impl IntoIterator<Item = (C, V)>,
        mode: Match,
    ) -> Result<Self>
    where
        C: AsRef<str>,
        V: Into<Value>,
    {
        for (column, value) in pairs {
            let column = column.as_ref();
            check_column(column)?;
            self.sql.push_str(&format!(
                " {} {} {} ?",
                connective.as_sql(),
                column,
                mode.operator()
            ));
            self.params.push(value.into());
            self.open_predicate = false;
        }
        Ok(self)
    }

    /// Bind a `BETWEEN ? AND ?` range, low bound first.
    ///
    /// With `column`, appends ` AND column BETWEEN ? AND ?`. Without, appends
    /// ` BETWEEN ? AND ?` to complete the open predicate left by
    /// [`StatementBuilder::select_where`]; anything else is rejected.
    pub fn between<V: Into<Value>>(
        mut self,
        bounds: impl IntoIterator<Item = V>,
        column: Option<&str>,
    ) -> Result<Self> {
        let bounds = bounds.into_iter().map(Into::into).collect::<Vec<Value>>();
        if bounds.len() != 2 {
            return Err(Error::argument(format!(
                "BETWEEN takes exactly 2 values, got {}",
                bounds.len()
            )));
        }
        match column {
            Some(column) => {
                check_column(column)?;
                self.sql.push_str(&format!(" AND {column} BETWEEN ? AND ?"));
            }
            None if self.open_predicate => self.sql.push_str(" BETWEEN ? AND ?"),
            None => {
                return Err(Error::argument(
                    "BETWEEN without a column must follow select_where",
                ))
            }
        }
        self.params.extend(bounds);
        self.open_predicate = false;
        Ok(self)
    }

    /// Replace the SQL text verbatim; bound parameters are kept.
    pub fn custom_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self.open_predicate = false;
        self
    }

    /// Append one positional parameter without touching the SQL text.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Run the statement and return every row.
    pub fn fetch_all(self) -> Result<Vec<Row>> {
        self.trace("fetch_all");
        self.builder.storage.query(&self.sql, &self.params)
    }

    /// Run the statement and return its first row, if any.
    pub fn fetch_opt(self) -> Result<Option<Row>> {
        self.trace("fetch_opt");
        self.builder.storage.query_first(&self.sql, &self.params)
    }

    /// Run the statement as a mutation and return the affected row count.
    pub fn commit(self) -> Result<usize> {
        self.trace("commit");
        self.builder.storage.execute(&self.sql, &self.params)
    }

    fn trace(&self, op: &'static str) {
        debug!(
            op,
            table = %self.builder.table.name,
            sql = %self.sql,
            params = self.params.len(),
            "executing statement"
        );
    }
}

impl<S> fmt::Debug for Statement<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every call and answers queries from a fixed row set.
    #[derive(Default)]
    struct RecordingStorage {
        calls: RefCell<Vec<(String, Vec<Value>)>>,
        existing: Option<Vec<String>>,
        rows: Vec<Row>,
    }

    impl RecordingStorage {
        fn last(&self) -> (String, Vec<Value>) {
            self.calls.borrow().last().cloned().unwrap()
        }

        fn record(&self, sql: &str, params: &[Value]) {
            self.calls
                .borrow_mut()
                .push((sql.to_string(), params.to_vec()));
        }
    }

    impl Storage for RecordingStorage {
        fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
            self.record(sql, params);
            Ok(self.rows.clone())
        }

        fn query_first(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
            self.record(sql, params);
            Ok(self.rows.first().cloned())
        }

        fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
            self.record(sql, params);
            Ok(1)
        }

        fn table_columns(&self, _table: &str) -> Result<Option<Vec<String>>> {
            Ok(self.existing.clone())
        }
    }

    fn table() -> TableDefinition {
        TableDefinition::new("t")
            .add_column("a", DataType::Integer)
            .add_column("b", DataType::Text)
            .add_column("c", DataType::Text)
            .add_column("d", DataType::Text)
    }

    fn builder() -> StatementBuilder<RecordingStorage> {
        StatementBuilder::with_storage(RecordingStorage::default(), table()).unwrap()
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_construction_creates_table() {
        let b = builder();
        assert_eq!(b.column_names(), vec!["a", "b", "c", "d"]);
        assert_eq!(
            b.storage().last().0,
            "CREATE TABLE IF NOT EXISTS t (a INTEGER, b TEXT, c TEXT, d TEXT)"
        );
    }

    #[test]
    fn test_construction_introspects_existing_table() {
        let storage = RecordingStorage {
            existing: Some(vec!["x".into(), "y".into()]),
            ..Default::default()
        };
        let b = StatementBuilder::with_storage(storage, TableDefinition::new("t")).unwrap();
        assert_eq!(b.column_names(), vec!["x", "y"]);
        assert_eq!(b.column_types(), vec![DataType::Text, DataType::Text]);
    }

    #[test]
    fn test_construction_missing_table() {
        let err = StatementBuilder::with_storage(RecordingStorage::default(), TableDefinition::new("t"))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_select_where_equals() {
        let b = builder();
        let stmt = b.select_where_equals("a,b", "c", 4).unwrap();
        assert_eq!(stmt.sql(), "SELECT a,b FROM t WHERE c = ?");
        stmt.fetch_all().unwrap();
        assert_eq!(
            b.storage().last(),
            ("SELECT a,b FROM t WHERE c = ?".to_string(), vec![Value::Integer(4)])
        );
    }

    #[test]
    fn test_select_where_like() {
        let b = builder();
        let (sql, params) = b.select_where_like("a, b", "c", "%4%").unwrap().into_parts();
        assert_eq!(sql, "SELECT a, b FROM t WHERE c LIKE ?");
        assert_eq!(params, vec![text("%4%")]);
    }

    #[test]
    fn test_and_or_where_clause_per_pair() {
        let b = builder();
        let (sql, params) = b
            .select_where_equals("a, b", "c", 4)
            .unwrap()
            .and_where([("d", 5), ("a", 2)], Match::Is)
            .unwrap()
            .or_where([("a", 5), ("b", 3)], Match::Like)
            .unwrap()
            .into_parts();
        assert_eq!(
            sql,
            "SELECT a, b FROM t WHERE c = ? AND d = ? AND a = ? OR a LIKE ? OR b LIKE ?"
        );
        assert_eq!(
            params,
            [4, 5, 2, 5, 3].into_iter().map(Value::from).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_match_from_str() {
        assert_eq!("is".parse::<Match>().unwrap(), Match::Is);
        assert_eq!("like".parse::<Match>().unwrap(), Match::Like);
        assert!("ilike".parse::<Match>().unwrap_err().is_argument());
    }

    #[test]
    fn test_between_completes_open_predicate() {
        let b = builder();
        let stmt = b.select_where("a, b", "c").unwrap().between([2, 30], None).unwrap();
        assert_eq!(stmt.sql(), "SELECT a, b FROM t WHERE c BETWEEN ? AND ?");
        assert_eq!(stmt.params(), &[Value::Integer(2), Value::Integer(30)]);
    }

    #[test]
    fn test_between_with_column() {
        let b = builder();
        let stmt = b
            .select_where_equals("a", "c", 4)
            .unwrap()
            .between([2, 30], Some("d"))
            .unwrap();
        assert_eq!(stmt.sql(), "SELECT a FROM t WHERE c = ? AND d BETWEEN ? AND ?");
        assert_eq!(stmt.params(), &[Value::Integer(4), Value::Integer(2), Value::Integer(30)]);
    }

    #[test]
    fn test_between_rejects_bad_arguments() {
        let b = builder();
        let err = b.select_where("a", "c").unwrap().between([1, 2, 3], None).unwrap_err();
        assert!(err.is_argument());

        let err = b
            .select_where_equals("a", "c", 4)
            .unwrap()
            .between([1, 2], None)
            .unwrap_err();
        assert!(err.is_argument());
    }

    #[test]
    fn test_update() {
        let b = builder();
        let stmt = b
            .update([("a", text("x")), ("b", text("y"))], [("id", 7)])
            .unwrap();
        assert_eq!(stmt.sql(), "UPDATE t SET a = ?, b = ? WHERE id = ?");
        assert_eq!(stmt.params(), &[text("x"), text("y"), Value::Integer(7)]);
        assert_eq!(stmt.commit().unwrap(), 1);
    }

    #[test]
    fn test_update_extended_with_and_where() {
        let b = builder();
        let (sql, params) = b
            .update([("a", "a")], [("a", 1)])
            .unwrap()
            .and_where([("b", 2), ("c", 3)], Match::Is)
            .unwrap()
            .into_parts();
        assert_eq!(sql, "UPDATE t SET a = ? WHERE a = ? AND b = ? AND c = ?");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_update_rejects_where_pair_count() {
        let b = builder();
        let err = b.update([("a", "x")], [("id1", 1), ("id2", 2)]).unwrap_err();
        assert!(err.is_argument());
        let err = b
            .update([("a", "x")], Vec::<(&str, i64)>::new())
            .unwrap_err();
        assert!(err.is_argument());
    }

    #[test]
    fn test_custom_sql_keeps_params() {
        let b = builder();
        let stmt = b
            .select_where_equals("a", "c", 4)
            .unwrap()
            .custom_sql("SELECT * FROM t WHERE a = ?");
        assert_eq!(stmt.sql(), "SELECT * FROM t WHERE a = ?");
        assert_eq!(stmt.params(), &[Value::Integer(4)]);

        let stmt = b.custom_sql("SELECT * FROM t WHERE b = ?").bind("x");
        assert_eq!(stmt.params(), &[text("x")]);
    }

    #[test]
    fn test_builder_reusable_after_execution() {
        let b = builder();
        let _ = b.select_where_equals("a", "c", 4).unwrap().fetch_all().unwrap();
        b.select_all().fetch_opt().unwrap();
        assert_eq!(b.storage().last(), ("SELECT * FROM t".to_string(), vec![]));
    }

    #[test]
    fn test_insert_row() {
        let b = builder();
        assert!(b.insert_row([1, 2, 3]).unwrap_err().is_argument());
        b.insert_row([1, 2, 3, 4]).unwrap();
        assert_eq!(b.storage().last().0, "INSERT INTO t VALUES (?, ?, ?, ?)");
        assert_eq!(b.storage().last().1.len(), 4);
    }

    #[test]
    fn test_rejects_non_identifier_columns() {
        let b = builder();
        assert!(b.select_where_equals("a", "c = 1 OR 1", 4).unwrap_err().is_argument());
        assert!(b.select_where("a;", "c").unwrap_err().is_argument());
        let err = b
            .select_where_equals("a", "c", 4)
            .unwrap()
            .and_where([("d)", 1)], Match::Is)
            .unwrap_err();
        assert!(err.is_argument());
    }
}
