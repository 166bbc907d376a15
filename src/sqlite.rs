use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::value::{Row, Value};

const DB_SUFFIX: &str = ".db";

/// SQLite storage configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub db_path: String,
    /// Use `db_path` as given instead of appending `.db`
    pub verbatim_path: bool,
    /// Busy timeout applied to every connection
    pub busy_timeout: Option<Duration>,
}

impl SqliteConfig {
    /// Create a new SQLite config for the given database path
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            verbatim_path: false,
            busy_timeout: None,
        }
    }

    pub fn with_verbatim_path(mut self, verbatim: bool) -> Self {
        self.verbatim_path = verbatim;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    /// The file actually opened: `db_path`, with `.db` appended unless it
    /// already ends in `.db` or the path is verbatim.
    pub fn resolved_path(&self) -> PathBuf {
        if self.verbatim_path || self.db_path.ends_with(DB_SUFFIX) {
            PathBuf::from(&self.db_path)
        } else {
            PathBuf::from(format!("{}{}", self.db_path, DB_SUFFIX))
        }
    }
}

/// [`Storage`] over a single SQLite file.
///
/// Each call opens its own connection and drops it before returning, so a
/// failing statement never leaves a connection behind.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    path: PathBuf,
    busy_timeout: Option<Duration>,
}

impl SqliteStorage {
    pub fn new(config: &SqliteConfig) -> Result<Self> {
        if config.db_path.trim().is_empty() {
            return Err(Error::configuration("database path is missing"));
        }
        Ok(Self {
            path: config.resolved_path(),
            busy_timeout: config.busy_timeout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        Ok(conn)
    }
}

fn read_row(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Row> {
    (0..width).map(|i| row.get::<_, Value>(i)).collect()
}

impl Storage for SqliteStorage {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| read_row(row, width))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(rows = rows.len(), "query returned");
        Ok(rows)
    }

    fn query_first(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let width = stmt.column_count();
        let first = stmt
            .query_row(params_from_iter(params.iter()), |row| read_row(row, width))
            .optional()?;
        Ok(first)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        let conn = self.connect()?;
        let changed = conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(changed)
    }

    fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>> {
        let conn = self.connect()?;
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE",
            [table],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Ok(None);
        }
        let stmt = conn.prepare(&format!("SELECT * FROM {table}"))?;
        let names = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        Ok(Some(names))
    }
}
