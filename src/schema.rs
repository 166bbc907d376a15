//! Table definitions and identifier checks.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Text,
    Real,
    Blob,
    Numeric,
}

impl DataType {
    pub fn as_sql(self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Real => "REAL",
            DataType::Blob => "BLOB",
            DataType::Numeric => "NUMERIC",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => Ok(DataType::Integer),
            "TEXT" => Ok(DataType::Text),
            "REAL" | "FLOAT" | "DOUBLE" => Ok(DataType::Real),
            "BLOB" => Ok(DataType::Blob),
            "NUMERIC" => Ok(DataType::Numeric),
            other => Err(Error::configuration(format!(
                "unknown column type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A table name and its ordered columns.
///
/// Column order is the order values are expected in by
/// [`StatementBuilder::insert_row`](crate::StatementBuilder::insert_row).
/// A definition with no columns asks the builder to introspect an existing
/// table instead of declaring one.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn add_column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(ColumnDefinition::new(name, data_type));
        self
    }

    /// Build a definition from `(name, type)` string pairs, e.g. `("a", "integer")`.
    pub fn from_pairs<N, T>(name: impl Into<String>, pairs: impl IntoIterator<Item = (N, T)>) -> Result<Self>
    where
        N: Into<String>,
        T: AsRef<str>,
    {
        let mut table = Self::new(name);
        for (column, ty) in pairs {
            table = table.add_column(column, ty.as_ref().parse()?);
        }
        Ok(table)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// `CREATE TABLE IF NOT EXISTS name (col TYPE, ...)`
    pub fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.data_type))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, columns)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::configuration("table name is missing"));
        }
        if !is_identifier(&self.name) {
            return Err(Error::configuration(format!(
                "invalid table name '{}'",
                self.name
            )));
        }
        for (i, column) in self.columns.iter().enumerate() {
            if !is_identifier(&column.name) {
                return Err(Error::configuration(format!(
                    "invalid column name '{}'",
                    column.name
                )));
            }
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::configuration(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }
        Ok(())
    }
}

/// Unquoted SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn check_column(column: &str) -> Result<()> {
    if is_identifier(column) {
        Ok(())
    } else {
        Err(Error::argument(format!("invalid column name '{column}'")))
    }
}

/// Select lists are `*` or comma-separated identifiers, kept as written.
/// Expressions such as `COUNT(*)` or `a AS x` are rejected; run those through
/// `custom_sql`.
pub(crate) fn check_select_list(list: &str) -> Result<()> {
    let valid = list
        .split(',')
        .map(str::trim)
        .all(|part| part == "*" || is_identifier(part));
    if valid {
        Ok(())
    } else {
        Err(Error::argument(format!("invalid select list '{list}'")))
    }
}
