#![cfg(feature = "sql")]

//! SQL tables (SQLite through `rusqlite`).

use std::path::PathBuf;

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use tracing::{debug, warn};

use crate::error::{EtlError, EtlResult};
use crate::extract::Extract;
use crate::types::{DataType, Fields, Value};

use super::{Load, WriteOutcome};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Int64(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Float64(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Utf8(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Where [`SqlLoader`] gets its connection.
#[derive(Debug)]
pub enum SqlConnect {
    /// Open (or create) a database file at `setup`.
    Path(PathBuf),
    /// Open a private in-memory database at `setup`.
    Memory,
    /// Use an already-open connection.
    Connection(Connection),
}

/// One destination table: its name and the record fields it takes, with their column types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTable {
    /// Table name.
    pub name: String,
    /// `(field name, column type)` in column order. Field names are also the column names.
    pub columns: Vec<(String, DataType)>,
}

impl SqlTable {
    /// Table with no columns yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column.
    pub fn column(mut self, field: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push((field.into(), data_type));
        self
    }

    fn insert_sql(&self) -> String {
        let names: Vec<String> = self.columns.iter().map(|(f, _)| quote_ident(f)).collect();
        let params: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&self.name),
            names.join(", "),
            params.join(", ")
        )
    }

    fn create_sql(&self) -> String {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|(f, t)| format!("{} {}", quote_ident(f), t.sql_type()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&self.name),
            cols.join(", ")
        )
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Options for [`SqlLoader`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlOptions {
    /// Create missing tables from the column types at `setup`.
    pub create_tables: bool,
}

/// [`Load`] into one or more SQL tables.
///
/// Each record produces one `INSERT` per table. Statements are built at `setup` and prepared
/// through the connection's statement cache, so every record reuses them. Values are coerced to
/// the column's [`DataType`] before binding; a value that does not coerce, or an insert the
/// database rejects, fails that record only. Inserts are not transactional across tables.
#[derive(Debug)]
pub struct SqlLoader {
    connect: Option<SqlConnect>,
    conn: Option<Connection>,
    /// Database file the loader opened itself; closed after each run and reopened by the next.
    file: Option<PathBuf>,
    tables: Vec<SqlTable>,
    statements: Vec<String>,
    options: SqlOptions,
    buffer: Fields,
    written: usize,
}

impl SqlLoader {
    /// Loader writing to `tables` through `connect`.
    pub fn new(connect: SqlConnect, tables: Vec<SqlTable>) -> Self {
        Self {
            connect: Some(connect),
            conn: None,
            file: None,
            tables,
            statements: Vec::new(),
            options: SqlOptions::default(),
            buffer: Fields::new(),
            written: 0,
        }
    }

    /// Set loader options.
    pub fn with_options(mut self, options: SqlOptions) -> Self {
        self.options = options;
        self
    }

    /// Create missing tables at `setup`.
    pub fn create_tables(mut self, yes: bool) -> Self {
        self.options.create_tables = yes;
        self
    }

    /// The open connection, once set up. Stays open after `finished` unless the loader opened a
    /// database file itself.
    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    /// Take the connection out of the loader.
    pub fn into_connection(self) -> Option<Connection> {
        self.conn
    }

    fn connect(&mut self) -> EtlResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        if let Some(SqlConnect::Path(path)) = &self.connect {
            self.file = Some(path.clone());
            self.connect = None;
        }
        let conn = match (self.connect.take(), &self.file) {
            (_, Some(path)) => Connection::open(path).map_err(|e| EtlError::open(path, e))?,
            (Some(SqlConnect::Memory), None) => {
                Connection::open_in_memory().map_err(|e| EtlError::open(":memory:", e))?
            }
            (Some(SqlConnect::Connection(conn)), None) => conn,
            (Some(SqlConnect::Path(_)) | None, None) => {
                return Err(EtlError::config("sql connection already closed"))
            }
        };
        self.conn = Some(conn);
        Ok(())
    }

    fn bind(&self, table: &SqlTable, record_number: usize) -> Result<Vec<Value>, String> {
        table
            .columns
            .iter()
            .map(|(field, data_type)| {
                let raw = self.buffer.get(field).cloned().unwrap_or_default();
                raw.coerce(*data_type).map_err(|message| {
                    EtlError::ParseError {
                        row: record_number,
                        column: format!("{}.{field}", table.name),
                        raw: raw.to_string(),
                        message,
                    }
                    .to_string()
                })
            })
            .collect()
    }
}

impl Load for SqlLoader {
    fn setup(&mut self, _extract: &dyn Extract) -> EtlResult<()> {
        if self.tables.is_empty() {
            return Err(EtlError::config("sql destination has no tables"));
        }
        if let Some(t) = self.tables.iter().find(|t| t.columns.is_empty()) {
            return Err(EtlError::config(format!("sql table '{}' has no columns", t.name)));
        }
        self.connect()?;
        let Some(conn) = self.conn.as_ref() else {
            return Err(EtlError::config("sql connection unavailable"));
        };

        if self.options.create_tables {
            for table in &self.tables {
                conn.execute(&table.create_sql(), [])?;
            }
        }

        conn.set_prepared_statement_cache_capacity(self.tables.len().max(16));
        self.statements = self.tables.iter().map(SqlTable::insert_sql).collect();
        for sql in &self.statements {
            conn.prepare_cached(sql)?;
        }
        self.buffer.clear();
        debug!(tables = self.tables.len(), "sql destination ready");
        Ok(())
    }

    fn set(&mut self, field: &str, value: Value) {
        self.buffer.insert(field.to_string(), value);
    }

    fn write_record(&mut self, record_number: usize) -> WriteOutcome {
        let outcome = self.insert(record_number);
        self.buffer.clear();
        if let WriteOutcome::Failed(reason) = &outcome {
            warn!(record_number, %reason, "sql insert failed");
        }
        self.written += outcome.count();
        outcome
    }

    fn records_written(&self) -> usize {
        self.written
    }

    fn finished(&mut self) -> EtlResult<()> {
        if let Some(conn) = self.conn.as_ref() {
            conn.flush_prepared_statement_cache();
        }
        if self.file.is_some() {
            if let Some(conn) = self.conn.take() {
                conn.close().map_err(|(_, e)| EtlError::Sql(e))?;
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let names: Vec<&str> = self.tables.iter().map(|t| t.name.as_str()).collect();
        format!("sql tables {names:?}")
    }
}

impl SqlLoader {
    fn insert(&self, record_number: usize) -> WriteOutcome {
        let Some(conn) = self.conn.as_ref() else {
            return WriteOutcome::Failed("sql destination is not set up".to_string());
        };
        for (table, sql) in self.tables.iter().zip(&self.statements) {
            let values = match self.bind(table, record_number) {
                Ok(values) => values,
                Err(reason) => return WriteOutcome::Failed(reason),
            };
            let result = conn
                .prepare_cached(sql)
                .and_then(|mut stmt| stmt.execute(params_from_iter(values.iter())));
            if let Err(e) = result {
                return WriteOutcome::Failed(format!("table '{}': {e}", table.name));
            }
        }
        WriteOutcome::Written
    }
}
