//! SQLite Backend Implementation
//!
//! Synchronous [`Connection`] over `rusqlite`. Statements use numbered `?N`
//! placeholders, so bindings are passed positionally in linearized order.

use std::path::Path;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqliteValue, ValueRef};
use tracing::debug;

use super::core::{Connection, DatabaseValue, ExecuteResult, Row, SqlDialect};
use crate::error::{ModelError, ModelResult};
use crate::sql::Grammar;

/// SQLite connection backed by rusqlite
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    grammar: Grammar,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteConnection {
    /// Open a private in-memory database
    pub fn open_in_memory() -> ModelResult<Self> {
        Ok(Self::from_connection(rusqlite::Connection::open_in_memory()?))
    }

    /// Open (or create) a database file
    pub fn open<P: AsRef<Path>>(path: P) -> ModelResult<Self> {
        Ok(Self::from_connection(rusqlite::Connection::open(path)?))
    }

    /// Wrap an existing rusqlite connection
    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn,
            grammar: Grammar::new(SqlDialect::SQLite),
        }
    }

    /// Compile statements for this connection with `grammar` (e.g. a quote override)
    pub fn with_grammar(mut self, grammar: Grammar) -> Self {
        self.grammar = grammar;
        self
    }

    /// Run one or more unparameterized statements (schema setup, pragmas)
    pub fn execute_batch(&self, sql: &str) -> ModelResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Access the underlying rusqlite connection
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::SQLite
    }

    fn grammar(&self) -> Grammar {
        self.grammar
    }

    fn execute(&mut self, sql: &str, bindings: &[DatabaseValue]) -> ModelResult<ExecuteResult> {
        let affected = self
            .conn
            .execute(sql, rusqlite::params_from_iter(bindings.iter()))?;

        let is_insert = sql
            .trim_start()
            .get(..6)
            .map(|head| head.eq_ignore_ascii_case("insert"))
            .unwrap_or(false);

        Ok(ExecuteResult {
            rows_affected: affected as u64,
            last_insert_id: is_insert.then(|| self.conn.last_insert_rowid()),
        })
    }

    fn fetch_all(&mut self, sql: &str, bindings: &[DatabaseValue]) -> ModelResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let mut rows = stmt.query(rusqlite::params_from_iter(bindings.iter()))?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                values.push(value_from_ref(row.get_ref(index)?));
            }
            results.push(Row::new(columns.clone(), values)?);
        }

        Ok(results)
    }

    fn begin(&mut self) -> ModelResult<()> {
        debug!("sqlite: BEGIN");
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> ModelResult<()> {
        debug!("sqlite: COMMIT");
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> ModelResult<()> {
        debug!("sqlite: ROLLBACK");
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

fn value_from_ref(value: ValueRef<'_>) -> DatabaseValue {
    match value {
        ValueRef::Null => DatabaseValue::Null,
        ValueRef::Integer(i) => DatabaseValue::Int64(i),
        ValueRef::Real(f) => DatabaseValue::Float64(f),
        ValueRef::Text(text) => DatabaseValue::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => DatabaseValue::Bytes(blob.to_vec()),
    }
}

impl ToSql for DatabaseValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let output = match self {
            DatabaseValue::Null => ToSqlOutput::Owned(SqliteValue::Null),
            DatabaseValue::Bool(b) => ToSqlOutput::Owned(SqliteValue::Integer(*b as i64)),
            DatabaseValue::Int32(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i as i64)),
            DatabaseValue::Int64(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            DatabaseValue::Float64(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            DatabaseValue::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            DatabaseValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            DatabaseValue::Uuid(u) => ToSqlOutput::Owned(SqliteValue::Text(u.to_string())),
            DatabaseValue::DateTime(dt) => ToSqlOutput::Owned(SqliteValue::Text(dt.to_rfc3339())),
            DatabaseValue::Date(d) => ToSqlOutput::Owned(SqliteValue::Text(d.to_string())),
            DatabaseValue::Time(t) => ToSqlOutput::Owned(SqliteValue::Text(t.to_string())),
            DatabaseValue::Json(j) => ToSqlOutput::Owned(SqliteValue::Text(j.to_string())),
            DatabaseValue::Array(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(Box::new(
                    ModelError::InvalidArgument("array values cannot be bound".to_string()),
                )))
            }
        };
        Ok(output)
    }
}
