//! Transaction Management
//!
//! Scoped transactions over any [`Connection`]: the closure's `Ok` commits,
//! its `Err` rolls back and is returned to the caller unchanged.

use tracing::{debug, warn};

use crate::backends::{Connection, SqlDialect};
use crate::error::{ModelError, ModelResult};

/// Transaction isolation levels supported by PostgreSQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Convert to SQL string for SET TRANSACTION ISOLATION LEVEL command
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Transaction configuration options.
///
/// SQLite has no per-transaction isolation or read-only mode; both settings
/// are ignored there.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionConfig {
    pub isolation_level: Option<IsolationLevel>,
    pub read_only: bool,
}

impl TransactionConfig {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    pub fn serializable() -> Self {
        Self {
            isolation_level: Some(IsolationLevel::Serializable),
            ..Default::default()
        }
    }
}

/// Run `f` inside a transaction with default settings
pub fn transaction<C, T, F>(conn: &mut C, f: F) -> ModelResult<T>
where
    C: Connection + ?Sized,
    F: FnOnce(&mut C) -> ModelResult<T>,
{
    transaction_with(conn, TransactionConfig::default(), f)
}

/// Run `f` inside a transaction configured by `config`
pub fn transaction_with<C, T, F>(conn: &mut C, config: TransactionConfig, f: F) -> ModelResult<T>
where
    C: Connection + ?Sized,
    F: FnOnce(&mut C) -> ModelResult<T>,
{
    debug!("Beginning transaction with config: {:?}", config);
    conn.begin()
        .map_err(|e| ModelError::Transaction(format!("Failed to begin transaction: {}", e)))?;

    if let Err(err) = apply_config(conn, &config) {
        rollback_quietly(conn);
        return Err(err);
    }

    match f(conn) {
        Ok(value) => {
            // A failed COMMIT can leave the transaction open
            if let Err(e) = conn.commit() {
                warn!("Commit failed, rolling back: {}", e);
                rollback_quietly(conn);
                return Err(ModelError::Transaction(format!(
                    "Failed to commit transaction: {}",
                    e
                )));
            }
            debug!("Transaction committed successfully");
            Ok(value)
        }
        Err(err) => {
            warn!("Rolling back transaction after error: {}", err);
            rollback_quietly(conn);
            Err(err)
        }
    }
}

fn apply_config<C: Connection + ?Sized>(conn: &mut C, config: &TransactionConfig) -> ModelResult<()> {
    if conn.dialect() != SqlDialect::PostgreSQL {
        return Ok(());
    }

    if let Some(level) = config.isolation_level {
        let sql = format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql());
        conn.execute(&sql, &[])
            .map_err(|e| ModelError::Transaction(format!("Failed to set isolation level: {}", e)))?;
        debug!("Transaction isolation level set to: {:?}", level);
    }

    if config.read_only {
        conn.execute("SET TRANSACTION READ ONLY", &[])
            .map_err(|e| ModelError::Transaction(format!("Failed to set read-only mode: {}", e)))?;
        debug!("Transaction set to read-only mode");
    }

    Ok(())
}

/// The original error matters more than a failed rollback
fn rollback_quietly<C: Connection + ?Sized>(conn: &mut C) {
    if let Err(e) = conn.rollback() {
        warn!("Failed to rollback transaction: {}", e);
    } else {
        debug!("Transaction rolled back successfully");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SqliteConnection;
    use crate::query::QueryBuilder;

    fn setup() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount INTEGER);")
            .unwrap();
        conn
    }

    fn rows(conn: &mut SqliteConnection) -> usize {
        QueryBuilder::table("ledger").get_rows(conn).unwrap().len()
    }

    fn insert(conn: &mut SqliteConnection, amount: i64) -> ModelResult<()> {
        QueryBuilder::table("ledger")
            .insert([("amount", amount)])
            .execute(conn)?;
        Ok(())
    }

    #[test]
    fn test_commit_on_ok() {
        let mut conn = setup();
        let value = transaction(&mut conn, |conn| {
            insert(conn, 10)?;
            insert(conn, 20)?;
            Ok(42)
        })
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(rows(&mut conn), 2);
    }

    #[test]
    fn test_rollback_on_err_returns_original_error() {
        let mut conn = setup();
        let result: ModelResult<()> = transaction(&mut conn, |conn| {
            insert(conn, 10)?;
            Err(ModelError::InvalidArgument("boom".to_string()))
        });

        assert!(matches!(result, Err(ModelError::InvalidArgument(msg)) if msg == "boom"));
        assert_eq!(rows(&mut conn), 0);
    }

    #[test]
    fn test_failed_commit_rolls_back_and_frees_connection() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parents (id INTEGER PRIMARY KEY);
             CREATE TABLE children (
                 id INTEGER PRIMARY KEY,
                 parent_id INTEGER REFERENCES parents(id) DEFERRABLE INITIALLY DEFERRED
             );",
        )
        .unwrap();

        let result = transaction(&mut conn, |conn| {
            QueryBuilder::table("children")
                .insert([("parent_id", 99_i64)])
                .execute(conn)?;
            Ok(())
        });
        assert!(matches!(result, Err(ModelError::Transaction(_))));

        transaction(&mut conn, |_| Ok(())).unwrap();
        assert!(QueryBuilder::table("children").get_rows(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn test_config_ignored_on_sqlite() {
        let mut conn = setup();
        transaction_with(&mut conn, TransactionConfig::serializable(), |conn| insert(conn, 1))
            .unwrap();
        assert_eq!(rows(&mut conn), 1);
    }

    #[test]
    fn test_isolation_level_sql() {
        assert_eq!(IsolationLevel::Serializable.as_sql(), "SERIALIZABLE");
        assert_eq!(IsolationLevel::ReadCommitted.as_sql(), "READ COMMITTED");
    }
}
