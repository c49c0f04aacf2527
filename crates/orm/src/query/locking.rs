//! Query Builder row locking
//!
//! Lock clauses are emitted for PostgreSQL only; SQLite locks the whole
//! database per transaction and has no row-level syntax.

use super::builder::QueryBuilder;
use super::types::LockMode;

impl QueryBuilder {
    /// `FOR UPDATE`
    pub fn lock_for_update(mut self) -> Self {
        self.lock = Some(LockMode::ForUpdate);
        self
    }

    /// `FOR SHARE`
    pub fn shared_lock(mut self) -> Self {
        self.lock = Some(LockMode::ForShare);
        self
    }

    pub fn lock_mode(&self) -> Option<LockMode> {
        self.lock
    }
}
