//! Entity persistence: save, delete, force delete and restore
//!
//! Statements are built with [`QueryBuilder::table`] (no target model), so
//! the soft-delete scope never hides the row being written. Allowed
//! transitions:
//!
//! | from        | save      | delete                  | force_delete | restore   |
//! |-------------|-----------|-------------------------|--------------|-----------|
//! | New         | Persisted | error                   | error        | error     |
//! | Persisted   | Persisted | SoftDeleted or Removed  | Removed      | error     |
//! | SoftDeleted | SoftDeleted | error                 | Removed      | Persisted |
//! | Removed     | error     | error                   | error        | error     |

use chrono::Utc;
use tracing::debug;

use super::entity::{Entity, Existence};
use crate::backends::{Connection, DatabaseValue};
use crate::error::{ModelError, ModelResult};
use crate::query::{PredicateBuilder, QueryBuilder};
use crate::sql::CompiledQuery;

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

fn now() -> DatabaseValue {
    DatabaseValue::String(Utc::now().to_rfc3339())
}

impl Entity {
    /// INSERT a new entity or UPDATE the dirty attributes of a stored one
    pub fn save(&mut self, conn: &mut dyn Connection) -> ModelResult<()> {
        match self.existence() {
            Existence::New => self.perform_insert(conn),
            Existence::Persisted | Existence::SoftDeleted => self.perform_update(conn),
            Existence::Removed => Err(self.invalid_state("save")),
        }
    }

    /// Soft delete when the model supports it, otherwise remove the row
    pub fn delete(&mut self, conn: &mut dyn Connection) -> ModelResult<()> {
        if self.existence() != Existence::Persisted {
            return Err(self.invalid_state("delete"));
        }

        if !self.schema().soft_deletes {
            return self.perform_delete(conn);
        }

        let column = self.schema().deleted_at_column.clone();
        let stamp = now();
        let mut values = vec![(column.clone(), stamp.clone())];
        if self.schema().timestamps {
            values.push((UPDATED_AT.to_string(), stamp.clone()));
        }
        self.perform_keyed_update(conn, values.clone())?;

        for (column, value) in values {
            self.write_raw(&column, value);
        }
        self.sync_original();
        self.set_existence(Existence::SoftDeleted);
        debug!(model = %self.schema().name, "Soft deleted entity");
        Ok(())
    }

    /// Remove the row even when the model uses soft deletes
    pub fn force_delete(&mut self, conn: &mut dyn Connection) -> ModelResult<()> {
        if !self.exists() {
            return Err(self.invalid_state("force delete"));
        }
        self.perform_delete(conn)
    }

    /// Clear the soft-delete marker of a trashed entity
    pub fn restore(&mut self, conn: &mut dyn Connection) -> ModelResult<()> {
        if self.existence() != Existence::SoftDeleted {
            return Err(self.invalid_state("restore"));
        }

        let column = self.schema().deleted_at_column.clone();
        let mut values = vec![(column, DatabaseValue::Null)];
        if self.schema().timestamps {
            values.push((UPDATED_AT.to_string(), now()));
        }
        self.perform_keyed_update(conn, values.clone())?;

        for (column, value) in values {
            self.write_raw(&column, value);
        }
        self.sync_original();
        self.set_existence(Existence::Persisted);
        Ok(())
    }

    /// Re-read every attribute from the row; relations are dropped
    pub fn refresh(&mut self, conn: &mut dyn Connection) -> ModelResult<()> {
        if !self.exists() {
            return Err(self.invalid_state("refresh"));
        }
        let key = self.require_key()?;
        let schema = self.schema().clone();
        let fresh = QueryBuilder::for_model(schema.clone())
            .with_trashed()
            .find(conn, key)?
            .ok_or_else(|| ModelError::NotFound(schema.table.clone()))?;
        *self = fresh;
        Ok(())
    }

    fn perform_insert(&mut self, conn: &mut dyn Connection) -> ModelResult<()> {
        if self.schema().timestamps {
            let stamp = now();
            for column in [CREATED_AT, UPDATED_AT] {
                if !self.has_attribute(column) {
                    self.write_raw(column, stamp.clone());
                }
            }
        }

        let schema = self.schema().clone();
        let mut values: Vec<(String, DatabaseValue)> = self
            .attribute_names()
            .filter_map(|name| Some((name.to_string(), self.get_raw(name)?.clone())))
            .collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));

        let grammar = conn.grammar();
        let compiled = if values.is_empty() {
            let sql = format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                grammar.wrap_table(&schema.table)?,
                grammar.wrap(&schema.primary_key)?
            );
            CompiledQuery {
                sql,
                bindings: Vec::new(),
            }
        } else {
            QueryBuilder::table(&schema.table)
                .insert(values)
                .returning(&[schema.primary_key.as_str()])
                .compile(&grammar)?
        };

        let row = conn.fetch_one(&compiled.sql, &compiled.bindings)?;
        if let Some(key) = row.as_ref().and_then(|row| row.get(&schema.primary_key)) {
            self.write_raw(&schema.primary_key, key.clone());
        }

        self.sync_original();
        self.set_existence(Existence::Persisted);
        debug!(model = %schema.name, "Inserted entity");
        Ok(())
    }

    fn perform_update(&mut self, conn: &mut dyn Connection) -> ModelResult<()> {
        let mut dirty = self.dirty();
        if dirty.is_empty() {
            return Ok(());
        }

        if self.schema().timestamps && !dirty.iter().any(|(name, _)| name == UPDATED_AT) {
            let stamp = now();
            self.write_raw(UPDATED_AT, stamp.clone());
            dirty.push((UPDATED_AT.to_string(), stamp));
        }

        self.perform_keyed_update(conn, dirty)?;
        self.sync_original();
        Ok(())
    }

    fn perform_keyed_update(
        &self,
        conn: &mut dyn Connection,
        values: Vec<(String, DatabaseValue)>,
    ) -> ModelResult<()> {
        let key = self.require_key()?;
        let schema = self.schema();
        let compiled = QueryBuilder::table(&schema.table)
            .where_eq(&schema.primary_key, key)
            .update(values)
            .compile(&conn.grammar())?;

        let result = conn.execute(&compiled.sql, &compiled.bindings)?;
        if result.rows_affected == 0 {
            return Err(ModelError::NotFound(schema.table.clone()));
        }
        Ok(())
    }

    fn perform_delete(&mut self, conn: &mut dyn Connection) -> ModelResult<()> {
        let key = self.require_key()?;
        let schema = self.schema().clone();
        let compiled = QueryBuilder::table(&schema.table)
            .where_eq(&schema.primary_key, key)
            .delete()
            .compile(&conn.grammar())?;

        conn.execute(&compiled.sql, &compiled.bindings)?;
        self.set_existence(Existence::Removed);
        debug!(model = %schema.name, "Deleted entity");
        Ok(())
    }

    fn require_key(&self) -> ModelResult<DatabaseValue> {
        self.key().cloned().ok_or_else(|| {
            ModelError::InvalidState(format!(
                "{} entity has no primary key value",
                self.schema().name
            ))
        })
    }

    fn invalid_state(&self, operation: &str) -> ModelError {
        ModelError::InvalidState(format!(
            "Cannot {} a {:?} {} entity",
            operation,
            self.existence(),
            self.schema().name
        ))
    }
}
