//! Model hydration: raw rows into entities

use std::sync::Arc;

use super::entity::{Entity, Existence};
use super::schema::ModelSchema;
use crate::backends::Row;
use crate::error::{ModelError, ModelResult};

/// Builds entities of one model from result rows
#[derive(Debug, Clone)]
pub struct ModelHydrator {
    schema: Arc<ModelSchema>,
}

impl ModelHydrator {
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// Build an entity from one row.
    ///
    /// Every column is stored, declared attributes through their inbound
    /// transform. The entity starts clean and persisted, or soft-deleted when
    /// the model uses soft deletes and the row's marker is set.
    pub fn hydrate(&self, row: &Row) -> ModelResult<Entity> {
        if row.is_empty() {
            return Err(ModelError::InvalidArgument(format!(
                "Cannot hydrate {} from an empty row",
                self.schema.name
            )));
        }

        let mut entity = Entity::new(self.schema.clone());
        for (column, value) in row.iter() {
            entity.write(column, value.clone());
        }
        entity.sync_original();

        let trashed = self.schema.soft_deletes
            && entity
                .get_raw(&self.schema.deleted_at_column)
                .map_or(false, |marker| !marker.is_null());
        entity.set_existence(if trashed {
            Existence::SoftDeleted
        } else {
            Existence::Persisted
        });
        Ok(entity)
    }

    pub fn hydrate_all(&self, rows: &[Row]) -> ModelResult<Vec<Entity>> {
        rows.iter().map(|row| self.hydrate(row)).collect()
    }
}
