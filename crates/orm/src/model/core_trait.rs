//! Core Model Trait - Static metadata for database entities
//!
//! A model type declares its table, primary key, attributes and
//! relationships. Rows are hydrated into [`Entity`](super::Entity) values
//! carrying that metadata, so the trait itself has no instance methods.

use std::sync::Arc;

use super::entity::Entity;
use super::schema::{AttributeDef, ModelRef, ModelSchema};
use crate::backends::{Connection, DatabaseValue};
use crate::error::ModelResult;
use crate::query::QueryBuilder;
use crate::relationships::RelationshipDescriptor;

/// Core trait for database models
pub trait Model: Sized + 'static {
    /// Table name for this model
    fn table_name() -> &'static str;

    /// Primary key field name
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Name used in relation metadata and error messages
    fn model_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Declared attributes
    fn attributes() -> Vec<AttributeDef> {
        Vec::new()
    }

    /// Check if this model supports soft deletes
    fn uses_soft_deletes() -> bool {
        false
    }

    /// Soft-delete marker column
    fn deleted_at_column() -> &'static str {
        "deleted_at"
    }

    /// Check if this model uses timestamps (created_at, updated_at)
    fn uses_timestamps() -> bool {
        false
    }

    /// Named relationships of this model
    fn relationships() -> Vec<(&'static str, RelationshipDescriptor)> {
        Vec::new()
    }

    /// Assemble the schema from the declarations above
    fn schema() -> ModelSchema {
        ModelSchema {
            name: Self::model_name().to_string(),
            table: Self::table_name().to_string(),
            primary_key: Self::primary_key_name().to_string(),
            attributes: Self::attributes(),
            soft_deletes: Self::uses_soft_deletes(),
            deleted_at_column: Self::deleted_at_column().to_string(),
            timestamps: Self::uses_timestamps(),
            relationships: Self::relationships()
                .into_iter()
                .map(|(name, descriptor)| (name.to_string(), descriptor))
                .collect(),
        }
    }

    /// Lazy reference used by relationship descriptors
    fn model_ref() -> ModelRef {
        ModelRef::of::<Self>()
    }

    /// Start a query against this model
    fn query() -> QueryBuilder {
        QueryBuilder::for_model(Arc::new(Self::schema()))
    }

    /// Create an unsaved entity of this model
    fn new_entity() -> Entity {
        Entity::new(Arc::new(Self::schema()))
    }

    /// Find by primary key
    fn find<V: Into<DatabaseValue>>(conn: &mut dyn Connection, id: V) -> ModelResult<Option<Entity>> {
        Self::query().find(conn, id)
    }

    /// All rows visible under the default scope
    fn all(conn: &mut dyn Connection) -> ModelResult<Vec<Entity>> {
        Self::query().get(conn)
    }
}
