//! Model Registry - explicit, shared cache of model metadata
//!
//! Schemas are cached by model name and descriptors per (model, relation).
//! The registry is a cheap clonable handle; clones share the same maps.

use std::sync::Arc;

use dashmap::DashMap;

use super::eager_loading::EagerLoadStrategy;
use super::metadata::{RelatedRef, RelationshipDescriptor};
use crate::error::ModelResult;
use crate::model::{Model, ModelRef, ModelSchema};

/// Thread-safe registry of model schemas and relationship descriptors
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    /// Model name (or `table:<name>`) -> schema
    schemas: Arc<DashMap<String, Arc<ModelSchema>>>,
    /// (model name, relation name) -> descriptor
    descriptors: Arc<DashMap<(String, String), RelationshipDescriptor>>,
    strategy: EagerLoadStrategy,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose eager loads default to `strategy`
    pub fn with_strategy(strategy: EagerLoadStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn strategy(&self) -> EagerLoadStrategy {
        self.strategy
    }

    /// Validate and register a model
    pub fn register<M: Model>(&self) -> ModelResult<Arc<ModelSchema>> {
        self.register_schema(M::schema())
    }

    /// Validate and register a schema under its model name
    pub fn register_schema(&self, schema: ModelSchema) -> ModelResult<Arc<ModelSchema>> {
        schema.validate()?;
        let schema = Arc::new(schema);
        self.schemas.insert(schema.name.clone(), schema.clone());
        Ok(schema)
    }

    /// Cached schema, if the model was registered or resolved before
    pub fn get(&self, name: &str) -> Option<Arc<ModelSchema>> {
        self.schemas.get(name).map(|entry| entry.value().clone())
    }

    /// Schema of a referenced model, built on first use
    pub fn schema_of(&self, model: &ModelRef) -> Arc<ModelSchema> {
        self.schemas
            .entry(model.name().to_string())
            .or_insert_with(|| Arc::new(model.schema()))
            .value()
            .clone()
    }

    /// Schema that rows of a relationship hydrate into
    pub fn related_schema(&self, descriptor: &RelationshipDescriptor) -> ModelResult<Arc<ModelSchema>> {
        match &descriptor.related {
            Some(RelatedRef::Model(model)) => Ok(self.schema_of(model)),
            Some(related @ RelatedRef::Table(_)) => {
                let key = related.cache_key();
                if let Some(schema) = self.get(&key) {
                    return Ok(schema);
                }
                let schema = related.schema()?;
                self.schemas.insert(key, schema.clone());
                Ok(schema)
            }
            None => Err(descriptor.unsupported("has no fixed related model")),
        }
    }

    /// Descriptor of `relation` on `schema`, cached per (model, relation)
    pub fn relationship(
        &self,
        schema: &ModelSchema,
        relation: &str,
    ) -> ModelResult<RelationshipDescriptor> {
        let key = (schema.name.clone(), relation.to_string());
        if let Some(descriptor) = self.descriptors.get(&key) {
            return Ok(descriptor.value().clone());
        }
        let descriptor = schema.relationship(relation)?.clone();
        self.descriptors.insert(key, descriptor.clone());
        Ok(descriptor)
    }

    /// Number of cached schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.schemas.clear();
        self.descriptors.clear();
    }
}
