//! Model System - metadata, entities and persistence
//!
//! - `core_trait`: the [`Model`] trait a type implements to describe its table
//! - `schema`: runtime metadata built from that trait
//! - `entity`: hydrated model instances and their relation cache
//! - `hydration`: rows to entities
//! - `persistence`: save, delete and restore

pub mod core_trait;
pub mod entity;
pub mod hydration;
pub mod persistence;
pub mod schema;

pub use core_trait::Model;
pub use entity::{Entity, Existence, RelationValue};
pub use hydration::ModelHydrator;
pub use persistence::{CREATED_AT, UPDATED_AT};
pub use schema::{AttributeDef, AttributeTransform, ModelRef, ModelSchema};
