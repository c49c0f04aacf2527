//! Relationship Metadata System - Core metadata definitions for relationships
//!
//! A [`RelationshipDescriptor`] is plain data: the relationship kind, the key
//! columns on each side and, depending on the kind, a pivot, intermediate or
//! polymorphic configuration. Kind-specific constructors live next to the
//! SQL they produce (`has_one.rs`, `belongs_to_many.rs`, ...).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::{ModelRef, ModelSchema};

/// Defines the type of relationship between models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// One-to-one relationship (hasOne)
    HasOne,
    /// One-to-many relationship (hasMany)
    HasMany,
    /// Many-to-one relationship (belongsTo)
    BelongsTo,
    /// Many-to-many relationship through a pivot table
    ManyToMany,
    /// One related row reached through an intermediate table
    HasOneThrough,
    /// Many related rows reached through an intermediate table
    HasManyThrough,
    /// Polymorphic one-to-one relationship
    MorphOne,
    /// Polymorphic one-to-many relationship
    MorphMany,
    /// Inverse polymorphic relationship
    MorphTo,
}

impl RelationshipType {
    /// Returns true if this relationship type is polymorphic
    pub fn is_polymorphic(self) -> bool {
        matches!(self, Self::MorphOne | Self::MorphMany | Self::MorphTo)
    }

    /// Returns true if this relationship returns a collection
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            Self::HasMany | Self::ManyToMany | Self::HasManyThrough | Self::MorphMany
        )
    }

    /// Returns true if this relationship requires a pivot table
    pub fn requires_pivot(self) -> bool {
        matches!(self, Self::ManyToMany)
    }

    /// Returns true if this relationship hops through an intermediate table
    pub fn requires_through(self) -> bool {
        matches!(self, Self::HasOneThrough | Self::HasManyThrough)
    }
}

/// The other side of a relationship: a literal table or a model type
#[derive(Debug, Clone, PartialEq)]
pub enum RelatedRef {
    Table(String),
    Model(ModelRef),
}

impl RelatedRef {
    /// Resolve the concrete table name
    pub fn table(&self) -> ModelResult<String> {
        let table = match self {
            RelatedRef::Table(table) => table.clone(),
            RelatedRef::Model(model) => model.schema().table,
        };
        if table.trim().is_empty() {
            return Err(ModelError::Configuration(format!(
                "Related reference {:?} does not resolve to a table",
                self
            )));
        }
        Ok(table)
    }

    /// Schema used to hydrate related rows
    pub fn schema(&self) -> ModelResult<Arc<ModelSchema>> {
        match self {
            RelatedRef::Table(_) => Ok(Arc::new(ModelSchema::for_table(&self.table()?))),
            RelatedRef::Model(model) => {
                self.table()?;
                Ok(Arc::new(model.schema()))
            }
        }
    }

    /// Cache key: model name, or `table:<name>` for literal tables
    pub fn cache_key(&self) -> String {
        match self {
            RelatedRef::Table(table) => format!("table:{}", table),
            RelatedRef::Model(model) => model.name().to_string(),
        }
    }
}

impl From<ModelRef> for RelatedRef {
    fn from(model: ModelRef) -> Self {
        RelatedRef::Model(model)
    }
}

impl From<&str> for RelatedRef {
    fn from(table: &str) -> Self {
        RelatedRef::Table(table.to_string())
    }
}

impl From<String> for RelatedRef {
    fn from(table: String) -> Self {
        RelatedRef::Table(table)
    }
}

/// Configuration for many-to-many pivot tables
#[derive(Debug, Clone, PartialEq)]
pub struct PivotConfig {
    /// Pivot table name
    pub table: String,
    /// Pivot column referencing the parent
    pub foreign_pivot_key: String,
    /// Pivot column referencing the related row
    pub related_pivot_key: String,
    /// Column on the related table the pivot points at
    pub related_key: String,
}

impl PivotConfig {
    pub fn new(table: &str, foreign_pivot_key: &str, related_pivot_key: &str) -> Self {
        Self {
            table: table.to_string(),
            foreign_pivot_key: foreign_pivot_key.to_string(),
            related_pivot_key: related_pivot_key.to_string(),
            related_key: "id".to_string(),
        }
    }

    /// Validate pivot configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.table.trim().is_empty() {
            return Err(ModelError::Configuration(
                "Pivot table name cannot be empty".to_string(),
            ));
        }
        if self.foreign_pivot_key.trim().is_empty() || self.related_pivot_key.trim().is_empty() {
            return Err(ModelError::Configuration(format!(
                "Pivot table '{}' needs both pivot keys",
                self.table
            )));
        }
        if self.foreign_pivot_key == self.related_pivot_key {
            return Err(ModelError::Configuration(format!(
                "Pivot table '{}' uses '{}' for both sides",
                self.table, self.foreign_pivot_key
            )));
        }
        if self.related_key.trim().is_empty() {
            return Err(ModelError::Configuration(format!(
                "Pivot table '{}' has no related key",
                self.table
            )));
        }
        Ok(())
    }
}

/// Configuration for relationships through an intermediate table
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughConfig {
    /// Intermediate model or table
    pub intermediate: RelatedRef,
    /// Intermediate column referencing the parent
    pub first_key: String,
    /// Related column referencing the intermediate row
    pub second_key: String,
    /// Intermediate column `second_key` points at
    pub second_local_key: String,
}

impl ThroughConfig {
    pub fn new(intermediate: RelatedRef, first_key: &str, second_key: &str) -> Self {
        Self {
            intermediate,
            first_key: first_key.to_string(),
            second_key: second_key.to_string(),
            second_local_key: "id".to_string(),
        }
    }

    /// Both hops must resolve before any SQL is emitted
    pub fn validate(&self) -> ModelResult<()> {
        self.intermediate.table()?;
        for (label, key) in [
            ("first key", &self.first_key),
            ("second key", &self.second_key),
            ("second local key", &self.second_local_key),
        ] {
            if key.trim().is_empty() {
                return Err(ModelError::Configuration(format!(
                    "Intermediate relationship has an empty {}",
                    label
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for polymorphic relationships
#[derive(Debug, Clone, PartialEq)]
pub struct PolymorphicConfig {
    /// Morph name, e.g. `commentable`
    pub name: String,
    /// Column holding the owner's type, `<name>_type`
    pub type_column: String,
    /// Column holding the owner's key, `<name>_id`
    pub id_column: String,
    /// Value written to `type_column` for this owner (MorphOne/MorphMany)
    pub morph_type: Option<String>,
    /// Type value to model mapping (MorphTo)
    pub type_map: Vec<(String, ModelRef)>,
}

impl PolymorphicConfig {
    /// Conventional `<name>_type` / `<name>_id` columns
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_column: format!("{}_type", name),
            id_column: format!("{}_id", name),
            morph_type: None,
            type_map: Vec::new(),
        }
    }

    /// Resolve a stored type value to its model
    pub fn resolve_type(&self, morph_type: &str) -> Option<&ModelRef> {
        self.type_map
            .iter()
            .find(|(name, _)| name == morph_type)
            .map(|(_, model)| model)
    }

    /// Validate polymorphic configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::Configuration(
                "Polymorphic name cannot be empty".to_string(),
            ));
        }
        if self.type_column.trim().is_empty() || self.id_column.trim().is_empty() {
            return Err(ModelError::Configuration(format!(
                "Polymorphic relationship '{}' needs type and id columns",
                self.name
            )));
        }
        if self.type_column == self.id_column {
            return Err(ModelError::Configuration(format!(
                "Polymorphic relationship '{}' uses '{}' as both type and id column",
                self.name, self.type_column
            )));
        }
        Ok(())
    }
}

/// Stateless description of how a model relates to another
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDescriptor {
    pub(crate) kind: RelationshipType,
    /// `None` only for MorphTo, whose target varies per row
    pub(crate) related: Option<RelatedRef>,
    pub(crate) local_key: String,
    pub(crate) foreign_key: String,
    pub(crate) owner_key: String,
    pub(crate) pivot: Option<PivotConfig>,
    pub(crate) through: Option<ThroughConfig>,
    pub(crate) morph: Option<PolymorphicConfig>,
    /// Set when the related table is referenced under an alias, as in a
    /// subquery correlated with a parent of the same table
    pub(crate) related_alias: Option<String>,
}

impl RelationshipDescriptor {
    pub(crate) fn base(kind: RelationshipType, related: Option<RelatedRef>, foreign_key: &str) -> Self {
        Self {
            kind,
            related,
            local_key: "id".to_string(),
            foreign_key: foreign_key.to_string(),
            owner_key: "id".to_string(),
            pivot: None,
            through: None,
            morph: None,
            related_alias: None,
        }
    }

    /// Override the parent-side key (default `id`)
    pub fn with_local_key(mut self, local_key: &str) -> Self {
        self.local_key = local_key.to_string();
        self
    }

    /// Override the key on the owning side of a BelongsTo/MorphTo (default `id`)
    pub fn with_owner_key(mut self, owner_key: &str) -> Self {
        self.owner_key = owner_key.to_string();
        self
    }

    /// Validate relationship metadata
    pub fn validate(&self) -> ModelResult<()> {
        let kind = self.kind;
        match &self.related {
            Some(related) => {
                related.table()?;
            }
            None if kind != RelationshipType::MorphTo => {
                return Err(ModelError::Configuration(format!(
                    "{:?} relationship has no related model or table",
                    kind
                )));
            }
            None => {}
        }

        if self.local_key.trim().is_empty() || self.owner_key.trim().is_empty() {
            return Err(ModelError::Configuration(format!(
                "{:?} relationship has an empty key column",
                kind
            )));
        }
        if self.foreign_key.trim().is_empty() && !kind.requires_pivot() && !kind.requires_through() {
            return Err(ModelError::Configuration(format!(
                "{:?} relationship has no foreign key",
                kind
            )));
        }

        match (&self.pivot, kind.requires_pivot()) {
            (Some(pivot), true) => pivot.validate()?,
            (None, true) => {
                return Err(ModelError::Configuration(
                    "Many-to-many relationship requires pivot configuration".to_string(),
                ))
            }
            _ => {}
        }

        match (&self.through, kind.requires_through()) {
            (Some(through), true) => through.validate()?,
            (None, true) => {
                return Err(ModelError::Configuration(format!(
                    "{:?} relationship requires an intermediate table",
                    kind
                )))
            }
            _ => {}
        }

        if kind.is_polymorphic() {
            let morph = self.morph.as_ref().ok_or_else(|| {
                ModelError::Configuration(
                    "Polymorphic relationship requires polymorphic configuration".to_string(),
                )
            })?;
            morph.validate()?;
            if kind == RelationshipType::MorphTo && morph.type_map.is_empty() {
                return Err(ModelError::Configuration(format!(
                    "MorphTo relationship '{}' declares no target types",
                    morph.name
                )));
            }
            if kind != RelationshipType::MorphTo && morph.morph_type.is_none() {
                return Err(ModelError::Configuration(format!(
                    "Polymorphic relationship '{}' has no morph type",
                    morph.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_type_properties() {
        assert!(RelationshipType::HasMany.is_collection());
        assert!(RelationshipType::HasManyThrough.is_collection());
        assert!(!RelationshipType::HasOneThrough.is_collection());
        assert!(!RelationshipType::BelongsTo.is_collection());
        assert!(RelationshipType::MorphTo.is_polymorphic());
        assert!(RelationshipType::ManyToMany.requires_pivot());
        assert!(RelationshipType::HasOneThrough.requires_through());
    }

    #[test]
    fn test_pivot_validation() {
        assert!(PivotConfig::new("role_user", "user_id", "role_id").validate().is_ok());
        assert!(PivotConfig::new("", "user_id", "role_id").validate().is_err());
        assert!(PivotConfig::new("role_user", "user_id", "user_id").validate().is_err());
    }

    #[test]
    fn test_unresolved_hop_is_configuration_error() {
        let through = ThroughConfig::new(RelatedRef::Table(String::new()), "country_id", "user_id");
        assert!(matches!(through.validate(), Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_polymorphic_defaults() {
        let morph = PolymorphicConfig::new("commentable");
        assert_eq!(morph.type_column, "commentable_type");
        assert_eq!(morph.id_column, "commentable_id");
        assert!(morph.validate().is_ok());
    }

    #[test]
    fn test_missing_pivot_is_rejected() {
        let descriptor = RelationshipDescriptor::base(
            RelationshipType::ManyToMany,
            Some("roles".into()),
            "",
        );
        assert!(matches!(descriptor.validate(), Err(ModelError::Configuration(_))));
    }
}
