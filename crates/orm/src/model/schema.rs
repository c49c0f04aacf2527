//! Model schema: static metadata describing a model's table, attributes and
//! relationships, plus the attribute transforms applied during hydration.

use std::fmt;
use std::sync::Arc;

use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};
use crate::relationships::RelationshipDescriptor;

use super::core_trait::Model;

type TransformFn = dyn Fn(DatabaseValue) -> DatabaseValue + Send + Sync;

/// Value transform applied to an attribute
#[derive(Clone)]
pub enum AttributeTransform {
    Lowercase,
    Uppercase,
    Trim,
    Custom(Arc<TransformFn>),
}

impl AttributeTransform {
    /// Wrap a closure as a transform
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(DatabaseValue) -> DatabaseValue + Send + Sync + 'static,
    {
        AttributeTransform::Custom(Arc::new(f))
    }

    /// Apply the transform; built-in transforms leave non-strings untouched
    pub fn apply(&self, value: DatabaseValue) -> DatabaseValue {
        match (self, value) {
            (AttributeTransform::Lowercase, DatabaseValue::String(s)) => {
                DatabaseValue::String(s.to_lowercase())
            }
            (AttributeTransform::Uppercase, DatabaseValue::String(s)) => {
                DatabaseValue::String(s.to_uppercase())
            }
            (AttributeTransform::Trim, DatabaseValue::String(s)) => {
                DatabaseValue::String(s.trim().to_string())
            }
            (AttributeTransform::Custom(f), value) => f(value),
            (_, value) => value,
        }
    }
}

impl fmt::Debug for AttributeTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeTransform::Lowercase => write!(f, "Lowercase"),
            AttributeTransform::Uppercase => write!(f, "Uppercase"),
            AttributeTransform::Trim => write!(f, "Trim"),
            AttributeTransform::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Declared attribute of a model
#[derive(Debug, Clone)]
pub struct AttributeDef {
    pub name: String,
    /// Applied when a value is hydrated or assigned
    pub inbound: Option<AttributeTransform>,
    /// Applied when the value is read back out
    pub outbound: Option<AttributeTransform>,
    /// Guarded attributes are never mass-assigned nor exposed by default
    pub guarded: bool,
}

impl AttributeDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inbound: None,
            outbound: None,
            guarded: false,
        }
    }

    pub fn inbound(mut self, transform: AttributeTransform) -> Self {
        self.inbound = Some(transform);
        self
    }

    pub fn outbound(mut self, transform: AttributeTransform) -> Self {
        self.outbound = Some(transform);
        self
    }

    pub fn guarded(mut self) -> Self {
        self.guarded = true;
        self
    }
}

/// Lazy reference to another model's schema.
///
/// Holding a function pointer instead of the schema itself lets models refer
/// to each other in both directions without building recursive metadata.
#[derive(Clone, Copy)]
pub struct ModelRef {
    name: &'static str,
    schema: fn() -> ModelSchema,
}

impl ModelRef {
    /// Reference a model type
    pub fn of<M: Model>() -> Self {
        Self {
            name: M::model_name(),
            schema: M::schema,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Build the referenced schema
    pub fn schema(&self) -> ModelSchema {
        (self.schema)()
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef").field(&self.name).finish()
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Static metadata of a model
#[derive(Debug, Clone)]
pub struct ModelSchema {
    pub name: String,
    pub table: String,
    pub primary_key: String,
    pub attributes: Vec<AttributeDef>,
    pub soft_deletes: bool,
    pub deleted_at_column: String,
    pub timestamps: bool,
    pub relationships: Vec<(String, RelationshipDescriptor)>,
}

impl ModelSchema {
    /// Schema for a bare table with no declared attributes
    pub fn for_table(table: &str) -> Self {
        Self {
            name: table.to_string(),
            table: table.to_string(),
            primary_key: "id".to_string(),
            attributes: Vec::new(),
            soft_deletes: false,
            deleted_at_column: "deleted_at".to_string(),
            timestamps: false,
            relationships: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn is_guarded(&self, name: &str) -> bool {
        self.attribute(name).map_or(false, |a| a.guarded)
    }

    /// Declared and not guarded
    pub fn is_fillable(&self, name: &str) -> bool {
        self.attribute(name).map_or(false, |a| !a.guarded)
    }

    /// Look up a relationship by name
    pub fn relationship(&self, name: &str) -> ModelResult<&RelationshipDescriptor> {
        self.relationships
            .iter()
            .find(|(relation, _)| relation == name)
            .map(|(_, descriptor)| descriptor)
            .ok_or_else(|| {
                ModelError::Configuration(format!(
                    "Relation '{}' is not defined on model '{}'",
                    name, self.name
                ))
            })
    }

    pub fn relationship_names(&self) -> impl Iterator<Item = &str> {
        self.relationships.iter().map(|(name, _)| name.as_str())
    }

    /// Check the schema and every relationship for missing metadata
    pub fn validate(&self) -> ModelResult<()> {
        if self.table.trim().is_empty() {
            return Err(ModelError::Configuration(format!(
                "Model '{}' has no table name",
                self.name
            )));
        }
        if self.primary_key.trim().is_empty() {
            return Err(ModelError::Configuration(format!(
                "Model '{}' has no primary key",
                self.name
            )));
        }
        for (name, descriptor) in &self.relationships {
            descriptor.validate().map_err(|err| match err {
                ModelError::Configuration(msg) => ModelError::Configuration(format!(
                    "{}.{}: {}",
                    self.name, name, msg
                )),
                other => other,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_transforms() {
        assert_eq!(
            AttributeTransform::Lowercase.apply("MiXeD".into()),
            DatabaseValue::String("mixed".into())
        );
        assert_eq!(
            AttributeTransform::Trim.apply("  x ".into()),
            DatabaseValue::String("x".into())
        );
        assert_eq!(AttributeTransform::Uppercase.apply(5.into()), DatabaseValue::Int32(5));
    }

    #[test]
    fn test_custom_transform() {
        let double = AttributeTransform::custom(|v| match v.as_i64() {
            Some(i) => DatabaseValue::Int64(i * 2),
            None => v,
        });
        assert_eq!(double.apply(21.into()), DatabaseValue::Int64(42));
    }

    #[test]
    fn test_fillable_and_guarded() {
        let mut schema = ModelSchema::for_table("users");
        schema.attributes = vec![AttributeDef::new("name"), AttributeDef::new("password").guarded()];

        assert!(schema.is_fillable("name"));
        assert!(!schema.is_fillable("password"));
        assert!(schema.is_guarded("password"));
        assert!(!schema.is_fillable("undeclared"));
    }

    #[test]
    fn test_unknown_relationship_is_configuration_error() {
        let schema = ModelSchema::for_table("users");
        assert!(matches!(
            schema.relationship("posts"),
            Err(ModelError::Configuration(_))
        ));
    }
}
