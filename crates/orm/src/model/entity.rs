//! Entity - a hydrated row together with its model's metadata
//!
//! Attributes are stored after inbound transforms and read back through
//! outbound transforms. Guarded attributes are stored like any other but are
//! hidden from `get`, `to_json` and mass assignment.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::schema::ModelSchema;
use crate::backends::{Connection, DatabaseValue};
use crate::error::{ModelError, ModelResult};
use crate::query::QueryBuilder;
use crate::relationships::{EagerLoadResolver, EagerLoadStrategy, ModelRegistry};

/// Persistence state of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Existence {
    /// Built in memory, never saved
    New,
    /// Backed by a live row
    Persisted,
    /// Row is present with its deleted-at column set
    SoftDeleted,
    /// Row was deleted
    Removed,
}

/// Loaded relation; the shape follows the relationship kind, not the row count
#[derive(Debug, Clone)]
pub enum RelationValue {
    One(Option<Box<Entity>>),
    Many(Vec<Entity>),
}

impl RelationValue {
    /// Entity-or-null of a to-one relation
    pub fn as_one(&self) -> Option<Option<&Entity>> {
        match self {
            RelationValue::One(entity) => Some(entity.as_deref()),
            RelationValue::Many(_) => None,
        }
    }

    /// Entities of a to-many relation
    pub fn as_many(&self) -> Option<&[Entity]> {
        match self {
            RelationValue::Many(entities) => Some(entities),
            RelationValue::One(_) => None,
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, RelationValue::Many(_))
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            RelationValue::One(Some(entity)) => entity.to_json(),
            RelationValue::One(None) => JsonValue::Null,
            RelationValue::Many(entities) => {
                JsonValue::Array(entities.iter().map(Entity::to_json).collect())
            }
        }
    }
}

/// A model instance
#[derive(Debug, Clone)]
pub struct Entity {
    schema: Arc<ModelSchema>,
    attributes: HashMap<String, DatabaseValue>,
    original: HashMap<String, DatabaseValue>,
    existence: Existence,
    relations: HashMap<String, RelationValue>,
}

impl Entity {
    /// Empty, unsaved entity
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        Self {
            schema,
            attributes: HashMap::new(),
            original: HashMap::new(),
            existence: Existence::New,
            relations: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn existence(&self) -> Existence {
        self.existence
    }

    /// Backed by a row, trashed or not
    pub fn exists(&self) -> bool {
        matches!(self.existence, Existence::Persisted | Existence::SoftDeleted)
    }

    pub fn is_trashed(&self) -> bool {
        self.existence == Existence::SoftDeleted
    }

    pub(crate) fn set_existence(&mut self, existence: Existence) {
        self.existence = existence;
    }

    /// Primary key value, if set and not null
    pub fn key(&self) -> Option<&DatabaseValue> {
        self.get_raw(&self.schema.primary_key)
            .filter(|value| !value.is_null())
    }

    /// Attribute with its outbound transform applied; `None` for guarded attributes
    pub fn get(&self, name: &str) -> Option<DatabaseValue> {
        if self.schema.is_guarded(name) {
            return None;
        }
        self.read(name)
    }

    /// Explicit accessor that also reads guarded attributes
    pub fn get_guarded(&self, name: &str) -> Option<DatabaseValue> {
        self.read(name)
    }

    /// Stored value, without the outbound transform
    pub fn get_raw(&self, name: &str) -> Option<&DatabaseValue> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    fn read(&self, name: &str) -> Option<DatabaseValue> {
        let value = self.attributes.get(name)?.clone();
        Some(
            match self.schema.attribute(name).and_then(|a| a.outbound.as_ref()) {
                Some(transform) => transform.apply(value),
                None => value,
            },
        )
    }

    /// Assign one attribute. Guarded attributes are left untouched; the
    /// return value tells whether the write happened.
    pub fn set<V: Into<DatabaseValue>>(&mut self, name: &str, value: V) -> bool {
        if self.schema.is_guarded(name) {
            return false;
        }
        self.write(name, value.into());
        true
    }

    /// Assign a guarded attribute on purpose
    pub fn set_guarded<V: Into<DatabaseValue>>(&mut self, name: &str, value: V) {
        self.write(name, value.into());
    }

    /// Mass assignment: only declared, non-guarded keys are written
    pub fn fill<I, K, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<DatabaseValue>,
    {
        for (name, value) in values {
            let name = name.as_ref();
            if self.schema.is_fillable(name) {
                self.write(name, value.into());
            }
        }
        self
    }

    /// Mass assignment from a JSON object, e.g. a request body
    pub fn fill_json(&mut self, json: &JsonValue) -> ModelResult<&mut Self> {
        let object = json.as_object().ok_or_else(|| {
            ModelError::InvalidArgument("Mass assignment expects a JSON object".to_string())
        })?;
        Ok(self.fill(
            object
                .iter()
                .map(|(name, value)| (name, DatabaseValue::from_json(value.clone()))),
        ))
    }

    /// Store a value through the attribute's inbound transform
    pub(crate) fn write(&mut self, name: &str, value: DatabaseValue) {
        let value = match self.schema.attribute(name).and_then(|a| a.inbound.as_ref()) {
            Some(transform) => transform.apply(value),
            None => value,
        };
        self.attributes.insert(name.to_string(), value);
    }

    /// Store a value as-is (keys, timestamps)
    pub(crate) fn write_raw(&mut self, name: &str, value: DatabaseValue) {
        self.attributes.insert(name.to_string(), value);
    }

    /// Attributes changed since hydration or the last save, sorted by name
    pub fn dirty(&self) -> Vec<(String, DatabaseValue)> {
        let mut dirty: Vec<(String, DatabaseValue)> = self
            .attributes
            .iter()
            .filter(|(name, value)| self.original.get(*name) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        dirty.sort_by(|a, b| a.0.cmp(&b.0));
        dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.attributes
            .iter()
            .any(|(name, value)| self.original.get(name) != Some(value))
    }

    /// Value as of hydration or the last save
    pub fn original(&self, name: &str) -> Option<&DatabaseValue> {
        self.original.get(name)
    }

    pub(crate) fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }

    /// Loaded relation by name
    pub fn relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    pub fn relation_loaded(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn relations(&self) -> &HashMap<String, RelationValue> {
        &self.relations
    }

    pub fn set_relation(&mut self, name: &str, value: RelationValue) {
        self.relations.insert(name.to_string(), value);
    }

    pub fn unset_relation(&mut self, name: &str) -> Option<RelationValue> {
        self.relations.remove(name)
    }

    /// Visible attributes (outbound transforms applied) plus loaded relations
    pub fn to_json(&self) -> JsonValue {
        let mut map = serde_json::Map::new();
        for name in self.attributes.keys() {
            if let Some(value) = self.get(name) {
                map.insert(name.clone(), value.to_json());
            }
        }
        for (name, relation) in &self.relations {
            map.insert(name.clone(), relation.to_json());
        }
        JsonValue::Object(map)
    }

    /// Convert into a typed struct through the visible representation
    pub fn deserialize<T: DeserializeOwned>(&self) -> ModelResult<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }

    /// Query for the rows `relation` points at from this entity
    pub fn relation_query(&self, relation: &str) -> ModelResult<QueryBuilder> {
        self.schema.relationship(relation)?.scoped_query(self)
    }

    /// Load a relation (dotted names allowed) into this entity's relation
    /// cache, one query per level
    pub fn load(&mut self, conn: &mut dyn Connection, relation: &str) -> ModelResult<&RelationValue> {
        let registry = ModelRegistry::with_strategy(EagerLoadStrategy::PerParent);
        self.load_using(conn, &registry, relation)
    }

    /// Like `load`, resolving schemas through `registry` and loading with its strategy
    pub fn load_using(
        &mut self,
        conn: &mut dyn Connection,
        registry: &ModelRegistry,
        relation: &str,
    ) -> ModelResult<&RelationValue> {
        EagerLoadResolver::new(registry).attach(conn, std::slice::from_mut(self), relation, None)?;

        let head = relation.split('.').next().unwrap_or(relation).trim();
        self.relations.get(head).ok_or_else(|| {
            ModelError::Configuration(format!("Relation '{}' was not loaded", head))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeDef, AttributeTransform};

    fn users() -> Arc<ModelSchema> {
        let mut schema = ModelSchema::for_table("users");
        schema.attributes = vec![
            AttributeDef::new("email").inbound(AttributeTransform::Lowercase),
            AttributeDef::new("name").outbound(AttributeTransform::Uppercase),
            AttributeDef::new("password").guarded(),
        ];
        Arc::new(schema)
    }

    #[test]
    fn test_fill_ignores_guarded_and_undeclared() {
        let mut user = Entity::new(users());
        user.fill([
            ("email", DatabaseValue::from("ANN@EXAMPLE.COM")),
            ("password", DatabaseValue::from("hunter2")),
            ("is_admin", DatabaseValue::from(true)),
        ]);

        assert_eq!(user.get("email"), Some("ann@example.com".into()));
        assert!(!user.has_attribute("password"));
        assert!(!user.has_attribute("is_admin"));
    }

    #[test]
    fn test_direct_assignment_respects_guard() {
        let mut user = Entity::new(users());
        assert!(!user.set("password", "hunter2"));
        assert!(user.get_guarded("password").is_none());

        user.set_guarded("password", "hunter2");
        assert_eq!(user.get("password"), None);
        assert_eq!(user.get_guarded("password"), Some("hunter2".into()));
    }

    #[test]
    fn test_outbound_transform_on_read_only() {
        let mut user = Entity::new(users());
        user.set("name", "ann");
        assert_eq!(user.get_raw("name"), Some(&DatabaseValue::from("ann")));
        assert_eq!(user.get("name"), Some("ANN".into()));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut user = Entity::new(users());
        user.set("email", "a@b.c");
        user.sync_original();
        assert!(!user.is_dirty());

        user.set("name", "ann");
        user.set("email", "a@b.c");
        assert_eq!(user.dirty(), vec![("name".to_string(), DatabaseValue::from("ann"))]);
    }

    #[test]
    fn test_json_hides_guarded_and_includes_relations() {
        let mut user = Entity::new(users());
        user.set("name", "ann");
        user.set_guarded("password", "secret");
        user.set_relation("posts", RelationValue::Many(Vec::new()));
        user.set_relation("profile", RelationValue::One(None));

        let json = user.to_json();
        assert_eq!(json["name"], "ANN");
        assert!(json.get("password").is_none());
        assert_eq!(json["posts"], serde_json::json!([]));
        assert!(json["profile"].is_null());
    }

    #[test]
    fn test_deserialize_into_struct() {
        #[derive(Deserialize)]
        struct Summary {
            email: String,
        }

        let mut user = Entity::new(users());
        user.set("email", "X@Y.Z");
        let summary: Summary = user.deserialize().unwrap();
        assert_eq!(summary.email, "x@y.z");
    }

    #[test]
    fn test_fill_json_requires_object() {
        let mut user = Entity::new(users());
        assert!(user.fill_json(&serde_json::json!(["email"])).is_err());
        user.fill_json(&serde_json::json!({"email": "Q@Q.Q"})).unwrap();
        assert_eq!(user.get("email"), Some("q@q.q".into()));
    }
}
