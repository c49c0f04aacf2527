//! Polymorphic relationships
//!
//! The related side stores the owner's key in `<name>_id` and the owner's
//! type in `<name>_type`. MorphOne/MorphMany add the type equality to every
//! correlation; MorphTo resolves its target model per row through a type map.

use std::sync::Arc;

use super::metadata::{PolymorphicConfig, RelatedRef, RelationshipDescriptor, RelationshipType};
use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};
use crate::model::{Entity, ModelRef};
use crate::query::{PredicateBuilder, QueryBuilder};

impl RelationshipDescriptor {
    /// Owner has one polymorphic child tagged with `morph_type`
    pub fn morph_one(related: impl Into<RelatedRef>, name: &str, morph_type: &str) -> Self {
        Self::morph_owner(RelationshipType::MorphOne, related.into(), name, morph_type)
    }

    /// Owner has many polymorphic children tagged with `morph_type`
    pub fn morph_many(related: impl Into<RelatedRef>, name: &str, morph_type: &str) -> Self {
        Self::morph_owner(RelationshipType::MorphMany, related.into(), name, morph_type)
    }

    /// Child side: the owner's model is picked by the stored `<name>_type`
    pub fn morph_to(name: &str, types: &[(&str, ModelRef)]) -> Self {
        let mut morph = PolymorphicConfig::new(name);
        morph.type_map = types
            .iter()
            .map(|(morph_type, model)| (morph_type.to_string(), *model))
            .collect();
        let mut descriptor = Self::base(RelationshipType::MorphTo, None, &morph.id_column);
        descriptor.morph = Some(morph);
        descriptor
    }

    fn morph_owner(kind: RelationshipType, related: RelatedRef, name: &str, morph_type: &str) -> Self {
        let mut morph = PolymorphicConfig::new(name);
        morph.morph_type = Some(morph_type.to_string());
        let mut descriptor = Self::base(kind, Some(related), &morph.id_column);
        descriptor.morph = Some(morph);
        descriptor
    }

    /// Override the conventional `<name>_type` / `<name>_id` columns
    pub fn with_morph_columns(mut self, type_column: &str, id_column: &str) -> Self {
        if let Some(morph) = self.morph.as_mut() {
            morph.type_column = type_column.to_string();
            morph.id_column = id_column.to_string();
            self.foreign_key = id_column.to_string();
        }
        self
    }

    pub(crate) fn morph_config(&self) -> ModelResult<&PolymorphicConfig> {
        self.morph.as_ref().ok_or_else(|| {
            ModelError::Configuration(format!(
                "{:?} relationship has no polymorphic configuration",
                self.kind
            ))
        })
    }

    /// Qualified type column and the value it must hold
    pub(crate) fn type_filter(&self) -> ModelResult<(String, String)> {
        let morph = self.morph_config()?;
        let morph_type = morph.morph_type.clone().ok_or_else(|| {
            ModelError::Configuration(format!(
                "Polymorphic relationship '{}' has no morph type",
                morph.name
            ))
        })?;
        Ok((
            format!("{}.{}", self.related_reference()?, morph.type_column),
            morph_type,
        ))
    }

    /// Model a MorphTo parent points at, `None` when its type column is null
    pub fn morph_target(&self, parent: &Entity) -> ModelResult<Option<ModelRef>> {
        let morph = self.morph_config()?;
        let stored = match parent.get_raw(&morph.type_column).and_then(DatabaseValue::match_key) {
            Some(stored) => stored,
            None => return Ok(None),
        };
        morph.resolve_type(&stored).copied().map(Some).ok_or_else(|| {
            ModelError::Configuration(format!(
                "Unknown morph type '{}' for '{}'",
                stored, morph.name
            ))
        })
    }

    /// Single-row query against the owner model named by the parent's type column
    pub(crate) fn morph_to_query(&self, parent: &Entity) -> ModelResult<QueryBuilder> {
        self.validate()?;
        let morph = self.morph_config()?;
        let id = parent
            .get_raw(&morph.id_column)
            .cloned()
            .unwrap_or(DatabaseValue::Null);

        let (target, resolvable) = match self.morph_target(parent)? {
            Some(target) => (target, !id.is_null()),
            None => {
                let fallback = morph
                    .type_map
                    .first()
                    .map(|(_, model)| *model)
                    .ok_or_else(|| self.unsupported("declares no target types"))?;
                (fallback, false)
            }
        };

        let schema = Arc::new(target.schema());
        let key = format!("{}.{}", schema.table, self.owner_key);
        let all_columns = format!("{}.*", schema.table);
        let query = QueryBuilder::for_model(schema).select(&[all_columns.as_str()]);
        let query = if resolvable {
            query.where_eq(&key, id)
        } else {
            query.where_raw("0 = 1", Vec::new())
        };
        Ok(query.limit(1))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backends::Row;
    use crate::model::{Model, ModelHydrator, ModelSchema};

    struct Post;

    impl Model for Post {
        fn table_name() -> &'static str {
            "posts"
        }
    }

    struct Video;

    impl Model for Video {
        fn table_name() -> &'static str {
            "videos"
        }
    }

    fn comment(pairs: Vec<(&str, DatabaseValue)>) -> Entity {
        ModelHydrator::new(Arc::new(ModelSchema::for_table("comments")))
            .hydrate(&Row::from_pairs(pairs))
            .unwrap()
    }

    fn commentable() -> RelationshipDescriptor {
        RelationshipDescriptor::morph_to(
            "commentable",
            &[("post", Post::model_ref()), ("video", Video::model_ref())],
        )
    }

    #[test]
    fn test_morph_many_correlation_includes_type() {
        let comments = RelationshipDescriptor::morph_many("comments", "commentable", "post");
        let mut query = QueryBuilder::table("comments");
        query.wheres.and_group(comments.correlate("posts").unwrap());

        let compiled = query.compile(&Default::default()).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT * FROM \"comments\" WHERE (\"comments\".\"commentable_id\" = \"posts\".\"id\" \
             AND \"comments\".\"commentable_type\" = ?1)"
        );
        assert_eq!(compiled.bindings, vec![DatabaseValue::from("post")]);
    }

    #[test]
    fn test_morph_to_resolves_target_table() {
        let parent = comment(vec![
            ("id", 1.into()),
            ("commentable_type", "video".into()),
            ("commentable_id", 9.into()),
        ]);
        let query = commentable().scoped_query(&parent).unwrap();
        assert_eq!(
            query.to_sql().unwrap(),
            "SELECT \"videos\".* FROM \"videos\" WHERE \"videos\".\"id\" = ?1 LIMIT 1"
        );
    }

    #[test]
    fn test_morph_to_with_null_type_matches_nothing() {
        let parent = comment(vec![
            ("id", 1.into()),
            ("commentable_type", DatabaseValue::Null),
            ("commentable_id", DatabaseValue::Null),
        ]);
        let sql = commentable().scoped_query(&parent).unwrap().to_sql().unwrap();
        assert!(sql.contains("WHERE 0 = 1"));
    }

    #[test]
    fn test_unknown_morph_type_is_configuration_error() {
        let parent = comment(vec![
            ("commentable_type", "podcast".into()),
            ("commentable_id", 2.into()),
        ]);
        assert!(matches!(
            commentable().scoped_query(&parent),
            Err(ModelError::Configuration(_))
        ));
    }

    #[test]
    fn test_morph_to_cannot_correlate() {
        assert!(matches!(
            commentable().correlate("comments"),
            Err(ModelError::UnsupportedRelation(_))
        ));
    }
}
