//! BelongsTo Relationship - the parent holds the foreign key

use super::metadata::{RelatedRef, RelationshipDescriptor, RelationshipType};

impl RelationshipDescriptor {
    /// Parent's `foreign_key` references the related row's owner key (`id`)
    pub fn belongs_to(related: impl Into<RelatedRef>, foreign_key: &str) -> Self {
        Self::base(RelationshipType::BelongsTo, Some(related.into()), foreign_key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::backends::{DatabaseValue, Row};
    use crate::model::{ModelHydrator, ModelSchema};
    use crate::relationships::RelationshipDescriptor;

    #[test]
    fn test_belongs_to_matches_owner_key() {
        let category = RelationshipDescriptor::belongs_to("categories", "category_id");
        assert_eq!(category.match_column().unwrap(), "categories.id");
        assert_eq!(category.parent_key(), "category_id");

        let clause = category.correlate("subjects").unwrap();
        let (_, predicate) = &clause.conditions()[0];
        assert!(matches!(
            predicate,
            crate::query::Predicate::Column { first, second, .. }
                if first == "categories.id" && second == "subjects.category_id"
        ));
    }

    #[test]
    fn test_scoped_query_binds_foreign_key_value() {
        let category = RelationshipDescriptor::belongs_to("categories", "category_id")
            .with_owner_key("code");
        let subject = ModelHydrator::new(Arc::new(ModelSchema::for_table("subjects")))
            .hydrate(&Row::from_pairs([
                ("id", DatabaseValue::Int64(1)),
                ("category_id", DatabaseValue::from("rust")),
            ]))
            .unwrap();

        let compiled = category
            .scoped_query(&subject)
            .unwrap()
            .compile(&Default::default())
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT \"categories\".* FROM \"categories\" WHERE \"categories\".\"code\" = ?1 LIMIT 1"
        );
        assert_eq!(compiled.bindings, vec![DatabaseValue::from("rust")]);
    }
}
