//! HasOne Relationship - the related table holds a foreign key to the parent

use super::metadata::{RelatedRef, RelationshipDescriptor, RelationshipType};

impl RelationshipDescriptor {
    /// Parent has one related row whose `foreign_key` references the parent's `id`
    pub fn has_one(related: impl Into<RelatedRef>, foreign_key: &str) -> Self {
        Self::base(RelationshipType::HasOne, Some(related.into()), foreign_key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::backends::Row;
    use crate::model::{ModelHydrator, ModelSchema};
    use crate::relationships::RelationshipDescriptor;

    #[test]
    fn test_has_one_correlation() {
        let profile = RelationshipDescriptor::has_one("profiles", "user_id");
        assert_eq!(profile.match_column().unwrap(), "profiles.user_id");
        assert_eq!(profile.parent_key(), "id");
        assert!(profile.joins().unwrap().is_empty());
    }

    #[test]
    fn test_has_one_scoped_query_is_capped() {
        let profile = RelationshipDescriptor::has_one("profiles", "user_id");
        let user = ModelHydrator::new(Arc::new(ModelSchema::for_table("users")))
            .hydrate(&Row::from_pairs([("id", 3)]))
            .unwrap();

        let compiled = profile
            .scoped_query(&user)
            .unwrap()
            .compile(&Default::default())
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT \"profiles\".* FROM \"profiles\" WHERE \"profiles\".\"user_id\" = ?1 LIMIT 1"
        );
        assert_eq!(compiled.bindings.len(), 1);
    }

    #[test]
    fn test_custom_local_key() {
        let profile = RelationshipDescriptor::has_one("profiles", "user_uuid").with_local_key("uuid");
        let clause = profile.correlate("users").unwrap();
        assert_eq!(clause.len(), 1);
        assert_eq!(profile.parent_key(), "uuid");
    }
}
