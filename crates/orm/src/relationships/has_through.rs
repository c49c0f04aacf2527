//! Two-hop relationships through an intermediate table
//!
//! Country -> User -> Post: `users.country_id` references the country and
//! `posts.user_id` references the user. The related query joins the
//! intermediate table and matches on its first key.

use super::metadata::{RelatedRef, RelationshipDescriptor, RelationshipType, ThroughConfig};
use crate::error::{ModelError, ModelResult};
use crate::query::{JoinClause, JoinType};

impl RelationshipDescriptor {
    /// At most one related row reached through `intermediate`
    pub fn has_one_through(
        related: impl Into<RelatedRef>,
        intermediate: impl Into<RelatedRef>,
        first_key: &str,
        second_key: &str,
    ) -> Self {
        Self::through_kind(
            RelationshipType::HasOneThrough,
            related.into(),
            intermediate.into(),
            first_key,
            second_key,
        )
    }

    /// Related rows reached through `intermediate`
    pub fn has_many_through(
        related: impl Into<RelatedRef>,
        intermediate: impl Into<RelatedRef>,
        first_key: &str,
        second_key: &str,
    ) -> Self {
        Self::through_kind(
            RelationshipType::HasManyThrough,
            related.into(),
            intermediate.into(),
            first_key,
            second_key,
        )
    }

    fn through_kind(
        kind: RelationshipType,
        related: RelatedRef,
        intermediate: RelatedRef,
        first_key: &str,
        second_key: &str,
    ) -> Self {
        let mut descriptor = Self::base(kind, Some(related), first_key);
        descriptor.through = Some(ThroughConfig::new(intermediate, first_key, second_key));
        descriptor
    }

    /// Column on the intermediate table that `second_key` references (default `id`)
    pub fn with_second_local_key(mut self, key: &str) -> Self {
        if let Some(through) = self.through.as_mut() {
            through.second_local_key = key.to_string();
        }
        self
    }

    pub(crate) fn through_config(&self) -> ModelResult<&ThroughConfig> {
        self.through.as_ref().ok_or_else(|| {
            ModelError::Configuration(format!(
                "{:?} relationship has no intermediate table",
                self.kind
            ))
        })
    }

    /// `INNER JOIN intermediate ON intermediate.second_local_key = related.second_key`
    pub(crate) fn through_join(&self) -> ModelResult<JoinClause> {
        let through = self.through_config()?;
        let intermediate = through.intermediate.table()?;
        let related = self.related_reference()?;
        Ok(JoinClause::new(JoinType::Inner, &intermediate).on(
            &format!("{}.{}", intermediate, through.second_local_key),
            "=",
            &format!("{}.{}", related, through.second_key),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::backends::Row;
    use crate::error::ModelError;
    use crate::model::{ModelHydrator, ModelSchema};
    use crate::relationships::{RelatedRef, RelationshipDescriptor};

    fn country() -> crate::model::Entity {
        ModelHydrator::new(Arc::new(ModelSchema::for_table("countries")))
            .hydrate(&Row::from_pairs([("id", 4)]))
            .unwrap()
    }

    #[test]
    fn test_has_many_through_query() {
        let posts = RelationshipDescriptor::has_many_through("posts", "users", "country_id", "user_id");
        assert_eq!(posts.match_column().unwrap(), "users.country_id");
        assert_eq!(
            posts.scoped_query(&country()).unwrap().to_sql().unwrap(),
            "SELECT \"posts\".* FROM \"posts\" \
             INNER JOIN \"users\" ON \"users\".\"id\" = \"posts\".\"user_id\" \
             WHERE \"users\".\"country_id\" = ?1"
        );
    }

    #[test]
    fn test_has_one_through_is_capped() {
        let latest = RelationshipDescriptor::has_one_through("posts", "users", "country_id", "user_id");
        assert_eq!(latest.scoped_query(&country()).unwrap().get_limit(), Some(1));
    }

    #[test]
    fn test_unresolved_intermediate_fails_before_sql() {
        let posts = RelationshipDescriptor::has_many_through(
            "posts",
            RelatedRef::Table(String::new()),
            "country_id",
            "user_id",
        );
        assert!(matches!(posts.correlate("countries"), Err(ModelError::Configuration(_))));
        assert!(matches!(posts.scoped_query(&country()), Err(ModelError::Configuration(_))));
    }
}
