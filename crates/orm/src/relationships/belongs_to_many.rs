//! Many-to-many relationships through a pivot table

use super::metadata::{PivotConfig, RelatedRef, RelationshipDescriptor, RelationshipType};
use crate::error::{ModelError, ModelResult};
use crate::query::{JoinClause, JoinType};

impl RelationshipDescriptor {
    /// Related rows reached through `pivot_table`, where `foreign_pivot_key`
    /// references the parent and `related_pivot_key` the related row
    pub fn belongs_to_many(
        related: impl Into<RelatedRef>,
        pivot_table: &str,
        foreign_pivot_key: &str,
        related_pivot_key: &str,
    ) -> Self {
        let mut descriptor =
            Self::base(RelationshipType::ManyToMany, Some(related.into()), foreign_pivot_key);
        descriptor.pivot = Some(PivotConfig::new(pivot_table, foreign_pivot_key, related_pivot_key));
        descriptor
    }

    /// Column on the related table the pivot points at (default `id`)
    pub fn with_related_key(mut self, related_key: &str) -> Self {
        if let Some(pivot) = self.pivot.as_mut() {
            pivot.related_key = related_key.to_string();
        }
        self
    }

    pub(crate) fn pivot_config(&self) -> ModelResult<&PivotConfig> {
        self.pivot.as_ref().ok_or_else(|| {
            ModelError::Configuration(format!("{:?} relationship has no pivot table", self.kind))
        })
    }

    /// `INNER JOIN pivot ON related.related_key = pivot.related_pivot_key`
    pub(crate) fn pivot_join(&self) -> ModelResult<JoinClause> {
        let pivot = self.pivot_config()?;
        let related = self.related_reference()?;
        Ok(JoinClause::new(JoinType::Inner, &pivot.table).on(
            &format!("{}.{}", related, pivot.related_key),
            "=",
            &format!("{}.{}", pivot.table, pivot.related_pivot_key),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::backends::Row;
    use crate::model::{ModelHydrator, ModelSchema};
    use crate::relationships::{RelationshipDescriptor, RelationshipMeta};

    #[test]
    fn test_match_column_is_on_the_pivot() {
        let roles = RelationshipDescriptor::belongs_to_many("roles", "role_user", "user_id", "role_id");
        assert_eq!(roles.match_column().unwrap(), "role_user.user_id");
        assert_eq!(roles.joins().unwrap().len(), 1);
        assert_eq!(roles.foreign_key(), "user_id");
    }

    #[test]
    fn test_scoped_query_joins_pivot() {
        let roles = RelationshipDescriptor::belongs_to_many("roles", "role_user", "user_id", "role_id");
        let user = ModelHydrator::new(Arc::new(ModelSchema::for_table("users")))
            .hydrate(&Row::from_pairs([("id", 1)]))
            .unwrap();

        assert_eq!(
            roles.scoped_query(&user).unwrap().to_sql().unwrap(),
            "SELECT \"roles\".* FROM \"roles\" \
             INNER JOIN \"role_user\" ON \"roles\".\"id\" = \"role_user\".\"role_id\" \
             WHERE \"role_user\".\"user_id\" = ?1"
        );
    }

    #[test]
    fn test_custom_related_key() {
        let tags = RelationshipDescriptor::belongs_to_many("tags", "post_tag", "post_id", "tag_slug")
            .with_related_key("slug");
        let join = &tags.joins().unwrap()[0];
        assert_eq!(join.table, "post_tag");
        assert_eq!(tags.pivot().unwrap().related_key, "slug");
    }
}
