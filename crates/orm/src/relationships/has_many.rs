//! HasMany Relationship - one parent, many related rows holding its key

use super::metadata::{RelatedRef, RelationshipDescriptor, RelationshipType};

impl RelationshipDescriptor {
    /// Parent has many related rows whose `foreign_key` references the parent's `id`
    pub fn has_many(related: impl Into<RelatedRef>, foreign_key: &str) -> Self {
        Self::base(RelationshipType::HasMany, Some(related.into()), foreign_key)
    }
}
