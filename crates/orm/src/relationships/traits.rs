//! Read-only metadata interface over relationship descriptors
//!
//! Aggregate and eager-load code reads keys, pivot tables and intermediate
//! hops through this trait instead of reaching into descriptor fields.

use super::metadata::{
    PivotConfig, PolymorphicConfig, RelatedRef, RelationshipDescriptor, RelationshipType,
    ThroughConfig,
};

/// Read-only view of a relationship's metadata
pub trait RelationshipMeta {
    /// Relationship kind
    fn kind(&self) -> RelationshipType;

    /// Related model or table; `None` for MorphTo
    fn related(&self) -> Option<&RelatedRef>;

    /// Key on the parent side
    fn local_key(&self) -> &str;

    /// Foreign key column
    fn foreign_key(&self) -> &str;

    /// Key on the owning side of a BelongsTo/MorphTo
    fn owner_key(&self) -> &str;

    fn pivot(&self) -> Option<&PivotConfig>;

    fn through(&self) -> Option<&ThroughConfig>;

    fn morph(&self) -> Option<&PolymorphicConfig>;

    /// Whether the relation holds a list rather than a single entity
    fn is_collection(&self) -> bool {
        self.kind().is_collection()
    }

    fn pivot_table(&self) -> Option<&str> {
        self.pivot().map(|pivot| pivot.table.as_str())
    }
}

impl RelationshipMeta for RelationshipDescriptor {
    fn kind(&self) -> RelationshipType {
        self.kind
    }

    fn related(&self) -> Option<&RelatedRef> {
        self.related.as_ref()
    }

    fn local_key(&self) -> &str {
        &self.local_key
    }

    fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    fn owner_key(&self) -> &str {
        &self.owner_key
    }

    fn pivot(&self) -> Option<&PivotConfig> {
        self.pivot.as_ref()
    }

    fn through(&self) -> Option<&ThroughConfig> {
        self.through.as_ref()
    }

    fn morph(&self) -> Option<&PolymorphicConfig> {
        self.morph.as_ref()
    }
}
