//! Relationships Module - descriptors, aggregates and eager loading

pub mod aggregates;
pub mod belongs_to;
pub mod belongs_to_many;
pub mod constraints;
pub mod descriptor;
pub mod eager_loading;
pub mod has_many;
pub mod has_one;
pub mod has_through;
pub mod metadata;
pub mod morph;
pub mod registry;
pub mod traits;

pub use aggregates::{AggregateSubqueryBuilder, RelationAggregate};
pub use constraints::{ConstraintType, RelationshipConstraint, RelationshipConstraintBuilder};
pub use eager_loading::{EagerLoadResolver, EagerLoadSpec, EagerLoadStrategy};
pub use metadata::{
    PivotConfig, PolymorphicConfig, RelatedRef, RelationshipDescriptor, RelationshipType,
    ThroughConfig,
};
pub use registry::ModelRegistry;
pub use traits::RelationshipMeta;
