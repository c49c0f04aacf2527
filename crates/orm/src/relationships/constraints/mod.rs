//! Relationship constraint system for eager loading
//!
//! Constraints narrow the query that loads a relation: extra predicates,
//! ordering and LIMIT/OFFSET.

pub mod builder;
pub mod implementations;
pub mod types;

pub use builder::RelationshipConstraintBuilder;
pub use types::{ConstraintType, RelationshipConstraint};
