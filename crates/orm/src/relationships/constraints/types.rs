//! Constraint kinds and the trait every eager-load constraint implements

use std::fmt;

use crate::error::ModelResult;
use crate::query::QueryBuilder;

/// What part of the related query a constraint touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    Where,
    Order,
    Limit,
    Offset,
    Raw,
}

/// A narrowing step applied to the query that loads a relation.
///
/// Constraints are shared between threads through `Arc`, so they hold only
/// plain data and rewrite the query they are given.
pub trait RelationshipConstraint: Send + Sync + fmt::Debug {
    /// Consume the query and return it narrowed
    fn apply(&self, query: QueryBuilder) -> ModelResult<QueryBuilder>;

    fn constraint_type(&self) -> ConstraintType;

    /// Human-readable form used in logs, e.g. `WHERE vote > 0`
    fn description(&self) -> String;

    /// Checked before `apply`; rejects values the query could not bind
    fn validate(&self) -> ModelResult<()> {
        Ok(())
    }
}
