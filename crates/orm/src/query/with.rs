//! Query Builder eager-loading requests

use std::sync::Arc;

use super::builder::QueryBuilder;
use crate::relationships::constraints::RelationshipConstraintBuilder;
use crate::relationships::eager_loading::{EagerLoadSpec, EagerLoadStrategy};

impl QueryBuilder {
    /// Eager load a relation; dotted names (`"subjects.votes"`) load nested relations
    pub fn with(mut self, relation: &str) -> Self {
        self.eager_loads.push(EagerLoadSpec::new(relation));
        self
    }

    /// Eager load several relations
    pub fn with_many(mut self, relations: &[&str]) -> Self {
        self.eager_loads
            .extend(relations.iter().map(|r| EagerLoadSpec::new(r)));
        self
    }

    /// Eager load a relation whose own query is narrowed by `constrain`.
    ///
    /// For dotted names the constraint applies to the last segment.
    pub fn with_constrained<F>(mut self, relation: &str, constrain: F) -> Self
    where
        F: FnOnce(RelationshipConstraintBuilder) -> RelationshipConstraintBuilder,
    {
        let constraints = constrain(RelationshipConstraintBuilder::new());
        self.eager_loads
            .push(EagerLoadSpec::new(relation).with_constraints(Arc::new(constraints)));
        self
    }

    /// Override the registry's eager-loading strategy for this query
    pub fn eager_strategy(mut self, strategy: EagerLoadStrategy) -> Self {
        self.eager_strategy = Some(strategy);
        self
    }

    /// Requested eager loads
    pub fn eager_loads(&self) -> &[EagerLoadSpec] {
        &self.eager_loads
    }
}
