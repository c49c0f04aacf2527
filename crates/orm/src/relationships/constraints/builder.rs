//! Constraint builder for narrowing eager-loaded relationship queries

use std::collections::HashSet;
use std::sync::Arc;

use super::implementations::*;
use super::types::{ConstraintType, RelationshipConstraint};
use crate::backends::DatabaseValue;
use crate::error::ModelResult;
use crate::query::{OrderDirection, QueryBuilder, QueryOperator};

/// Builder for relationship constraints with validation
#[derive(Debug, Clone, Default)]
pub struct RelationshipConstraintBuilder {
    constraints: Vec<Arc<dyn RelationshipConstraint>>,
    /// Track constraint types to answer `has_constraint_type`
    applied_types: HashSet<ConstraintType>,
}

impl RelationshipConstraintBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and apply all constraints in insertion order
    pub fn apply_all(&self, mut query: QueryBuilder) -> ModelResult<QueryBuilder> {
        for constraint in &self.constraints {
            constraint.validate()?;
            query = constraint.apply(query)?;
        }
        Ok(query)
    }

    /// Get all constraints
    pub fn constraints(&self) -> &[Arc<dyn RelationshipConstraint>] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Check if a constraint type has been applied
    pub fn has_constraint_type(&self, constraint_type: ConstraintType) -> bool {
        self.applied_types.contains(&constraint_type)
    }

    /// Add any constraint, including caller-defined ones
    pub fn constraint<C: RelationshipConstraint + 'static>(mut self, constraint: C) -> Self {
        self.applied_types.insert(constraint.constraint_type());
        self.constraints.push(Arc::new(constraint));
        self
    }

    fn compare<V: Into<DatabaseValue>>(self, column: &str, operator: QueryOperator, value: V) -> Self {
        self.constraint(WhereConstraint {
            column: column.to_string(),
            operator,
            value: value.into(),
        })
    }

    pub fn where_eq<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.compare(column, QueryOperator::Equal, value)
    }

    pub fn where_ne<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.compare(column, QueryOperator::NotEqual, value)
    }

    pub fn where_gt<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.compare(column, QueryOperator::GreaterThan, value)
    }

    pub fn where_gte<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.compare(column, QueryOperator::GreaterThanOrEqual, value)
    }

    pub fn where_lt<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.compare(column, QueryOperator::LessThan, value)
    }

    pub fn where_lte<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.compare(column, QueryOperator::LessThanOrEqual, value)
    }

    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.compare(column, QueryOperator::Like, pattern)
    }

    pub fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.constraint(WhereInConstraint {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        })
    }

    pub fn where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.constraint(WhereInConstraint {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        })
    }

    pub fn where_null(self, column: &str) -> Self {
        self.constraint(WhereNullConstraint {
            column: column.to_string(),
            negated: false,
        })
    }

    pub fn where_not_null(self, column: &str) -> Self {
        self.constraint(WhereNullConstraint {
            column: column.to_string(),
            negated: true,
        })
    }

    /// Add raw WHERE constraint; `?` markers consume `bindings`
    pub fn where_raw(self, sql: &str, bindings: Vec<DatabaseValue>) -> Self {
        self.constraint(RawConstraint {
            sql: sql.to_string(),
            bindings,
        })
    }

    pub fn order_by(self, column: &str) -> Self {
        self.constraint(OrderConstraint {
            column: column.to_string(),
            direction: OrderDirection::Asc,
        })
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.constraint(OrderConstraint {
            column: column.to_string(),
            direction: OrderDirection::Desc,
        })
    }

    pub fn limit(self, count: i64) -> Self {
        self.constraint(LimitConstraint { count })
    }

    pub fn offset(self, count: i64) -> Self {
        self.constraint(OffsetConstraint { count })
    }
}
