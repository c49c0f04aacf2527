//! Query Builder relation aggregates
//!
//! Each request becomes a correlated scalar subquery in the select list when
//! the query is compiled.

use super::builder::QueryBuilder;
use super::types::WhereClause;
use crate::backends::DatabaseValue;
use crate::relationships::aggregates::RelationAggregate;

impl QueryBuilder {
    /// Add `<relation>_count`
    pub fn with_count(mut self, relation: &str) -> Self {
        self.aggregates.push(RelationAggregate::new(relation, "count", None));
        self
    }

    /// Add `<relation>_count` under a custom alias
    pub fn with_count_as(mut self, relation: &str, alias: &str) -> Self {
        self.aggregates
            .push(RelationAggregate::new(relation, "count", None).alias(alias));
        self
    }

    /// Count related rows whose `column` equals `value`; alias `<relation>_count_<value>`
    pub fn with_count_where<V: Into<DatabaseValue>>(
        mut self,
        relation: &str,
        column: &str,
        value: V,
    ) -> Self {
        self.aggregates
            .push(RelationAggregate::count_where(relation, column, value.into()));
        self
    }

    /// Add `<relation>_<function>` of a related column.
    ///
    /// The function is validated when the query is compiled.
    pub fn with_aggregate(mut self, relation: &str, column: &str, function: &str) -> Self {
        self.aggregates
            .push(RelationAggregate::new(relation, function, Some(column)));
        self
    }

    /// Aggregate narrowed by an extra predicate on the related rows
    pub fn with_aggregate_where<F>(
        mut self,
        relation: &str,
        column: Option<&str>,
        function: &str,
        alias: Option<&str>,
        constrain: F,
    ) -> Self
    where
        F: FnOnce(WhereClause) -> WhereClause,
    {
        let mut request =
            RelationAggregate::new(relation, function, column).constrained(constrain(WhereClause::new()));
        if let Some(alias) = alias {
            request = request.alias(alias);
        }
        self.aggregates.push(request);
        self
    }

    pub fn with_sum(self, relation: &str, column: &str) -> Self {
        self.with_aggregate(relation, column, "sum")
    }

    pub fn with_avg(self, relation: &str, column: &str) -> Self {
        self.with_aggregate(relation, column, "avg")
    }

    pub fn with_min(self, relation: &str, column: &str) -> Self {
        self.with_aggregate(relation, column, "min")
    }

    pub fn with_max(self, relation: &str, column: &str) -> Self {
        self.with_aggregate(relation, column, "max")
    }
}
