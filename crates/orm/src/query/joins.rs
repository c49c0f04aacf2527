//! Query Builder JOIN operations

use super::builder::QueryBuilder;
use super::types::*;

impl QueryBuilder {
    /// Add INNER JOIN to the query
    pub fn join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_on(table, |j| j.on(first, operator, second))
    }

    /// Add LEFT JOIN to the query
    pub fn left_join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_with(JoinType::Left, table, |j| j.on(first, operator, second))
    }

    /// Add RIGHT JOIN to the query
    pub fn right_join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_with(JoinType::Right, table, |j| j.on(first, operator, second))
    }

    /// Add CROSS JOIN to the query
    pub fn cross_join(mut self, table: &str) -> Self {
        self.joins.push(JoinClause::new(JoinType::Cross, table));
        self
    }

    /// INNER JOIN with an ON clause built by `build`; the clause may bind values
    pub fn join_on<F>(self, table: &str, build: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_with(JoinType::Inner, table, build)
    }

    /// LEFT JOIN with an ON clause built by `build`
    pub fn left_join_on<F>(self, table: &str, build: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_with(JoinType::Left, table, build)
    }

    /// Add a prepared join clause
    pub fn add_join(mut self, join: JoinClause) -> Self {
        self.joins.push(join);
        self
    }

    fn join_with<F>(mut self, join_type: JoinType, table: &str, build: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.joins.push(build(JoinClause::new(join_type, table)));
        self
    }
}
