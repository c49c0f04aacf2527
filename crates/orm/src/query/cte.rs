//! Query Builder common table expressions

use super::builder::QueryBuilder;
use super::types::CommonTableExpression;

impl QueryBuilder {
    /// Prepend `WITH name AS (query)`
    pub fn with_cte(mut self, name: &str, query: QueryBuilder) -> Self {
        self.ctes.push(CommonTableExpression {
            name: name.to_string(),
            query: Box::new(query),
            recursive: false,
        });
        self
    }

    /// Prepend `WITH RECURSIVE name AS (query)`
    pub fn with_recursive_cte(mut self, name: &str, query: QueryBuilder) -> Self {
        self.ctes.push(CommonTableExpression {
            name: name.to_string(),
            query: Box::new(query),
            recursive: true,
        });
        self
    }
}
