//! Query Builder UNION operations

use super::builder::QueryBuilder;
use super::types::UnionClause;

impl QueryBuilder {
    /// UNION with another query (duplicates removed)
    pub fn union(mut self, query: QueryBuilder) -> Self {
        self.unions.push(UnionClause {
            query: Box::new(query),
            all: false,
        });
        self
    }

    /// UNION ALL with another query
    pub fn union_all(mut self, query: QueryBuilder) -> Self {
        self.unions.push(UnionClause {
            query: Box::new(query),
            all: true,
        });
        self
    }
}
