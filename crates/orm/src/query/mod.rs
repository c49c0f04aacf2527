//! Query Builder Module - Fluent query state, compiled by [`crate::sql`]

pub mod aggregates;
pub mod builder;
pub mod cte;
pub mod dml;
pub mod execution;
pub mod joins;
pub mod locking;
pub mod ordering;
pub mod pagination;
pub mod select;
pub mod soft_deletes;
pub mod types;
pub mod unions;
pub mod upsert;
pub mod where_clause;
pub mod with;

pub use builder::{Query, QueryBuilder};
pub use execution::Page;
pub use types::{
    AggregateFunction, Connector, JoinClause, JoinType, LockMode, OrderDirection, Predicate,
    QueryOperator, QueryType, SelectItem, SoftDeleteScope, WhereClause,
};
pub use upsert::UpsertBuilder;
pub use where_clause::PredicateBuilder;
