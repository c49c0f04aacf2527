//! Query Builder ORDER BY, GROUP BY, HAVING operations

use super::builder::QueryBuilder;
use super::types::*;
use super::where_clause::PredicateBuilder;
use crate::backends::DatabaseValue;

impl QueryBuilder {
    /// Add ORDER BY clause (ascending)
    pub fn order_by(self, column: &str) -> Self {
        self.order_by_direction(column, OrderDirection::Asc)
    }

    /// Add ORDER BY clause (descending)
    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by_direction(column, OrderDirection::Desc)
    }

    pub fn order_by_direction(mut self, column: &str, direction: OrderDirection) -> Self {
        self.orders.push(OrderClause::Column {
            column: column.to_string(),
            direction,
        });
        self
    }

    /// Raw ORDER BY expression; each `?` consumes the next binding
    pub fn order_by_raw(mut self, sql: &str, bindings: Vec<DatabaseValue>) -> Self {
        self.orders.push(OrderClause::Raw {
            sql: sql.to_string(),
            bindings,
        });
        self
    }

    /// Newest first by `created_at`
    pub fn latest(self) -> Self {
        self.order_by_desc("created_at")
    }

    /// Oldest first by `created_at`
    pub fn oldest(self) -> Self {
        self.order_by("created_at")
    }

    /// Drop every ORDER BY entry
    pub fn reorder(mut self) -> Self {
        self.orders.clear();
        self
    }

    /// Add GROUP BY columns
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Add HAVING condition
    pub fn having<V: Into<DatabaseValue>>(mut self, column: &str, operator: &str, value: V) -> Self {
        self.havings = std::mem::take(&mut self.havings).where_op(column, operator, value);
        self
    }

    pub fn or_having<V: Into<DatabaseValue>>(mut self, column: &str, operator: &str, value: V) -> Self {
        self.havings = std::mem::take(&mut self.havings).or_where_op(column, operator, value);
        self
    }

    /// Raw HAVING expression (`"COUNT(*) > ?"`)
    pub fn having_raw(mut self, sql: &str, bindings: Vec<DatabaseValue>) -> Self {
        self.havings.push(
            Connector::And,
            Predicate::Raw {
                sql: sql.to_string(),
                bindings,
            },
        );
        self
    }
}
