//! Query Builder WHERE clause operations
//!
//! The predicate methods live on the [`PredicateBuilder`] trait so the same
//! vocabulary works on a query, a nested group and a join's ON clause.

use super::builder::QueryBuilder;
use super::types::*;
use crate::backends::DatabaseValue;

/// Fluent predicate construction shared by queries, groups and joins
pub trait PredicateBuilder: Sized {
    /// Append a predicate with the given connector
    fn push_predicate(self, connector: Connector, predicate: Predicate) -> Self;

    /// Add WHERE condition with an operator given as text (`"="`, `">="`, `"like"` ...)
    fn where_op<V: Into<DatabaseValue>>(self, column: &str, operator: &str, value: V) -> Self {
        let predicate = basic_from_str(column, operator, value.into());
        self.push_predicate(Connector::And, predicate)
    }

    fn or_where_op<V: Into<DatabaseValue>>(self, column: &str, operator: &str, value: V) -> Self {
        let predicate = basic_from_str(column, operator, value.into());
        self.push_predicate(Connector::Or, predicate)
    }

    /// Add WHERE condition with equality
    fn where_eq<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(Connector::And, basic(column, QueryOperator::Equal, value))
    }

    fn or_where_eq<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(Connector::Or, basic(column, QueryOperator::Equal, value))
    }

    /// Add WHERE condition with not equal
    fn where_ne<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(Connector::And, basic(column, QueryOperator::NotEqual, value))
    }

    fn or_where_ne<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(Connector::Or, basic(column, QueryOperator::NotEqual, value))
    }

    /// Add WHERE condition with greater than
    fn where_gt<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(Connector::And, basic(column, QueryOperator::GreaterThan, value))
    }

    fn or_where_gt<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(Connector::Or, basic(column, QueryOperator::GreaterThan, value))
    }

    /// Add WHERE condition with greater than or equal
    fn where_gte<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(
            Connector::And,
            basic(column, QueryOperator::GreaterThanOrEqual, value),
        )
    }

    fn or_where_gte<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(
            Connector::Or,
            basic(column, QueryOperator::GreaterThanOrEqual, value),
        )
    }

    /// Add WHERE condition with less than
    fn where_lt<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(Connector::And, basic(column, QueryOperator::LessThan, value))
    }

    fn or_where_lt<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(Connector::Or, basic(column, QueryOperator::LessThan, value))
    }

    /// Add WHERE condition with less than or equal
    fn where_lte<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(
            Connector::And,
            basic(column, QueryOperator::LessThanOrEqual, value),
        )
    }

    fn or_where_lte<V: Into<DatabaseValue>>(self, column: &str, value: V) -> Self {
        self.push_predicate(
            Connector::Or,
            basic(column, QueryOperator::LessThanOrEqual, value),
        )
    }

    /// Add WHERE condition with LIKE
    fn where_like(self, column: &str, pattern: &str) -> Self {
        self.push_predicate(Connector::And, basic(column, QueryOperator::Like, pattern))
    }

    fn or_where_like(self, column: &str, pattern: &str) -> Self {
        self.push_predicate(Connector::Or, basic(column, QueryOperator::Like, pattern))
    }

    /// Add WHERE condition with NOT LIKE
    fn where_not_like(self, column: &str, pattern: &str) -> Self {
        self.push_predicate(Connector::And, basic(column, QueryOperator::NotLike, pattern))
    }

    fn or_where_not_like(self, column: &str, pattern: &str) -> Self {
        self.push_predicate(Connector::Or, basic(column, QueryOperator::NotLike, pattern))
    }

    /// Add WHERE column IN (...). An empty list matches nothing.
    fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.push_predicate(Connector::And, in_list(column, values, false))
    }

    fn or_where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.push_predicate(Connector::Or, in_list(column, values, false))
    }

    /// Add WHERE column NOT IN (...). An empty list matches everything.
    fn where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.push_predicate(Connector::And, in_list(column, values, true))
    }

    fn or_where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.push_predicate(Connector::Or, in_list(column, values, true))
    }

    /// Add WHERE column IN (subquery)
    fn where_in_subquery(self, column: &str, query: QueryBuilder) -> Self {
        self.push_predicate(
            Connector::And,
            Predicate::InSubquery {
                column: column.to_string(),
                query: Box::new(query),
                negated: false,
            },
        )
    }

    fn where_not_in_subquery(self, column: &str, query: QueryBuilder) -> Self {
        self.push_predicate(
            Connector::And,
            Predicate::InSubquery {
                column: column.to_string(),
                query: Box::new(query),
                negated: true,
            },
        )
    }

    /// Add WHERE column BETWEEN low AND high
    fn where_between<V: Into<DatabaseValue>>(self, column: &str, low: V, high: V) -> Self {
        self.push_predicate(Connector::And, between(column, low, high, false))
    }

    fn or_where_between<V: Into<DatabaseValue>>(self, column: &str, low: V, high: V) -> Self {
        self.push_predicate(Connector::Or, between(column, low, high, false))
    }

    fn where_not_between<V: Into<DatabaseValue>>(self, column: &str, low: V, high: V) -> Self {
        self.push_predicate(Connector::And, between(column, low, high, true))
    }

    fn or_where_not_between<V: Into<DatabaseValue>>(self, column: &str, low: V, high: V) -> Self {
        self.push_predicate(Connector::Or, between(column, low, high, true))
    }

    /// Add WHERE column IS NULL
    fn where_null(self, column: &str) -> Self {
        self.push_predicate(Connector::And, null_check(column, false))
    }

    fn or_where_null(self, column: &str) -> Self {
        self.push_predicate(Connector::Or, null_check(column, false))
    }

    /// Add WHERE column IS NOT NULL
    fn where_not_null(self, column: &str) -> Self {
        self.push_predicate(Connector::And, null_check(column, true))
    }

    fn or_where_not_null(self, column: &str) -> Self {
        self.push_predicate(Connector::Or, null_check(column, true))
    }

    /// Compare two columns
    fn where_column(self, first: &str, operator: &str, second: &str) -> Self {
        self.push_predicate(Connector::And, column_compare(first, operator, second))
    }

    fn or_where_column(self, first: &str, operator: &str, second: &str) -> Self {
        self.push_predicate(Connector::Or, column_compare(first, operator, second))
    }

    /// Add WHERE EXISTS (subquery)
    fn where_exists(self, query: QueryBuilder) -> Self {
        self.push_predicate(
            Connector::And,
            Predicate::Exists {
                query: Box::new(query),
                negated: false,
            },
        )
    }

    fn or_where_exists(self, query: QueryBuilder) -> Self {
        self.push_predicate(
            Connector::Or,
            Predicate::Exists {
                query: Box::new(query),
                negated: false,
            },
        )
    }

    fn where_not_exists(self, query: QueryBuilder) -> Self {
        self.push_predicate(
            Connector::And,
            Predicate::Exists {
                query: Box::new(query),
                negated: true,
            },
        )
    }

    /// Raw predicate; each `?` consumes the next binding
    fn where_raw(self, sql: &str, bindings: Vec<DatabaseValue>) -> Self {
        self.push_predicate(
            Connector::And,
            Predicate::Raw {
                sql: sql.to_string(),
                bindings,
            },
        )
    }

    fn or_where_raw(self, sql: &str, bindings: Vec<DatabaseValue>) -> Self {
        self.push_predicate(
            Connector::Or,
            Predicate::Raw {
                sql: sql.to_string(),
                bindings,
            },
        )
    }

    /// Parenthesized group joined with AND
    fn where_group<F>(self, build: F) -> Self
    where
        F: FnOnce(WhereClause) -> WhereClause,
    {
        let group = build(WhereClause::new());
        if group.is_empty() {
            return self;
        }
        self.push_predicate(Connector::And, Predicate::Group(group))
    }

    /// Parenthesized group joined with OR
    fn or_where_group<F>(self, build: F) -> Self
    where
        F: FnOnce(WhereClause) -> WhereClause,
    {
        let group = build(WhereClause::new());
        if group.is_empty() {
            return self;
        }
        self.push_predicate(Connector::Or, Predicate::Group(group))
    }
}

impl PredicateBuilder for WhereClause {
    fn push_predicate(mut self, connector: Connector, predicate: Predicate) -> Self {
        self.push(connector, predicate);
        self
    }
}

impl PredicateBuilder for QueryBuilder {
    fn push_predicate(mut self, connector: Connector, predicate: Predicate) -> Self {
        self.wheres.push(connector, predicate);
        self
    }
}

impl PredicateBuilder for JoinClause {
    fn push_predicate(mut self, connector: Connector, predicate: Predicate) -> Self {
        self.conditions.push(connector, predicate);
        self
    }
}

fn basic<V: Into<DatabaseValue>>(column: &str, operator: QueryOperator, value: V) -> Predicate {
    Predicate::Basic {
        column: column.to_string(),
        operator,
        value: value.into(),
    }
}

fn basic_from_str(column: &str, operator: &str, value: DatabaseValue) -> Predicate {
    match operator.parse::<QueryOperator>() {
        Ok(operator) => basic(column, operator, value),
        Err(err) => Predicate::Invalid(err),
    }
}

fn in_list<I, V>(column: &str, values: I, negated: bool) -> Predicate
where
    I: IntoIterator<Item = V>,
    V: Into<DatabaseValue>,
{
    Predicate::In {
        column: column.to_string(),
        values: values.into_iter().map(Into::into).collect(),
        negated,
    }
}

fn between<V: Into<DatabaseValue>>(column: &str, low: V, high: V, negated: bool) -> Predicate {
    Predicate::Between {
        column: column.to_string(),
        low: low.into(),
        high: high.into(),
        negated,
    }
}

fn null_check(column: &str, negated: bool) -> Predicate {
    Predicate::Null {
        column: column.to_string(),
        negated,
    }
}

fn column_compare(first: &str, operator: &str, second: &str) -> Predicate {
    match operator.parse::<QueryOperator>() {
        Ok(operator) => Predicate::Column {
            first: first.to_string(),
            operator,
            second: second.to_string(),
        },
        Err(err) => Predicate::Invalid(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates_record_connectors_in_order() {
        let query = QueryBuilder::table("users")
            .where_eq("active", true)
            .or_where_gt("age", 30)
            .where_null("deleted_at");

        let connectors: Vec<_> = query.wheres().conditions().iter().map(|(c, _)| *c).collect();
        assert_eq!(connectors, vec![Connector::And, Connector::Or, Connector::And]);
    }

    #[test]
    fn test_empty_group_is_ignored() {
        let query = QueryBuilder::table("users").where_group(|w| w);
        assert!(query.wheres().is_empty());
    }

    #[test]
    fn test_unknown_operator_is_kept_as_invalid_predicate() {
        let query = QueryBuilder::table("users").where_op("age", "~~", 1);
        assert!(matches!(query.wheres().conditions()[0].1, Predicate::Invalid(_)));
    }
}
