//! Query Builder Types - Core types and enums for query building

use std::fmt;

use super::builder::QueryBuilder;
use crate::backends::DatabaseValue;
use crate::error::ModelError;

/// Comparison operators for column/value predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "!="),
            QueryOperator::GreaterThan => write!(f, ">"),
            QueryOperator::GreaterThanOrEqual => write!(f, ">="),
            QueryOperator::LessThan => write!(f, "<"),
            QueryOperator::LessThanOrEqual => write!(f, "<="),
            QueryOperator::Like => write!(f, "LIKE"),
            QueryOperator::NotLike => write!(f, "NOT LIKE"),
        }
    }
}

impl std::str::FromStr for QueryOperator {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "=" => Ok(QueryOperator::Equal),
            "!=" | "<>" => Ok(QueryOperator::NotEqual),
            ">" => Ok(QueryOperator::GreaterThan),
            ">=" => Ok(QueryOperator::GreaterThanOrEqual),
            "<" => Ok(QueryOperator::LessThan),
            "<=" => Ok(QueryOperator::LessThanOrEqual),
            "LIKE" => Ok(QueryOperator::Like),
            "NOT LIKE" => Ok(QueryOperator::NotLike),
            other => Err(ModelError::InvalidArgument(format!(
                "Unsupported operator '{}'",
                other
            ))),
        }
    }
}

/// Boolean connector joining a predicate to the ones before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connector::And => write!(f, "AND"),
            Connector::Or => write!(f, "OR"),
        }
    }
}

/// A single node of a predicate tree
#[derive(Debug, Clone)]
pub enum Predicate {
    /// `column <op> ?`
    Basic {
        column: String,
        operator: QueryOperator,
        value: DatabaseValue,
    },
    /// `column [NOT] IN (?, ...)`
    In {
        column: String,
        values: Vec<DatabaseValue>,
        negated: bool,
    },
    /// `column [NOT] IN (SELECT ...)`
    InSubquery {
        column: String,
        query: Box<QueryBuilder>,
        negated: bool,
    },
    /// `column [NOT] BETWEEN ? AND ?`
    Between {
        column: String,
        low: DatabaseValue,
        high: DatabaseValue,
        negated: bool,
    },
    /// `column IS [NOT] NULL`
    Null { column: String, negated: bool },
    /// `first <op> second`, both sides identifiers
    Column {
        first: String,
        operator: QueryOperator,
        second: String,
    },
    /// `[NOT] EXISTS (SELECT ...)`
    Exists {
        query: Box<QueryBuilder>,
        negated: bool,
    },
    /// Parenthesized group
    Group(WhereClause),
    /// Raw SQL with `?` markers consumed left to right by `bindings`
    Raw {
        sql: String,
        bindings: Vec<DatabaseValue>,
    },
    /// Predicate rejected while building; reported when compiled
    Invalid(ModelError),
}

/// Ordered predicate tree; each entry carries the connector that precedes it
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    pub(crate) conditions: Vec<(Connector, Predicate)>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn conditions(&self) -> &[(Connector, Predicate)] {
        &self.conditions
    }

    /// Append a predicate
    pub fn push(&mut self, connector: Connector, predicate: Predicate) {
        self.conditions.push((connector, predicate));
    }

    /// Append every predicate of `other`, grouped when it has more than one
    pub fn and_group(&mut self, mut other: WhereClause) {
        if other.conditions.len() > 1 {
            self.push(Connector::And, Predicate::Group(other));
        } else if let Some((_, predicate)) = other.conditions.pop() {
            self.push(Connector::And, predicate);
        }
    }
}

/// Join types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
            JoinType::Cross => write!(f, "CROSS JOIN"),
        }
    }
}

/// Join clause: kind, table and an ON predicate tree that may bind values
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub conditions: WhereClause,
}

impl JoinClause {
    pub fn new(join_type: JoinType, table: &str) -> Self {
        Self {
            join_type,
            table: table.to_string(),
            conditions: WhereClause::new(),
        }
    }

    /// `AND first <op> second`
    pub fn on(mut self, first: &str, operator: &str, second: &str) -> Self {
        self.push_column(Connector::And, first, operator, second);
        self
    }

    /// `OR first <op> second`
    pub fn or_on(mut self, first: &str, operator: &str, second: &str) -> Self {
        self.push_column(Connector::Or, first, operator, second);
        self
    }

    fn push_column(&mut self, connector: Connector, first: &str, operator: &str, second: &str) {
        let predicate = match operator.parse::<QueryOperator>() {
            Ok(operator) => Predicate::Column {
                first: first.to_string(),
                operator,
                second: second.to_string(),
            },
            Err(err) => Predicate::Invalid(err),
        };
        self.conditions.push(connector, predicate);
    }
}

/// Order by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// ORDER BY entry
#[derive(Debug, Clone)]
pub enum OrderClause {
    Column {
        column: String,
        direction: OrderDirection,
    },
    Raw {
        sql: String,
        bindings: Vec<DatabaseValue>,
    },
}

/// Aggregate functions usable in select lists and relation aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Lower-case name used in default aliases
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name().to_uppercase())
    }
}

impl std::str::FromStr for AggregateFunction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "count" => Ok(AggregateFunction::Count),
            "sum" => Ok(AggregateFunction::Sum),
            "avg" => Ok(AggregateFunction::Avg),
            "min" => Ok(AggregateFunction::Min),
            "max" => Ok(AggregateFunction::Max),
            other => Err(ModelError::Configuration(format!(
                "Unsupported aggregate function '{}'",
                other
            ))),
        }
    }
}

/// Entry of the select list
#[derive(Debug, Clone)]
pub enum SelectItem {
    /// Plain column, optionally `column AS alias`
    Column(String),
    /// `FUNC(column) [AS alias]`
    Aggregate {
        function: AggregateFunction,
        column: String,
        alias: Option<String>,
    },
    /// `(SELECT ...) AS alias`
    Subquery {
        query: Box<QueryBuilder>,
        alias: String,
    },
    /// Raw expression with `?` markers
    Raw {
        sql: String,
        bindings: Vec<DatabaseValue>,
    },
}

/// Query types supported by the builder
#[derive(Debug, Clone, PartialEq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
}

/// Set clause for UPDATE statements
#[derive(Debug, Clone)]
pub struct SetClause {
    pub column: String,
    pub value: DatabaseValue,
}

/// UNION entry
#[derive(Debug, Clone)]
pub struct UnionClause {
    pub query: Box<QueryBuilder>,
    pub all: bool,
}

/// Common table expression
#[derive(Debug, Clone)]
pub struct CommonTableExpression {
    pub name: String,
    pub query: Box<QueryBuilder>,
    pub recursive: bool,
}

/// Row locking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    ForUpdate,
    ForShare,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::ForUpdate => write!(f, "FOR UPDATE"),
            LockMode::ForShare => write!(f, "FOR SHARE"),
        }
    }
}

/// Soft-delete visibility of a model query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoftDeleteScope {
    /// Exclude soft-deleted rows
    #[default]
    Default,
    /// Include soft-deleted rows
    WithTrashed,
    /// Only soft-deleted rows
    OnlyTrashed,
}

/// ON CONFLICT specification of an upsert
#[derive(Debug, Clone, Default)]
pub struct UpsertClause {
    pub conflict_columns: Vec<String>,
    pub update_columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing() {
        assert_eq!("<>".parse::<QueryOperator>().unwrap(), QueryOperator::NotEqual);
        assert_eq!("like".parse::<QueryOperator>().unwrap(), QueryOperator::Like);
        assert!(matches!(
            "===".parse::<QueryOperator>(),
            Err(ModelError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_aggregate_function_parsing() {
        assert_eq!("COUNT".parse::<AggregateFunction>().unwrap(), AggregateFunction::Count);
        assert_eq!(AggregateFunction::Avg.to_string(), "AVG");
        assert!(matches!(
            "median".parse::<AggregateFunction>(),
            Err(ModelError::Configuration(_))
        ));
    }

    #[test]
    fn test_and_group_flattens_single_predicates() {
        let mut clause = WhereClause::new();
        let mut single = WhereClause::new();
        single.push(Connector::Or, Predicate::Null { column: "a".into(), negated: false });
        clause.and_group(single);
        assert!(matches!(clause.conditions()[0], (Connector::And, Predicate::Null { .. })));

        let mut double = WhereClause::new();
        double.push(Connector::And, Predicate::Null { column: "a".into(), negated: false });
        double.push(Connector::Or, Predicate::Null { column: "b".into(), negated: true });
        clause.and_group(double);
        assert!(matches!(clause.conditions()[1], (Connector::And, Predicate::Group(_))));
    }
}
