//! Constraint implementations for relationship queries

use super::types::{ConstraintType, RelationshipConstraint};
use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};
use crate::query::{OrderDirection, PredicateBuilder, QueryBuilder, QueryOperator};

fn require_column(column: &str, kind: &str) -> ModelResult<()> {
    if column.trim().is_empty() {
        return Err(ModelError::InvalidArgument(format!(
            "{} constraint column cannot be empty",
            kind
        )));
    }
    Ok(())
}

/// WHERE constraint implementation
#[derive(Debug, Clone)]
pub(crate) struct WhereConstraint {
    pub column: String,
    pub operator: QueryOperator,
    pub value: DatabaseValue,
}

impl RelationshipConstraint for WhereConstraint {
    fn apply(&self, query: QueryBuilder) -> ModelResult<QueryBuilder> {
        let query = match self.operator {
            QueryOperator::Like | QueryOperator::NotLike => {
                let pattern = self.value.as_str().ok_or_else(|| {
                    ModelError::InvalidArgument(format!(
                        "{} requires a string pattern, got {}",
                        self.operator,
                        self.value.type_name()
                    ))
                })?;
                if self.operator == QueryOperator::Like {
                    query.where_like(&self.column, pattern)
                } else {
                    query.where_not_like(&self.column, pattern)
                }
            }
            operator => query.where_op(&self.column, &operator.to_string(), self.value.clone()),
        };
        Ok(query)
    }

    fn constraint_type(&self) -> ConstraintType {
        ConstraintType::Where
    }

    fn description(&self) -> String {
        format!("WHERE {} {} {:?}", self.column, self.operator, self.value)
    }

    fn validate(&self) -> ModelResult<()> {
        require_column(&self.column, "WHERE")
    }
}

/// WHERE IN constraint implementation
#[derive(Debug, Clone)]
pub(crate) struct WhereInConstraint {
    pub column: String,
    pub values: Vec<DatabaseValue>,
    pub negated: bool,
}

impl RelationshipConstraint for WhereInConstraint {
    fn apply(&self, query: QueryBuilder) -> ModelResult<QueryBuilder> {
        let values = self.values.clone();
        Ok(if self.negated {
            query.where_not_in(&self.column, values)
        } else {
            query.where_in(&self.column, values)
        })
    }

    fn constraint_type(&self) -> ConstraintType {
        ConstraintType::Where
    }

    fn description(&self) -> String {
        let keyword = if self.negated { "NOT IN" } else { "IN" };
        format!("WHERE {} {} ({} values)", self.column, keyword, self.values.len())
    }

    fn validate(&self) -> ModelResult<()> {
        require_column(&self.column, "WHERE IN")
    }
}

/// WHERE NULL / NOT NULL constraint implementation
#[derive(Debug, Clone)]
pub(crate) struct WhereNullConstraint {
    pub column: String,
    pub negated: bool,
}

impl RelationshipConstraint for WhereNullConstraint {
    fn apply(&self, query: QueryBuilder) -> ModelResult<QueryBuilder> {
        Ok(if self.negated {
            query.where_not_null(&self.column)
        } else {
            query.where_null(&self.column)
        })
    }

    fn constraint_type(&self) -> ConstraintType {
        ConstraintType::Where
    }

    fn description(&self) -> String {
        let keyword = if self.negated { "IS NOT NULL" } else { "IS NULL" };
        format!("WHERE {} {}", self.column, keyword)
    }

    fn validate(&self) -> ModelResult<()> {
        require_column(&self.column, "WHERE NULL")
    }
}

/// ORDER BY constraint implementation
#[derive(Debug, Clone)]
pub(crate) struct OrderConstraint {
    pub column: String,
    pub direction: OrderDirection,
}

impl RelationshipConstraint for OrderConstraint {
    fn apply(&self, query: QueryBuilder) -> ModelResult<QueryBuilder> {
        Ok(query.order_by_direction(&self.column, self.direction))
    }

    fn constraint_type(&self) -> ConstraintType {
        ConstraintType::Order
    }

    fn description(&self) -> String {
        format!("ORDER BY {} {:?}", self.column, self.direction)
    }

    fn validate(&self) -> ModelResult<()> {
        require_column(&self.column, "ORDER BY")
    }
}

/// LIMIT constraint implementation
#[derive(Debug, Clone)]
pub(crate) struct LimitConstraint {
    pub count: i64,
}

impl RelationshipConstraint for LimitConstraint {
    fn apply(&self, query: QueryBuilder) -> ModelResult<QueryBuilder> {
        Ok(query.limit(self.count))
    }

    fn constraint_type(&self) -> ConstraintType {
        ConstraintType::Limit
    }

    fn description(&self) -> String {
        format!("LIMIT {}", self.count)
    }

    fn validate(&self) -> ModelResult<()> {
        if self.count < 0 {
            return Err(ModelError::InvalidArgument(
                "LIMIT constraint must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// OFFSET constraint implementation
#[derive(Debug, Clone)]
pub(crate) struct OffsetConstraint {
    pub count: i64,
}

impl RelationshipConstraint for OffsetConstraint {
    fn apply(&self, query: QueryBuilder) -> ModelResult<QueryBuilder> {
        Ok(query.offset(self.count))
    }

    fn constraint_type(&self) -> ConstraintType {
        ConstraintType::Offset
    }

    fn description(&self) -> String {
        format!("OFFSET {}", self.count)
    }

    fn validate(&self) -> ModelResult<()> {
        if self.count < 0 {
            return Err(ModelError::InvalidArgument(
                "OFFSET constraint must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Raw WHERE fragment
#[derive(Debug, Clone)]
pub(crate) struct RawConstraint {
    pub sql: String,
    pub bindings: Vec<DatabaseValue>,
}

impl RelationshipConstraint for RawConstraint {
    fn apply(&self, query: QueryBuilder) -> ModelResult<QueryBuilder> {
        Ok(query.where_raw(&self.sql, self.bindings.clone()))
    }

    fn constraint_type(&self) -> ConstraintType {
        ConstraintType::Raw
    }

    fn description(&self) -> String {
        format!("RAW {}", self.sql)
    }

    fn validate(&self) -> ModelResult<()> {
        if self.sql.trim().is_empty() {
            return Err(ModelError::InvalidArgument(
                "Raw constraint cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
