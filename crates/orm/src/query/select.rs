//! Query Builder SELECT operations

use super::builder::QueryBuilder;
use super::types::*;
use crate::backends::DatabaseValue;

impl QueryBuilder {
    /// Replace the select list with plain columns (`"name"`, `"users.*"`, `"email AS e"`)
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns
            .iter()
            .map(|c| SelectItem::Column(c.trim().to_string()))
            .collect();
        self
    }

    /// Append a column to the select list
    pub fn add_select(mut self, column: &str) -> Self {
        self.columns.push(SelectItem::Column(column.trim().to_string()));
        self
    }

    /// Add SELECT DISTINCT to the query
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Append a raw select expression; each `?` consumes the next binding
    pub fn select_raw(mut self, sql: &str, bindings: Vec<DatabaseValue>) -> Self {
        self.columns.push(SelectItem::Raw {
            sql: sql.to_string(),
            bindings,
        });
        self
    }

    /// Append `(subquery) AS alias`
    pub fn select_subquery(mut self, query: QueryBuilder, alias: &str) -> Self {
        self.columns.push(SelectItem::Subquery {
            query: Box::new(query),
            alias: alias.to_string(),
        });
        self
    }

    /// Append `FUNC(column) [AS alias]`; `"*"` counts rows
    pub fn select_aggregate(
        mut self,
        function: AggregateFunction,
        column: &str,
        alias: Option<&str>,
    ) -> Self {
        self.columns.push(SelectItem::Aggregate {
            function,
            column: column.to_string(),
            alias: alias.map(str::to_string),
        });
        self
    }

    pub fn select_count(self, column: &str, alias: Option<&str>) -> Self {
        self.select_aggregate(AggregateFunction::Count, column, alias)
    }

    pub fn select_sum(self, column: &str, alias: Option<&str>) -> Self {
        self.select_aggregate(AggregateFunction::Sum, column, alias)
    }

    pub fn select_avg(self, column: &str, alias: Option<&str>) -> Self {
        self.select_aggregate(AggregateFunction::Avg, column, alias)
    }

    pub fn select_min(self, column: &str, alias: Option<&str>) -> Self {
        self.select_aggregate(AggregateFunction::Min, column, alias)
    }

    pub fn select_max(self, column: &str, alias: Option<&str>) -> Self {
        self.select_aggregate(AggregateFunction::Max, column, alias)
    }

    /// Current select list
    pub fn select_items(&self) -> &[SelectItem] {
        &self.columns
    }
}
