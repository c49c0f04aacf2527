//! Query Builder DML operations (INSERT, UPDATE, DELETE)

use super::builder::QueryBuilder;
use super::types::*;
use super::upsert::UpsertBuilder;
use crate::backends::DatabaseValue;
use crate::error::ModelError;

impl QueryBuilder {
    /// Turn the query into a single-row INSERT
    pub fn insert<I, K, V>(self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        self.insert_many(std::iter::once(row))
    }

    /// Turn the query into a multi-row INSERT.
    ///
    /// Every row must name the same columns in the same order as the first.
    pub fn insert_many<R, I, K, V>(mut self, rows: R) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        self.query_type = QueryType::Insert;
        for row in rows {
            let (columns, values): (Vec<String>, Vec<DatabaseValue>) = row
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .unzip();

            if self.insert_rows.is_empty() && self.insert_columns.is_empty() {
                self.insert_columns = columns;
            } else if self.insert_columns != columns {
                self.defer_error(ModelError::InvalidArgument(format!(
                    "Insert row columns {:?} do not match {:?}",
                    columns, self.insert_columns
                )));
            }
            self.insert_rows.push(values);
        }
        self
    }

    /// Turn the query into an UPDATE of the given columns
    pub fn update<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        for (column, value) in values {
            let column: String = column.into();
            self = self.set(&column, value);
        }
        self
    }

    /// Set a column value (UPDATE)
    pub fn set<V: Into<DatabaseValue>>(mut self, column: &str, value: V) -> Self {
        self.query_type = QueryType::Update;
        self.set_clauses.push(SetClause {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    /// Set a column to NULL (UPDATE)
    pub fn set_null(self, column: &str) -> Self {
        self.set(column, DatabaseValue::Null)
    }

    /// Turn the query into a DELETE
    pub fn delete(mut self) -> Self {
        self.query_type = QueryType::Delete;
        self
    }

    /// Columns returned by an INSERT, UPDATE or DELETE
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.returning = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Upsert operation (INSERT ... ON CONFLICT DO UPDATE)
    pub fn upsert<R, I, K, V>(self, rows: R, conflict_columns: &[&str]) -> UpsertBuilder
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        let mut query = self.insert_many(rows);
        query.query_type = QueryType::Upsert;

        UpsertBuilder {
            query_builder: query,
            conflict_columns: conflict_columns.iter().map(|c| c.to_string()).collect(),
            update_columns: Vec::new(),
        }
    }
}
