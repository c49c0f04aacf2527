//! Query Builder UPSERT operations

use super::builder::QueryBuilder;
use super::types::*;

/// Builder for UPSERT operations (INSERT ... ON CONFLICT DO UPDATE)
#[derive(Debug, Clone)]
pub struct UpsertBuilder {
    pub(crate) query_builder: QueryBuilder,
    pub(crate) conflict_columns: Vec<String>,
    pub(crate) update_columns: Vec<String>,
}

impl UpsertBuilder {
    /// Column overwritten from the proposed row on conflict
    pub fn update_set(mut self, column: &str) -> Self {
        self.update_columns.push(column.to_string());
        self
    }

    /// Columns overwritten from the proposed row on conflict
    pub fn update_columns(mut self, columns: &[&str]) -> Self {
        self.update_columns
            .extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Finish building the upsert query.
    ///
    /// Without explicit update columns every inserted column that is not a
    /// conflict column is overwritten; with nothing left to update the
    /// statement becomes `DO NOTHING`.
    pub fn build(self) -> QueryBuilder {
        let mut query = self.query_builder;
        let update_columns = if self.update_columns.is_empty() {
            query
                .insert_columns
                .iter()
                .filter(|c| !self.conflict_columns.contains(c))
                .cloned()
                .collect()
        } else {
            self.update_columns
        };

        query.upsert = Some(UpsertClause {
            conflict_columns: self.conflict_columns,
            update_columns,
        });
        query
    }
}
