//! Query Builder - Core builder implementation
//!
//! `QueryBuilder` is plain query state. Every configuration method takes the
//! builder by value and returns it, so cloning yields an independent copy
//! that can be reused safely (paginated sub-queries, counts, chunks).

use std::sync::Arc;

use super::types::*;
use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};
use crate::model::ModelSchema;
use crate::relationships::aggregates::RelationAggregate;
use crate::relationships::eager_loading::{EagerLoadSpec, EagerLoadStrategy};
use crate::sql::{CompiledQuery, Grammar, QueryCompiler};

/// Query builder for constructing database queries
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) query_type: QueryType,
    pub(crate) table: String,
    pub(crate) columns: Vec<SelectItem>,
    pub(crate) distinct: bool,
    pub(crate) wheres: WhereClause,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) group_by: Vec<String>,
    pub(crate) havings: WhereClause,
    pub(crate) orders: Vec<OrderClause>,
    pub(crate) limit_count: Option<i64>,
    pub(crate) offset_value: Option<i64>,
    pub(crate) unions: Vec<UnionClause>,
    pub(crate) ctes: Vec<CommonTableExpression>,
    pub(crate) lock: Option<LockMode>,
    pub(crate) set_clauses: Vec<SetClause>,
    pub(crate) insert_columns: Vec<String>,
    pub(crate) insert_rows: Vec<Vec<DatabaseValue>>,
    pub(crate) upsert: Option<UpsertClause>,
    pub(crate) returning: Vec<String>,
    pub(crate) model: Option<Arc<ModelSchema>>,
    pub(crate) soft_delete_scope: SoftDeleteScope,
    pub(crate) aggregates: Vec<RelationAggregate>,
    pub(crate) eager_loads: Vec<EagerLoadSpec>,
    pub(crate) eager_strategy: Option<EagerLoadStrategy>,
    pub(crate) deferred_error: Option<ModelError>,
}

/// Query alias used throughout the crate
pub type Query = QueryBuilder;

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Create a new query builder with no table
    pub fn new() -> Self {
        Self {
            query_type: QueryType::Select,
            table: String::new(),
            columns: Vec::new(),
            distinct: false,
            wheres: WhereClause::new(),
            joins: Vec::new(),
            group_by: Vec::new(),
            havings: WhereClause::new(),
            orders: Vec::new(),
            limit_count: None,
            offset_value: None,
            unions: Vec::new(),
            ctes: Vec::new(),
            lock: None,
            set_clauses: Vec::new(),
            insert_columns: Vec::new(),
            insert_rows: Vec::new(),
            upsert: None,
            returning: Vec::new(),
            model: None,
            soft_delete_scope: SoftDeleteScope::Default,
            aggregates: Vec::new(),
            eager_loads: Vec::new(),
            eager_strategy: None,
            deferred_error: None,
        }
    }

    /// Create a query against a table (`"users"` or `"users AS u"`)
    pub fn table(table: &str) -> Self {
        Self::new().from(table)
    }

    /// Create a query targeting a model; results hydrate into entities of it
    pub fn for_model(schema: Arc<ModelSchema>) -> Self {
        let mut query = Self::table(&schema.table);
        query.model = Some(schema);
        query
    }

    /// Set the FROM table
    pub fn from(mut self, table: &str) -> Self {
        self.table = table.trim().to_string();
        self
    }

    /// Attach a target model to an existing query
    pub fn with_model(mut self, schema: Arc<ModelSchema>) -> Self {
        self.model = Some(schema);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Table name without any `AS alias` suffix
    pub fn base_table(&self) -> &str {
        split_alias(&self.table).0
    }

    /// Alias if one was given, otherwise the table name
    pub fn table_reference(&self) -> &str {
        let (table, alias) = split_alias(&self.table);
        alias.unwrap_or(table)
    }

    pub fn model(&self) -> Option<&Arc<ModelSchema>> {
        self.model.as_ref()
    }

    pub fn query_type(&self) -> &QueryType {
        &self.query_type
    }

    pub fn get_limit(&self) -> Option<i64> {
        self.limit_count
    }

    pub fn get_offset(&self) -> Option<i64> {
        self.offset_value
    }

    pub fn wheres(&self) -> &WhereClause {
        &self.wheres
    }

    /// Compile with the default grammar
    pub fn to_sql(&self) -> ModelResult<String> {
        Ok(self.compile(&Grammar::default())?.sql)
    }

    /// Compile into SQL plus linearized bindings
    pub fn compile(&self, grammar: &Grammar) -> ModelResult<CompiledQuery> {
        QueryCompiler::new(*grammar).compile(self)
    }

    /// Record an error raised while building; reported on compile
    pub(crate) fn defer_error(&mut self, error: ModelError) {
        if self.deferred_error.is_none() {
            self.deferred_error = Some(error);
        }
    }
}

/// Split `name AS alias` (case-insensitive) into its parts
pub(crate) fn split_alias(reference: &str) -> (&str, Option<&str>) {
    match reference.to_ascii_lowercase().find(" as ") {
        Some(pos) => (reference[..pos].trim(), Some(reference[pos + 4..].trim())),
        None => (reference.trim(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_reference_honours_alias() {
        let query = QueryBuilder::table("users AS u");
        assert_eq!(query.base_table(), "users");
        assert_eq!(query.table_reference(), "u");

        let query = QueryBuilder::table("posts");
        assert_eq!(query.table_reference(), "posts");
    }

    #[test]
    fn test_clone_is_independent() {
        let base = QueryBuilder::table("users").limit(5);
        let page = base.clone().offset(10);
        assert_eq!(base.get_offset(), None);
        assert_eq!(page.get_offset(), Some(10));
        assert_eq!(page.get_limit(), Some(5));
    }
}
