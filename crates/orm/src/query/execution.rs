//! Query Builder execution against a [`Connection`]
//!
//! Row-returning methods hydrate into [`Entity`] values and therefore need a
//! target model; that requirement is checked before any statement is sent.

use std::sync::Arc;

use tracing::debug;

use super::builder::QueryBuilder;
use super::pagination::page_offset;
use super::types::*;
use super::where_clause::PredicateBuilder;
use crate::backends::{Connection, DatabaseValue, ExecuteResult, Row};
use crate::error::{ModelError, ModelResult};
use crate::model::{Entity, ModelHydrator, ModelSchema};
use crate::relationships::{EagerLoadResolver, ModelRegistry};

const AGGREGATE_ALIAS: &str = "aggregate";

/// One page of results
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Entity>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub last_page: i64,
}

impl Page {
    pub fn has_more(&self) -> bool {
        self.page < self.last_page
    }
}

impl QueryBuilder {
    /// Execute and return raw rows, no hydration
    pub fn get_rows(&self, conn: &mut dyn Connection) -> ModelResult<Vec<Row>> {
        let compiled = self.compile(&conn.grammar())?;
        conn.fetch_all(&compiled.sql, &compiled.bindings)
    }

    /// Execute and hydrate, resolving eager loads with a fresh registry
    pub fn get(self, conn: &mut dyn Connection) -> ModelResult<Vec<Entity>> {
        self.get_using(conn, &ModelRegistry::new())
    }

    /// Execute and hydrate, resolving eager loads through `registry`
    pub fn get_using(
        self,
        conn: &mut dyn Connection,
        registry: &ModelRegistry,
    ) -> ModelResult<Vec<Entity>> {
        let schema = self.require_model("hydrate results")?;
        let rows = self.get_rows(conn)?;
        let mut entities = ModelHydrator::new(schema).hydrate_all(&rows)?;

        if !self.eager_loads.is_empty() {
            let mut resolver = EagerLoadResolver::new(registry);
            if let Some(strategy) = self.eager_strategy {
                resolver = resolver.with_strategy(strategy);
            }
            resolver.load_all(conn, &mut entities, &self.eager_loads)?;
        }

        Ok(entities)
    }

    /// First matching entity
    pub fn first(self, conn: &mut dyn Connection) -> ModelResult<Option<Entity>> {
        Ok(self.limit(1).get(conn)?.into_iter().next())
    }

    /// First matching entity or [`ModelError::NotFound`]
    pub fn first_or_fail(self, conn: &mut dyn Connection) -> ModelResult<Entity> {
        let table = self.base_table().to_string();
        self.first(conn)?.ok_or(ModelError::NotFound(table))
    }

    /// Find by primary key
    pub fn find<V: Into<DatabaseValue>>(
        self,
        conn: &mut dyn Connection,
        id: V,
    ) -> ModelResult<Option<Entity>> {
        let schema = self.require_model("find by key")?;
        let key = format!("{}.{}", self.table_reference(), schema.primary_key);
        self.where_eq(&key, id).first(conn)
    }

    pub fn find_or_fail<V: Into<DatabaseValue>>(
        self,
        conn: &mut dyn Connection,
        id: V,
    ) -> ModelResult<Entity> {
        let id = id.into();
        let table = self.base_table().to_string();
        self.find(conn, id.clone())?
            .ok_or_else(|| ModelError::NotFound(format!("{}({:?})", table, id)))
    }

    /// Number of matching rows.
    ///
    /// DISTINCT, GROUP BY and UNION queries are counted by fetching their
    /// rows, since a bare `COUNT(*)` would count something else.
    pub fn count(&self, conn: &mut dyn Connection) -> ModelResult<i64> {
        if self.distinct || !self.group_by.is_empty() || !self.unions.is_empty() {
            let mut query = self.clone();
            query.aggregates.clear();
            return Ok(query.get_rows(conn)?.len() as i64);
        }

        let value = self.aggregate(conn, AggregateFunction::Count, "*")?;
        Ok(value.as_i64().unwrap_or(0))
    }

    /// Whether any row matches
    pub fn exists(&self, conn: &mut dyn Connection) -> ModelResult<bool> {
        let mut query = self.stripped();
        query.columns = vec![SelectItem::Raw {
            sql: "1".to_string(),
            bindings: Vec::new(),
        }];
        query.limit_count = Some(1);
        query.offset_value = None;
        Ok(!query.get_rows(conn)?.is_empty())
    }

    /// Values of one column
    pub fn pluck(&self, conn: &mut dyn Connection, column: &str) -> ModelResult<Vec<DatabaseValue>> {
        let mut query = self.clone();
        query.aggregates.clear();
        query.eager_loads.clear();
        let rows = query.select(&[column]).get_rows(conn)?;
        Ok(rows
            .into_iter()
            .map(|row| row.get_by_index(0).cloned().unwrap_or(DatabaseValue::Null))
            .collect())
    }

    /// Single aggregate over the matching rows; NULL when nothing matched
    pub fn aggregate(
        &self,
        conn: &mut dyn Connection,
        function: AggregateFunction,
        column: &str,
    ) -> ModelResult<DatabaseValue> {
        let mut query = self.stripped();
        query.limit_count = None;
        query.offset_value = None;
        query.columns = vec![SelectItem::Aggregate {
            function,
            column: column.to_string(),
            alias: Some(AGGREGATE_ALIAS.to_string()),
        }];

        let row = {
            let compiled = query.compile(&conn.grammar())?;
            conn.fetch_one(&compiled.sql, &compiled.bindings)?
        };
        Ok(row
            .and_then(|row| row.get(AGGREGATE_ALIAS).cloned())
            .unwrap_or(DatabaseValue::Null))
    }

    pub fn sum(&self, conn: &mut dyn Connection, column: &str) -> ModelResult<DatabaseValue> {
        self.aggregate(conn, AggregateFunction::Sum, column)
    }

    pub fn avg(&self, conn: &mut dyn Connection, column: &str) -> ModelResult<DatabaseValue> {
        self.aggregate(conn, AggregateFunction::Avg, column)
    }

    pub fn min(&self, conn: &mut dyn Connection, column: &str) -> ModelResult<DatabaseValue> {
        self.aggregate(conn, AggregateFunction::Min, column)
    }

    pub fn max(&self, conn: &mut dyn Connection, column: &str) -> ModelResult<DatabaseValue> {
        self.aggregate(conn, AggregateFunction::Max, column)
    }

    /// Walk the results `size` rows at a time until the callback returns
    /// `false` or a short chunk comes back.
    ///
    /// Queries without an ORDER BY are ordered by primary key so chunks
    /// don't overlap.
    pub fn chunk<F>(self, conn: &mut dyn Connection, size: i64, mut callback: F) -> ModelResult<()>
    where
        F: FnMut(Vec<Entity>) -> ModelResult<bool>,
    {
        if size < 1 {
            return Err(ModelError::InvalidArgument(format!(
                "Chunk size must be at least 1, got {}",
                size
            )));
        }

        let schema = self.require_model("chunk results")?;
        let mut base = self;
        if base.orders.is_empty() {
            let key = format!("{}.{}", base.table_reference(), schema.primary_key);
            base = base.order_by(&key);
        }

        let mut page = 1;
        loop {
            let chunk = base.clone().for_page(page, size).get(conn)?;
            let len = chunk.len() as i64;
            debug!(page, rows = len, "Fetched chunk");
            if len == 0 || !callback(chunk)? || len < size {
                break;
            }
            page += 1;
        }

        Ok(())
    }

    /// Fetch one page plus the total row count
    pub fn paginate(self, conn: &mut dyn Connection, page: i64, per_page: i64) -> ModelResult<Page> {
        if per_page < 1 {
            return Err(ModelError::InvalidArgument(format!(
                "Page size must be at least 1, got {}",
                per_page
            )));
        }
        self.require_model("paginate results")?;

        let page = page.max(1);
        if page_offset(page, per_page).is_none() {
            return Err(ModelError::InvalidArgument(format!(
                "Page {} of size {} is out of range",
                page, per_page
            )));
        }
        let mut counter = self.clone();
        counter.limit_count = None;
        counter.offset_value = None;
        let total = counter.count(conn)?;
        let items = self.for_page(page, per_page).get(conn)?;

        Ok(Page {
            items,
            total,
            page,
            per_page,
            last_page: (total / per_page + i64::from(total % per_page != 0)).max(1),
        })
    }

    /// Run an INSERT, UPDATE or DELETE
    pub fn execute(&self, conn: &mut dyn Connection) -> ModelResult<ExecuteResult> {
        if self.query_type == QueryType::Select {
            return Err(ModelError::InvalidArgument(
                "execute() runs mutations; use get() or get_rows() for SELECT".to_string(),
            ));
        }
        let compiled = self.compile(&conn.grammar())?;
        conn.execute(&compiled.sql, &compiled.bindings)
    }

    fn require_model(&self, operation: &str) -> ModelResult<Arc<ModelSchema>> {
        self.model.clone().ok_or_else(|| {
            ModelError::Configuration(format!(
                "Cannot {} for table '{}' without a target model",
                operation, self.table
            ))
        })
    }

    /// Copy without ordering, relation aggregates or eager loads
    fn stripped(&self) -> QueryBuilder {
        let mut query = self.clone();
        query.orders.clear();
        query.aggregates.clear();
        query.eager_loads.clear();
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SqliteConnection;

    fn items() -> Arc<ModelSchema> {
        Arc::new(ModelSchema::for_table("items"))
    }

    fn setup() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, kind TEXT, price INTEGER);
             INSERT INTO items (id, kind, price) VALUES
                (1, 'a', 10), (2, 'a', 20), (3, 'b', 30), (4, 'b', 40), (5, 'c', 50);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_paginate_rejects_overflowing_page() {
        let mut conn = setup();
        let result = QueryBuilder::for_model(items()).paginate(&mut conn, i64::MAX, 10);
        assert!(matches!(result, Err(ModelError::InvalidArgument(_))));

        let page = QueryBuilder::for_model(items()).paginate(&mut conn, 1, i64::MAX).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.last_page, 1);
        assert_eq!(page.items.len(), 5);
    }

    #[test]
    fn test_get_without_model_fails_before_io() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        // The table does not exist; a Configuration error proves nothing ran.
        let result = QueryBuilder::table("missing").get(&mut conn);
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_find_and_find_or_fail() {
        let mut conn = setup();
        let item = QueryBuilder::for_model(items()).find(&mut conn, 3).unwrap().unwrap();
        assert_eq!(item.get("kind"), Some("b".into()));

        let missing = QueryBuilder::for_model(items()).find_or_fail(&mut conn, 99);
        assert!(matches!(missing, Err(ModelError::NotFound(_))));
    }

    #[test]
    fn test_count_and_aggregates() {
        let mut conn = setup();
        let query = QueryBuilder::for_model(items()).where_gt("price", 15);
        assert_eq!(query.count(&mut conn).unwrap(), 4);
        assert_eq!(query.sum(&mut conn, "price").unwrap().as_i64(), Some(140));
        assert_eq!(query.max(&mut conn, "price").unwrap().as_i64(), Some(50));

        let grouped = QueryBuilder::for_model(items()).select(&["kind"]).group_by(&["kind"]);
        assert_eq!(grouped.count(&mut conn).unwrap(), 3);
    }

    #[test]
    fn test_exists_and_pluck() {
        let mut conn = setup();
        assert!(QueryBuilder::for_model(items()).where_eq("kind", "c").exists(&mut conn).unwrap());
        assert!(!QueryBuilder::for_model(items()).where_eq("kind", "z").exists(&mut conn).unwrap());

        let prices = QueryBuilder::for_model(items())
            .where_eq("kind", "a")
            .order_by("id")
            .pluck(&mut conn, "price")
            .unwrap();
        assert_eq!(prices, vec![DatabaseValue::Int64(10), DatabaseValue::Int64(20)]);
    }

    #[test]
    fn test_chunk_visits_every_row_once() {
        let mut conn = setup();
        let mut seen = Vec::new();
        QueryBuilder::for_model(items())
            .chunk(&mut conn, 2, |chunk| {
                seen.extend(chunk.iter().filter_map(|e| e.key().and_then(DatabaseValue::as_i64)));
                Ok(true)
            })
            .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);

        let mut calls = 0;
        QueryBuilder::for_model(items())
            .chunk(&mut conn, 2, |_| {
                calls += 1;
                Ok(false)
            })
            .unwrap();
        assert_eq!(calls, 1);

        let invalid = QueryBuilder::for_model(items()).chunk(&mut conn, 0, |_| Ok(true));
        assert!(matches!(invalid, Err(ModelError::InvalidArgument(_))));
    }

    #[test]
    fn test_paginate() {
        let mut conn = setup();
        let page = QueryBuilder::for_model(items())
            .order_by("id")
            .paginate(&mut conn, 2, 2)
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.last_page, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].key().and_then(DatabaseValue::as_i64), Some(3));
        assert!(page.has_more());
    }

    #[test]
    fn test_execute_rejects_select() {
        let mut conn = setup();
        assert!(matches!(
            QueryBuilder::table("items").execute(&mut conn),
            Err(ModelError::InvalidArgument(_))
        ));

        let result = QueryBuilder::table("items")
            .where_eq("kind", "a")
            .update([("price", 0)])
            .execute(&mut conn)
            .unwrap();
        assert_eq!(result.rows_affected, 2);
    }
}
