//! Query compiler
//!
//! Statements are rendered into a list of text parts and parameter slots.
//! Each slot remembers the bucket and in-bucket position of its value; the
//! final pass replaces slots with numbered placeholders whose number is the
//! value's index in the linearized binding list. Nested queries (subqueries,
//! unions, CTEs) are compiled independently and their values re-homed into
//! the bucket of the clause that embeds them.

use std::collections::HashSet;

use tracing::debug;

use super::bindings::{BindingAggregator, Bucket};
use super::grammar::Grammar;
use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};
use crate::query::builder::split_alias;
use crate::query::types::*;
use crate::query::QueryBuilder;
use crate::relationships::aggregates::AggregateSubqueryBuilder;

/// A compiled statement: SQL text plus bindings in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<DatabaseValue>,
}

#[derive(Debug, Clone)]
enum Part {
    Sql(String),
    Param(Bucket, usize),
}

/// Partially compiled statement
#[derive(Debug, Default)]
struct Fragment {
    parts: Vec<Part>,
    bindings: BindingAggregator,
}

impl Fragment {
    fn sql<S: Into<String>>(&mut self, sql: S) {
        self.parts.push(Part::Sql(sql.into()));
    }

    fn bind(&mut self, bucket: Bucket, value: DatabaseValue) -> ModelResult<()> {
        let index = self.bindings.push(bucket, value)?;
        self.parts.push(Part::Param(bucket, index));
        Ok(())
    }

    /// Append a separately compiled fragment, moving its values into `bucket`
    fn embed(&mut self, bucket: Bucket, inner: Fragment) -> ModelResult<()> {
        let base = self.bindings.bucket(bucket).len();
        let Fragment { parts, bindings } = inner;

        for part in parts {
            match part {
                Part::Sql(sql) => self.parts.push(Part::Sql(sql)),
                Part::Param(inner_bucket, index) => self
                    .parts
                    .push(Part::Param(bucket, base + bindings.position(inner_bucket, index))),
            }
        }
        for value in bindings.into_linearized() {
            self.bindings.push(bucket, value)?;
        }
        Ok(())
    }

    /// Raw SQL whose `?` markers consume `values` left to right
    fn raw(&mut self, bucket: Bucket, sql: &str, values: &[DatabaseValue]) -> ModelResult<()> {
        let pieces: Vec<&str> = sql.split('?').collect();
        if pieces.len() - 1 != values.len() {
            return Err(ModelError::InvalidArgument(format!(
                "Raw expression '{}' has {} placeholders but {} bindings",
                sql,
                pieces.len() - 1,
                values.len()
            )));
        }

        self.sql(pieces[0]);
        for (piece, value) in pieces[1..].iter().zip(values) {
            self.bind(bucket, value.clone())?;
            self.sql(*piece);
        }
        Ok(())
    }

    fn finish(self, grammar: &Grammar) -> CompiledQuery {
        let mut sql = String::new();
        for part in &self.parts {
            match part {
                Part::Sql(text) => sql.push_str(text),
                Part::Param(bucket, index) => {
                    sql.push_str(&grammar.placeholder(self.bindings.position(*bucket, *index)))
                }
            }
        }

        CompiledQuery {
            sql,
            bindings: self.bindings.into_linearized(),
        }
    }
}

/// Compiles [`QueryBuilder`] state into SQL for one grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryCompiler {
    grammar: Grammar,
}

impl QueryCompiler {
    pub fn new(grammar: Grammar) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Compile a statement. Bindings start empty on every call.
    pub fn compile(&self, query: &QueryBuilder) -> ModelResult<CompiledQuery> {
        let compiled = self.compile_fragment(query)?.finish(&self.grammar);
        debug!(
            sql = %compiled.sql,
            bindings = compiled.bindings.len(),
            "compiled query"
        );
        Ok(compiled)
    }

    fn compile_fragment(&self, query: &QueryBuilder) -> ModelResult<Fragment> {
        if let Some(err) = &query.deferred_error {
            return Err(err.clone());
        }

        let mut fragment = Fragment::default();
        match query.query_type {
            QueryType::Select => self.compile_select(query, &mut fragment)?,
            QueryType::Insert | QueryType::Upsert => self.compile_insert(query, &mut fragment)?,
            QueryType::Update => self.compile_update(query, &mut fragment)?,
            QueryType::Delete => self.compile_delete(query, &mut fragment)?,
        }
        Ok(fragment)
    }

    fn compile_select(&self, query: &QueryBuilder, f: &mut Fragment) -> ModelResult<()> {
        let g = &self.grammar;

        if !query.ctes.is_empty() {
            f.sql("WITH ");
            if query.ctes.iter().any(|cte| cte.recursive) {
                f.sql("RECURSIVE ");
            }
            for (i, cte) in query.ctes.iter().enumerate() {
                if i > 0 {
                    f.sql(", ");
                }
                f.sql(format!("{} AS (", g.wrap_alias(&cte.name)?));
                f.embed(Bucket::Cte, self.compile_fragment(&cte.query)?)?;
                f.sql(")");
            }
            f.sql(" ");
        }

        f.sql(if query.distinct { "SELECT DISTINCT " } else { "SELECT " });
        self.compile_columns(query, f)?;

        f.sql(format!(" FROM {}", g.wrap_table(&query.table)?));
        self.compile_joins(query, f)?;
        self.compile_wheres(query, f)?;

        if !query.group_by.is_empty() {
            f.sql(format!(" GROUP BY {}", g.columnize(&query.group_by)?));
        }

        if !query.havings.is_empty() {
            f.sql(" HAVING ");
            self.compile_predicates(Bucket::Having, &query.havings, f)?;
        }

        self.compile_orders(query, f)?;

        match (query.limit_count, query.offset_value) {
            (Some(limit), Some(offset)) => f.sql(format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => f.sql(format!(" LIMIT {}", limit)),
            (None, Some(offset)) => match g.dialect() {
                crate::backends::SqlDialect::SQLite => f.sql(format!(" LIMIT -1 OFFSET {}", offset)),
                crate::backends::SqlDialect::PostgreSQL => f.sql(format!(" OFFSET {}", offset)),
            },
            (None, None) => {}
        }

        for union in &query.unions {
            f.sql(if union.all { " UNION ALL " } else { " UNION " });
            f.embed(Bucket::Union, self.compile_fragment(&union.query)?)?;
        }

        if let Some(lock) = query.lock {
            if g.dialect().supports_locking() {
                f.sql(format!(" {}", lock));
            }
        }

        Ok(())
    }

    /// Select list with relation aggregates resolved into correlated subqueries
    fn select_items(&self, query: &QueryBuilder) -> ModelResult<Vec<SelectItem>> {
        let mut items = query.columns.clone();
        if query.aggregates.is_empty() {
            return Ok(items);
        }

        let schema = query.model.as_ref().ok_or_else(|| {
            ModelError::Configuration(
                "Relation aggregates require a query with a target model".to_string(),
            )
        })?;

        if items.is_empty() {
            items.push(SelectItem::Column(format!("{}.*", query.table_reference())));
        }

        for request in &query.aggregates {
            let descriptor = schema.relationship(&request.relation)?;
            let builder = AggregateSubqueryBuilder::new(descriptor, &request.relation);
            items.push(builder.aggregate_column(
                query.table_reference(),
                request.column.as_deref(),
                &request.function,
                request.alias.as_deref(),
                request.constraint.clone(),
            )?);
        }
        Ok(items)
    }

    fn compile_columns(&self, query: &QueryBuilder, f: &mut Fragment) -> ModelResult<()> {
        let g = &self.grammar;
        let items = self.select_items(query)?;
        if items.is_empty() {
            f.sql("*");
            return Ok(());
        }

        let mut aliases = HashSet::new();
        for (i, item) in items.iter().enumerate() {
            if let Some(alias) = item_alias(item) {
                if !aliases.insert(alias.to_string()) {
                    return Err(ModelError::Configuration(format!(
                        "Duplicate select alias '{}'",
                        alias
                    )));
                }
            }

            if i > 0 {
                f.sql(", ");
            }
            match item {
                SelectItem::Column(column) => f.sql(g.wrap(column)?),
                SelectItem::Aggregate {
                    function,
                    column,
                    alias,
                } => {
                    f.sql(format!("{}({})", function, g.wrap(column)?));
                    if let Some(alias) = alias {
                        f.sql(format!(" AS {}", g.wrap_alias(alias)?));
                    }
                }
                SelectItem::Subquery { query, alias } => {
                    f.sql("(");
                    f.embed(Bucket::SelectSubquery, self.compile_fragment(query)?)?;
                    f.sql(format!(") AS {}", g.wrap_alias(alias)?));
                }
                SelectItem::Raw { sql, bindings } => f.raw(Bucket::SelectSubquery, sql, bindings)?,
            }
        }
        Ok(())
    }

    fn compile_joins(&self, query: &QueryBuilder, f: &mut Fragment) -> ModelResult<()> {
        for join in &query.joins {
            f.sql(format!(" {} {}", join.join_type, self.grammar.wrap_table(&join.table)?));
            if join.join_type != JoinType::Cross && !join.conditions.is_empty() {
                f.sql(" ON ");
                self.compile_predicates(Bucket::Join, &join.conditions, f)?;
            }
        }
        Ok(())
    }

    /// WHERE clause including the soft-delete scope of the target model
    fn compile_wheres(&self, query: &QueryBuilder, f: &mut Fragment) -> ModelResult<()> {
        let wheres = match query.soft_delete_predicate() {
            Some(scope) => {
                let mut combined = WhereClause::new();
                combined.and_group(query.wheres.clone());
                combined.push(Connector::And, scope);
                combined
            }
            None => query.wheres.clone(),
        };

        if !wheres.is_empty() {
            f.sql(" WHERE ");
            self.compile_predicates(Bucket::Where, &wheres, f)?;
        }
        Ok(())
    }

    fn compile_orders(&self, query: &QueryBuilder, f: &mut Fragment) -> ModelResult<()> {
        if query.orders.is_empty() {
            return Ok(());
        }

        f.sql(" ORDER BY ");
        for (i, order) in query.orders.iter().enumerate() {
            if i > 0 {
                f.sql(", ");
            }
            match order {
                OrderClause::Column { column, direction } => {
                    f.sql(format!("{} {}", self.grammar.wrap(column)?, direction))
                }
                OrderClause::Raw { sql, bindings } => f.raw(Bucket::Order, sql, bindings)?,
            }
        }
        Ok(())
    }

    fn compile_predicates(
        &self,
        bucket: Bucket,
        clause: &WhereClause,
        f: &mut Fragment,
    ) -> ModelResult<()> {
        for (i, (connector, predicate)) in clause.conditions().iter().enumerate() {
            if i > 0 {
                f.sql(format!(" {} ", connector));
            }
            self.compile_predicate(bucket, predicate, f)?;
        }
        Ok(())
    }

    fn compile_predicate(
        &self,
        bucket: Bucket,
        predicate: &Predicate,
        f: &mut Fragment,
    ) -> ModelResult<()> {
        let g = &self.grammar;
        match predicate {
            Predicate::Basic {
                column,
                operator,
                value,
            } => match (operator, value.is_null()) {
                (QueryOperator::Equal, true) => f.sql(format!("{} IS NULL", g.wrap(column)?)),
                (QueryOperator::NotEqual, true) => {
                    f.sql(format!("{} IS NOT NULL", g.wrap(column)?))
                }
                _ => {
                    f.sql(format!("{} {} ", g.wrap(column)?, operator));
                    f.bind(bucket, value.clone())?;
                }
            },
            Predicate::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    f.sql(if *negated { "1 = 1" } else { "0 = 1" });
                } else {
                    let keyword = if *negated { "NOT IN" } else { "IN" };
                    f.sql(format!("{} {} (", g.wrap(column)?, keyword));
                    for (i, value) in values.iter().enumerate() {
                        if i > 0 {
                            f.sql(", ");
                        }
                        f.bind(bucket, value.clone())?;
                    }
                    f.sql(")");
                }
            }
            Predicate::InSubquery {
                column,
                query,
                negated,
            } => {
                let keyword = if *negated { "NOT IN" } else { "IN" };
                f.sql(format!("{} {} (", g.wrap(column)?, keyword));
                f.embed(bucket, self.compile_fragment(query)?)?;
                f.sql(")");
            }
            Predicate::Between {
                column,
                low,
                high,
                negated,
            } => {
                let keyword = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                f.sql(format!("{} {} ", g.wrap(column)?, keyword));
                f.bind(bucket, low.clone())?;
                f.sql(" AND ");
                f.bind(bucket, high.clone())?;
            }
            Predicate::Null { column, negated } => {
                let test = if *negated { "IS NOT NULL" } else { "IS NULL" };
                f.sql(format!("{} {}", g.wrap(column)?, test));
            }
            Predicate::Column {
                first,
                operator,
                second,
            } => f.sql(format!("{} {} {}", g.wrap(first)?, operator, g.wrap(second)?)),
            Predicate::Exists { query, negated } => {
                f.sql(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                f.embed(bucket, self.compile_fragment(query)?)?;
                f.sql(")");
            }
            Predicate::Group(group) => {
                if group.is_empty() {
                    f.sql("1 = 1");
                } else {
                    f.sql("(");
                    self.compile_predicates(bucket, group, f)?;
                    f.sql(")");
                }
            }
            Predicate::Raw { sql, bindings } => f.raw(bucket, sql, bindings)?,
            Predicate::Invalid(err) => return Err(err.clone()),
        }
        Ok(())
    }

    fn compile_insert(&self, query: &QueryBuilder, f: &mut Fragment) -> ModelResult<()> {
        let g = &self.grammar;
        if query.insert_rows.is_empty() || query.insert_columns.is_empty() {
            return Err(ModelError::InvalidArgument(
                "INSERT requires at least one row with at least one column".to_string(),
            ));
        }

        f.sql(format!(
            "INSERT INTO {} ({}) VALUES ",
            g.wrap_table(query.base_table())?,
            g.columnize(&query.insert_columns)?
        ));

        for (i, row) in query.insert_rows.iter().enumerate() {
            if row.len() != query.insert_columns.len() {
                return Err(ModelError::InvalidArgument(format!(
                    "Insert row {} has {} values for {} columns",
                    i,
                    row.len(),
                    query.insert_columns.len()
                )));
            }
            if i > 0 {
                f.sql(", ");
            }
            f.sql("(");
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    f.sql(", ");
                }
                f.bind(Bucket::MutationSet, value.clone())?;
            }
            f.sql(")");
        }

        if query.query_type == QueryType::Upsert {
            let upsert = query.upsert.clone().unwrap_or_default();
            if upsert.conflict_columns.is_empty() {
                return Err(ModelError::InvalidArgument(
                    "UPSERT requires at least one conflict column".to_string(),
                ));
            }
            f.sql(format!(" ON CONFLICT ({})", g.columnize(&upsert.conflict_columns)?));
            if upsert.update_columns.is_empty() {
                f.sql(" DO NOTHING");
            } else {
                let assignments = upsert
                    .update_columns
                    .iter()
                    .map(|c| Ok(format!("{} = excluded.{}", g.wrap(c)?, g.wrap(c)?)))
                    .collect::<ModelResult<Vec<_>>>()?;
                f.sql(format!(" DO UPDATE SET {}", assignments.join(", ")));
            }
        }

        self.compile_returning(query, f)
    }

    fn compile_update(&self, query: &QueryBuilder, f: &mut Fragment) -> ModelResult<()> {
        let g = &self.grammar;
        if query.set_clauses.is_empty() {
            return Err(ModelError::InvalidArgument(
                "UPDATE requires at least one SET assignment".to_string(),
            ));
        }

        f.sql(format!("UPDATE {} SET ", g.wrap_table(&query.table)?));
        for (i, clause) in query.set_clauses.iter().enumerate() {
            if i > 0 {
                f.sql(", ");
            }
            f.sql(format!("{} = ", g.wrap(unqualified(&clause.column))?));
            f.bind(Bucket::MutationSet, clause.value.clone())?;
        }

        self.compile_wheres(query, f)?;
        self.compile_returning(query, f)
    }

    fn compile_delete(&self, query: &QueryBuilder, f: &mut Fragment) -> ModelResult<()> {
        f.sql(format!("DELETE FROM {}", self.grammar.wrap_table(&query.table)?));
        self.compile_wheres(query, f)?;
        self.compile_returning(query, f)
    }

    fn compile_returning(&self, query: &QueryBuilder, f: &mut Fragment) -> ModelResult<()> {
        if !query.returning.is_empty() {
            f.sql(format!(" RETURNING {}", self.grammar.columnize(&query.returning)?));
        }
        Ok(())
    }
}

fn item_alias(item: &SelectItem) -> Option<&str> {
    match item {
        SelectItem::Column(column) => split_alias(column).1,
        SelectItem::Aggregate { alias, .. } => alias.as_deref(),
        SelectItem::Subquery { alias, .. } => Some(alias.as_str()),
        SelectItem::Raw { .. } => None,
    }
}

/// SET targets may not be qualified
fn unqualified(column: &str) -> &str {
    column.rsplit('.').next().unwrap_or(column)
}
