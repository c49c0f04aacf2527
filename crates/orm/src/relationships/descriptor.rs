//! Relationship descriptor operations
//!
//! Every kind answers the same questions: which table holds the related
//! rows, which column on that side is matched against which parent column,
//! and which joins are needed to reach it. Queries and correlated subqueries
//! are assembled from those answers.

use std::sync::Arc;

use super::metadata::{RelationshipDescriptor, RelationshipType};
use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};
use crate::model::{Entity, ModelSchema};
use crate::query::{JoinClause, PredicateBuilder, QueryBuilder, WhereClause};

impl RelationshipDescriptor {
    /// Resolve the related table name
    pub fn related_table(&self) -> ModelResult<String> {
        match &self.related {
            Some(related) => related.table(),
            None => Err(self.unsupported("has no fixed related table")),
        }
    }

    /// Name the related table goes by in generated SQL: its alias when one
    /// is set, otherwise the table itself
    pub(crate) fn related_reference(&self) -> ModelResult<String> {
        match &self.related_alias {
            Some(alias) => Ok(alias.clone()),
            None => self.related_table(),
        }
    }

    /// Copy whose related table is referenced as `alias`
    pub(crate) fn aliased(&self, alias: &str) -> Self {
        let mut descriptor = self.clone();
        descriptor.related_alias = Some(alias.to_string());
        descriptor
    }

    /// Schema related rows hydrate into
    pub fn related_schema(&self) -> ModelResult<Arc<ModelSchema>> {
        match &self.related {
            Some(related) => related.schema(),
            None => Err(self.unsupported("has no fixed related model")),
        }
    }

    /// Column on the parent whose value identifies the related rows
    pub fn parent_key(&self) -> &str {
        match self.kind {
            RelationshipType::BelongsTo => &self.foreign_key,
            RelationshipType::MorphTo => self
                .morph
                .as_ref()
                .map_or(self.foreign_key.as_str(), |morph| morph.id_column.as_str()),
            _ => &self.local_key,
        }
    }

    /// Qualified column on the related side matched against `parent_key`
    pub fn match_column(&self) -> ModelResult<String> {
        match self.kind {
            RelationshipType::HasOne
            | RelationshipType::HasMany
            | RelationshipType::MorphOne
            | RelationshipType::MorphMany => {
                Ok(format!("{}.{}", self.related_reference()?, self.foreign_key))
            }
            RelationshipType::BelongsTo => Ok(format!("{}.{}", self.related_reference()?, self.owner_key)),
            RelationshipType::ManyToMany => {
                let pivot = self.pivot_config()?;
                Ok(format!("{}.{}", pivot.table, pivot.foreign_pivot_key))
            }
            RelationshipType::HasOneThrough | RelationshipType::HasManyThrough => {
                let through = self.through_config()?;
                Ok(format!("{}.{}", through.intermediate.table()?, through.first_key))
            }
            RelationshipType::MorphTo => Err(self.unsupported("cannot be matched by a single column")),
        }
    }

    /// Predicate anchoring the related rows to the parent row referenced by
    /// `parent_ref` (a table name or alias in the enclosing query)
    pub fn correlate(&self, parent_ref: &str) -> ModelResult<WhereClause> {
        self.validate()?;
        let match_column = self.match_column()?;
        let parent_column = format!("{}.{}", parent_ref, self.parent_key());
        self.scope_type(WhereClause::new().where_column(&match_column, "=", &parent_column))
    }

    /// Joins needed to reach the related table from the matched column
    pub fn joins(&self) -> ModelResult<Vec<JoinClause>> {
        match self.kind {
            RelationshipType::ManyToMany => Ok(vec![self.pivot_join()?]),
            RelationshipType::HasOneThrough | RelationshipType::HasManyThrough => {
                Ok(vec![self.through_join()?])
            }
            _ => Ok(Vec::new()),
        }
    }

    /// `SELECT related.* FROM related [JOIN ...]` with no parent filter
    pub fn base_query(&self) -> ModelResult<QueryBuilder> {
        self.base_query_for(self.related_schema()?)
    }

    /// Base query hydrating into an already resolved schema
    pub fn base_query_for(&self, schema: Arc<ModelSchema>) -> ModelResult<QueryBuilder> {
        self.validate()?;
        let mut query = match &self.related_alias {
            Some(alias) => {
                let from = format!("{} AS {}", schema.table, alias);
                let all_columns = format!("{}.*", alias);
                QueryBuilder::for_model(schema)
                    .from(&from)
                    .select(&[all_columns.as_str()])
            }
            None => {
                let all_columns = format!("{}.*", schema.table);
                QueryBuilder::for_model(schema).select(&[all_columns.as_str()])
            }
        };
        for join in self.joins()? {
            query = query.add_join(join);
        }
        Ok(query)
    }

    /// Independent query for the rows related to one parent entity
    pub fn scoped_query(&self, parent: &Entity) -> ModelResult<QueryBuilder> {
        if self.kind == RelationshipType::MorphTo {
            return self.morph_to_query(parent);
        }

        let match_column = self.match_column()?;
        let value = parent
            .get_raw(self.parent_key())
            .cloned()
            .unwrap_or(DatabaseValue::Null);

        let query = self.base_query()?;
        let query = if value.is_null() {
            query.where_raw("0 = 1", Vec::new())
        } else {
            query.where_eq(&match_column, value)
        };
        let query = self.scope_type(query)?;

        Ok(if self.kind.is_collection() {
            query
        } else {
            query.limit(1)
        })
    }

    /// Add the morph type equality for MorphOne/MorphMany
    pub(crate) fn scope_type<P: PredicateBuilder>(&self, target: P) -> ModelResult<P> {
        match self.kind {
            RelationshipType::MorphOne | RelationshipType::MorphMany => {
                let (column, morph_type) = self.type_filter()?;
                Ok(target.where_eq(&column, morph_type))
            }
            _ => Ok(target),
        }
    }

    pub(crate) fn unsupported(&self, what: &str) -> ModelError {
        ModelError::UnsupportedRelation(format!("{:?} relationship {}", self.kind, what))
    }
}
