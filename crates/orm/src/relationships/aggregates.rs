//! Relation aggregates as correlated scalar subqueries
//!
//! `with_count("subjects")` on a category query becomes
//! `(SELECT COUNT(*) FROM subjects WHERE subjects.category_id = categories.id) AS subjects_count`.
//! COUNT over no rows is 0; the other functions yield NULL there.

use super::metadata::{RelationshipDescriptor, RelationshipType};
use super::traits::RelationshipMeta;
use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};
use crate::query::{AggregateFunction, PredicateBuilder, SelectItem, WhereClause};

/// Aggregate requested on a query, resolved against the model at compile time
#[derive(Debug, Clone)]
pub struct RelationAggregate {
    pub relation: String,
    pub function: String,
    pub column: Option<String>,
    pub alias: Option<String>,
    pub constraint: WhereClause,
}

impl RelationAggregate {
    pub fn new(relation: &str, function: &str, column: Option<&str>) -> Self {
        Self {
            relation: relation.to_string(),
            function: function.to_string(),
            column: column.map(str::to_string),
            alias: None,
            constraint: WhereClause::new(),
        }
    }

    /// Count of related rows whose `column` equals `value`
    pub fn count_where(relation: &str, column: &str, value: DatabaseValue) -> Self {
        let alias = format!("{}_count_{}", relation, alias_suffix(&value));
        Self::new(relation, "count", None)
            .alias(&alias)
            .constrained(WhereClause::new().where_eq(column, value))
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Extra predicate on the related rows
    pub fn constrained(mut self, constraint: WhereClause) -> Self {
        self.constraint = constraint;
        self
    }
}

/// Identifier-safe rendering of a predicate value
fn alias_suffix(value: &DatabaseValue) -> String {
    let raw = value.match_key().unwrap_or_else(|| "null".to_string());
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Builds aggregate select columns for one relationship
#[derive(Debug)]
pub struct AggregateSubqueryBuilder<'a> {
    descriptor: &'a RelationshipDescriptor,
    relation: &'a str,
}

impl<'a> AggregateSubqueryBuilder<'a> {
    pub fn new(descriptor: &'a RelationshipDescriptor, relation: &'a str) -> Self {
        Self {
            descriptor,
            relation,
        }
    }

    /// `(SELECT FUNC(column) FROM related [JOIN ...] WHERE correlation [AND constraint]) AS alias`
    ///
    /// `parent_ref` is the table name or alias of the outer query. A missing
    /// column is only allowed for COUNT, which then counts rows.
    pub fn aggregate_column(
        &self,
        parent_ref: &str,
        column: Option<&str>,
        function: &str,
        alias: Option<&str>,
        constraint: WhereClause,
    ) -> ModelResult<SelectItem> {
        let function: AggregateFunction = function.parse()?;
        if self.descriptor.kind() == RelationshipType::MorphTo {
            return Err(ModelError::UnsupportedRelation(format!(
                "Aggregates are not available on MorphTo relation '{}'",
                self.relation
            )));
        }

        let self_referential = self.descriptor.related_table()? == parent_ref;
        let aliased;
        let descriptor = if self_referential {
            aliased = self.descriptor.aliased(&format!("{}_agg", parent_ref));
            &aliased
        } else {
            self.descriptor
        };
        self.check_joined_tables(parent_ref)?;

        let related = descriptor.related_reference()?;
        let target = match column.map(str::trim) {
            Some(column) if !column.is_empty() && column != "*" => {
                if column.contains('.') {
                    column.to_string()
                } else {
                    format!("{}.{}", related, column)
                }
            }
            _ if function == AggregateFunction::Count => "*".to_string(),
            _ => {
                return Err(ModelError::Configuration(format!(
                    "{} on relation '{}' requires a column",
                    function, self.relation
                )))
            }
        };

        let mut query = descriptor.base_query()?;
        query.columns = vec![SelectItem::Aggregate {
            function,
            column: target,
            alias: None,
        }];
        query.wheres.and_group(descriptor.correlate(parent_ref)?);
        if !constraint.is_empty() {
            query.wheres.and_group(constraint);
        }

        let alias = match alias {
            Some(alias) => alias.to_string(),
            None => format!("{}_{}", self.relation, function.name()).to_lowercase(),
        };

        Ok(SelectItem::Subquery {
            query: Box::new(query),
            alias,
        })
    }

    /// Pivot and intermediate tables are joined under their own names, so
    /// they must not shadow the outer table
    fn check_joined_tables(&self, parent_ref: &str) -> ModelResult<()> {
        let joined = match self.descriptor.kind() {
            RelationshipType::ManyToMany => Some(self.descriptor.pivot_config()?.table.clone()),
            RelationshipType::HasOneThrough | RelationshipType::HasManyThrough => {
                Some(self.descriptor.through_config()?.intermediate.table()?)
            }
            _ => None,
        };
        match joined {
            Some(table) if table == parent_ref => Err(ModelError::Configuration(format!(
                "Relation '{}' joins '{}', which is also the outer table; alias the outer query",
                self.relation, table
            ))),
            _ => Ok(()),
        }
    }

    /// Row count of the relation
    pub fn count(&self, parent_ref: &str) -> ModelResult<SelectItem> {
        self.aggregate_column(parent_ref, None, "count", None, WhereClause::new())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::ModelSchema;
    use crate::query::QueryBuilder;
    use crate::sql::Grammar;

    fn categories() -> Arc<ModelSchema> {
        let mut schema = ModelSchema::for_table("categories");
        schema.relationships = vec![
            (
                "subjects".to_string(),
                RelationshipDescriptor::has_many("subjects", "category_id"),
            ),
            (
                "tags".to_string(),
                RelationshipDescriptor::belongs_to_many("tags", "category_tag", "category_id", "tag_id"),
            ),
        ];
        Arc::new(schema)
    }

    #[test]
    fn test_count_subquery() {
        let sql = QueryBuilder::for_model(categories())
            .with_count("subjects")
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"categories\".*, (SELECT COUNT(*) FROM \"subjects\" \
             WHERE \"subjects\".\"category_id\" = \"categories\".\"id\") AS \"subjects_count\" \
             FROM \"categories\""
        );
    }

    #[test]
    fn test_many_to_many_count_joins_pivot() {
        let sql = QueryBuilder::for_model(categories())
            .select(&["id"])
            .with_count("tags")
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"id\", (SELECT COUNT(*) FROM \"tags\" \
             INNER JOIN \"category_tag\" ON \"tags\".\"id\" = \"category_tag\".\"tag_id\" \
             WHERE \"category_tag\".\"category_id\" = \"categories\".\"id\") AS \"tags_count\" \
             FROM \"categories\""
        );
    }

    #[test]
    fn test_count_where_alias_and_binding() {
        let compiled = QueryBuilder::for_model(categories())
            .with_count_where("subjects", "status", "Open")
            .where_eq("active", true)
            .compile(&Grammar::default())
            .unwrap();
        assert!(compiled.sql.contains("AS \"subjects_count_Open\""));
        assert!(compiled.sql.contains("\"status\" = ?2"));
        assert!(compiled.sql.contains("\"active\" = ?1"));
        assert_eq!(
            compiled.bindings,
            vec![DatabaseValue::Bool(true), DatabaseValue::from("Open")]
        );
    }

    #[test]
    fn test_sum_qualifies_column_and_defaults_alias() {
        let descriptor = RelationshipDescriptor::has_many("subjects", "category_id");
        let item = AggregateSubqueryBuilder::new(&descriptor, "Subjects")
            .aggregate_column("categories", Some("score"), "SUM", None, WhereClause::new())
            .unwrap();
        match item {
            SelectItem::Subquery { query, alias } => {
                assert_eq!(alias, "subjects_sum");
                assert!(matches!(
                    &query.columns[0],
                    SelectItem::Aggregate { column, .. } if column == "subjects.score"
                ));
            }
            other => panic!("unexpected select item {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_errors() {
        let descriptor = RelationshipDescriptor::has_many("subjects", "category_id");
        let builder = AggregateSubqueryBuilder::new(&descriptor, "subjects");
        assert!(matches!(
            builder.aggregate_column("categories", Some("score"), "median", None, WhereClause::new()),
            Err(ModelError::Configuration(_))
        ));
        assert!(matches!(
            builder.aggregate_column("categories", None, "avg", None, WhereClause::new()),
            Err(ModelError::Configuration(_))
        ));

        let morph = RelationshipDescriptor::morph_to("owner", &[]);
        assert!(matches!(
            AggregateSubqueryBuilder::new(&morph, "owner").count("comments"),
            Err(ModelError::UnsupportedRelation(_))
        ));
    }

    #[test]
    fn test_self_referential_count_aliases_inner_table() {
        let mut schema = ModelSchema::for_table("categories");
        schema.relationships = vec![(
            "children".to_string(),
            RelationshipDescriptor::has_many("categories", "parent_id"),
        )];
        let sql = QueryBuilder::for_model(Arc::new(schema))
            .with_count("children")
            .with_sum("children", "score")
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"categories\".*, (SELECT COUNT(*) FROM \"categories\" AS \"categories_agg\" \
             WHERE \"categories_agg\".\"parent_id\" = \"categories\".\"id\") AS \"children_count\", \
             (SELECT SUM(\"categories_agg\".\"score\") FROM \"categories\" AS \"categories_agg\" \
             WHERE \"categories_agg\".\"parent_id\" = \"categories\".\"id\") AS \"children_sum\" \
             FROM \"categories\""
        );
    }

    #[test]
    fn test_pivot_named_like_outer_table_is_rejected() {
        let descriptor =
            RelationshipDescriptor::belongs_to_many("tags", "categories", "category_id", "tag_id");
        let result = AggregateSubqueryBuilder::new(&descriptor, "tags").count("categories");
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_count_where_alias_keeps_value_case() {
        let aggregate = RelationAggregate::count_where("subjects", "status", DatabaseValue::from("In Review"));
        assert_eq!(aggregate.alias.as_deref(), Some("subjects_count_In_Review"));
    }

    #[test]
    fn test_duplicate_alias_is_rejected() {
        let result = QueryBuilder::for_model(categories())
            .with_count("subjects")
            .with_count("subjects")
            .to_sql();
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_aggregate_without_model_is_rejected() {
        let result = QueryBuilder::table("categories").with_count("subjects").to_sql();
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }
}
