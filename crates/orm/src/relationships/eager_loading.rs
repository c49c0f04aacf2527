//! Eager Loading System - attaches related entities to a set of parents
//!
//! Two strategies produce the same attachment shape:
//!
//! - `Batched` issues one `WHERE match_column IN (...)` query per relation and
//!   distributes the rows by key.
//! - `PerParent` runs each parent's scoped relation query.
//!
//! MorphTo always resolves per parent since its target table varies by row.
//! Dotted names (`"subjects.votes"`) load depth-first: the inner relation is
//! attached to the loaded entities before the outer one is written to the
//! parents.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::constraints::RelationshipConstraintBuilder;
use super::metadata::{RelationshipDescriptor, RelationshipType};
use super::registry::ModelRegistry;
use super::traits::RelationshipMeta;
use crate::backends::{Connection, DatabaseValue, Row};
use crate::error::{ModelError, ModelResult};
use crate::model::{Entity, ModelHydrator, RelationValue};
use crate::query::{PredicateBuilder, QueryBuilder};

/// Extra select column carrying the parent key in batched queries
const EAGER_KEY_ALIAS: &str = "eager_parent_key";

/// How related rows are fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EagerLoadStrategy {
    /// One IN query per relation
    #[default]
    Batched,
    /// One query per parent
    PerParent,
}

impl fmt::Display for EagerLoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EagerLoadStrategy::Batched => write!(f, "batched"),
            EagerLoadStrategy::PerParent => write!(f, "per_parent"),
        }
    }
}

impl FromStr for EagerLoadStrategy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "batched" => Ok(EagerLoadStrategy::Batched),
            "per_parent" | "per-parent" => Ok(EagerLoadStrategy::PerParent),
            other => Err(ModelError::Configuration(format!(
                "Unknown eager load strategy '{}'",
                other
            ))),
        }
    }
}

/// Represents a relationship to be eagerly loaded
#[derive(Debug, Clone)]
pub struct EagerLoadSpec {
    /// Relationship name (e.g., "posts" or "posts.comments")
    pub relation: String,
    /// Optional constraints for the relationship query; applied to the last segment
    pub constraints: Option<Arc<RelationshipConstraintBuilder>>,
}

impl EagerLoadSpec {
    pub fn new(relation: &str) -> Self {
        Self {
            relation: relation.trim().to_string(),
            constraints: None,
        }
    }

    pub fn with_constraints(mut self, constraints: Arc<RelationshipConstraintBuilder>) -> Self {
        self.constraints = Some(constraints);
        self
    }
}

/// Relation tree built from dotted specs; children keep request order
#[derive(Debug, Default)]
struct LoadNode {
    constraints: Option<Arc<RelationshipConstraintBuilder>>,
    children: Vec<(String, LoadNode)>,
}

impl LoadNode {
    fn from_specs(specs: &[EagerLoadSpec]) -> ModelResult<Self> {
        let mut root = LoadNode::default();
        for spec in specs {
            let segments: Vec<&str> = spec.relation.split('.').map(str::trim).collect();
            if segments.iter().any(|segment| segment.is_empty()) {
                return Err(ModelError::InvalidArgument(format!(
                    "Invalid eager load relation '{}'",
                    spec.relation
                )));
            }

            let mut node = &mut root;
            for segment in segments {
                node = node.child(segment);
            }
            if spec.constraints.is_some() {
                node.constraints = spec.constraints.clone();
            }
        }
        Ok(root)
    }

    fn child(&mut self, name: &str) -> &mut LoadNode {
        let index = match self.children.iter().position(|(child, _)| child == name) {
            Some(index) => index,
            None => {
                self.children.push((name.to_string(), LoadNode::default()));
                self.children.len() - 1
            }
        };
        &mut self.children[index].1
    }

    fn constrain(&self, query: QueryBuilder) -> ModelResult<QueryBuilder> {
        match &self.constraints {
            Some(constraints) => constraints.apply_all(query),
            None => Ok(query),
        }
    }
}

/// Resolves requested relations for a set of parent entities
#[derive(Debug)]
pub struct EagerLoadResolver<'r> {
    registry: &'r ModelRegistry,
    strategy: EagerLoadStrategy,
}

impl<'r> EagerLoadResolver<'r> {
    /// Resolver using the registry's default strategy
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Self {
            registry,
            strategy: registry.strategy(),
        }
    }

    pub fn with_strategy(mut self, strategy: EagerLoadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> EagerLoadStrategy {
        self.strategy
    }

    /// Load one relation (dotted names allowed) into every parent
    pub fn attach(
        &self,
        conn: &mut dyn Connection,
        parents: &mut [Entity],
        relation: &str,
        constraints: Option<&RelationshipConstraintBuilder>,
    ) -> ModelResult<()> {
        let mut spec = EagerLoadSpec::new(relation);
        if let Some(constraints) = constraints {
            spec = spec.with_constraints(Arc::new(constraints.clone()));
        }
        self.load_all(conn, parents, &[spec])
    }

    /// Load every requested relation into every parent
    pub fn load_all(
        &self,
        conn: &mut dyn Connection,
        parents: &mut [Entity],
        specs: &[EagerLoadSpec],
    ) -> ModelResult<()> {
        let tree = LoadNode::from_specs(specs)?;
        if parents.is_empty() {
            return Ok(());
        }
        self.resolve_children(conn, parents, &tree)
    }

    fn resolve_children(
        &self,
        conn: &mut dyn Connection,
        parents: &mut [Entity],
        node: &LoadNode,
    ) -> ModelResult<()> {
        for (relation, child) in &node.children {
            self.resolve(conn, parents, relation, child)?;
        }
        Ok(())
    }

    /// Parents may mix models (children of a MorphTo); each model resolves separately
    fn resolve(
        &self,
        conn: &mut dyn Connection,
        parents: &mut [Entity],
        relation: &str,
        node: &LoadNode,
    ) -> ModelResult<()> {
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (index, parent) in parents.iter().enumerate() {
            let model = &parent.schema().name;
            match groups.iter_mut().find(|(name, _)| name == model) {
                Some((_, indices)) => indices.push(index),
                None => groups.push((model.clone(), vec![index])),
            }
        }

        for (_, indices) in groups {
            self.resolve_group(conn, parents, &indices, relation, node)?;
        }
        Ok(())
    }

    fn resolve_group(
        &self,
        conn: &mut dyn Connection,
        parents: &mut [Entity],
        indices: &[usize],
        relation: &str,
        node: &LoadNode,
    ) -> ModelResult<()> {
        let Some(&first) = indices.first() else {
            return Ok(());
        };
        let schema = parents[first].schema().clone();
        let descriptor = self.registry.relationship(&schema, relation)?;
        let strategy = if descriptor.kind() == RelationshipType::MorphTo {
            EagerLoadStrategy::PerParent
        } else {
            self.strategy
        };

        debug!(
            model = %schema.name,
            relation,
            parents = indices.len(),
            strategy = %strategy,
            "Resolving eager load"
        );

        let mut loaded = match strategy {
            EagerLoadStrategy::Batched => {
                self.load_batched(conn, parents, indices, &descriptor, node)?
            }
            EagerLoadStrategy::PerParent => {
                self.load_per_parent(conn, parents, indices, &descriptor, node)?
            }
        };

        if !node.children.is_empty() {
            let counts: Vec<usize> = loaded.iter().map(Vec::len).collect();
            let mut flat: Vec<Entity> = loaded.into_iter().flatten().collect();
            self.resolve_children(conn, &mut flat, node)?;

            let mut flat = flat.into_iter();
            loaded = counts
                .into_iter()
                .map(|count| flat.by_ref().take(count).collect())
                .collect();
        }

        let collection = descriptor.is_collection();
        for (&index, related) in indices.iter().zip(loaded) {
            let value = if collection {
                RelationValue::Many(related)
            } else {
                RelationValue::One(related.into_iter().next().map(Box::new))
            };
            parents[index].set_relation(relation, value);
        }
        Ok(())
    }

    /// One IN query; results grouped by the parent key they matched
    fn load_batched(
        &self,
        conn: &mut dyn Connection,
        parents: &[Entity],
        indices: &[usize],
        descriptor: &RelationshipDescriptor,
        node: &LoadNode,
    ) -> ModelResult<Vec<Vec<Entity>>> {
        let parent_key = descriptor.parent_key();
        let mut parent_keys = Vec::with_capacity(indices.len());
        let mut values = Vec::new();
        let mut seen = HashSet::new();
        for &index in indices {
            let value = parents[index].get_raw(parent_key);
            let key = value.and_then(DatabaseValue::match_key);
            if let (Some(value), Some(key)) = (value, &key) {
                if seen.insert(key.clone()) {
                    values.push(value.clone());
                }
            }
            parent_keys.push(key);
        }

        if values.is_empty() {
            return Ok(vec![Vec::new(); indices.len()]);
        }

        let schema = self.registry.related_schema(descriptor)?;
        let match_column = descriptor.match_column()?;
        let query = descriptor
            .base_query_for(schema.clone())?
            .add_select(&format!("{} AS {}", match_column, EAGER_KEY_ALIAS))
            .where_in(&match_column, values);
        let query = node.constrain(descriptor.scope_type(query)?)?;

        let hydrator = ModelHydrator::new(schema);
        let mut by_key: HashMap<String, Vec<Entity>> = HashMap::new();
        for row in query.get_rows(conn)? {
            let Some(key) = row.get(EAGER_KEY_ALIAS).and_then(DatabaseValue::match_key) else {
                continue;
            };
            let stripped = Row::from_pairs(
                row.iter()
                    .filter(|(column, _)| *column != EAGER_KEY_ALIAS)
                    .map(|(column, value)| (column.to_string(), value.clone())),
            );
            by_key.entry(key).or_default().push(hydrator.hydrate(&stripped)?);
        }

        Ok(parent_keys
            .into_iter()
            .map(|key| key.and_then(|key| by_key.get(&key).cloned()).unwrap_or_default())
            .collect())
    }

    /// One scoped query per parent
    fn load_per_parent(
        &self,
        conn: &mut dyn Connection,
        parents: &[Entity],
        indices: &[usize],
        descriptor: &RelationshipDescriptor,
        node: &LoadNode,
    ) -> ModelResult<Vec<Vec<Entity>>> {
        let mut loaded = Vec::with_capacity(indices.len());
        for &index in indices {
            let query = node.constrain(descriptor.scoped_query(&parents[index])?)?;
            loaded.push(query.get_using(conn, self.registry)?);
        }
        Ok(loaded)
    }
}
