//! ORM configuration
//!
//! Defaults, environment overrides and the objects built from them: the
//! grammar handed to the compiler, the model registry and connections.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backends::{SqlDialect, SqliteConnection};
use crate::error::{ModelError, ModelResult};
use crate::relationships::{EagerLoadStrategy, ModelRegistry};
use crate::sql::Grammar;

/// Default rows per page for chunked iteration
pub const DEFAULT_CHUNK_SIZE: i64 = 1000;

/// ORM configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    pub dialect: SqlDialect,
    /// Overrides the dialect's identifier quote character
    pub identifier_quote: Option<char>,
    pub eager_load_strategy: EagerLoadStrategy,
    pub chunk_size: i64,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::default(),
            identifier_quote: None,
            eager_load_strategy: EagerLoadStrategy::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl OrmConfig {
    /// Read `ORM_DIALECT`, `ORM_IDENTIFIER_QUOTE`, `ORM_EAGER_STRATEGY` and
    /// `ORM_CHUNK_SIZE`; unset variables keep their defaults
    pub fn from_env() -> ModelResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`OrmConfig::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> ModelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("ORM_DIALECT") {
            config.dialect = value.parse()?;
        }

        if let Some(value) = lookup("ORM_IDENTIFIER_QUOTE") {
            let mut chars = value.chars();
            config.identifier_quote = match (chars.next(), chars.next()) {
                (Some(quote), None) => Some(quote),
                _ => return Err(invalid_value("ORM_IDENTIFIER_QUOTE", &value, "a single character")),
            };
        }

        if let Some(value) = lookup("ORM_EAGER_STRATEGY") {
            config.eager_load_strategy = value.parse()?;
        }

        if let Some(value) = lookup("ORM_CHUNK_SIZE") {
            config.chunk_size = value
                .parse::<i64>()
                .map_err(|_| invalid_value("ORM_CHUNK_SIZE", &value, "a whole number of rows"))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.chunk_size < 1 {
            return Err(ModelError::Configuration(format!(
                "Chunk size must be greater than 0, got {}",
                self.chunk_size
            )));
        }

        if let Some(quote) = self.identifier_quote {
            if quote.is_alphanumeric() || quote.is_whitespace() || quote == '_' {
                return Err(ModelError::Configuration(format!(
                    "'{}' cannot be used as an identifier quote",
                    quote
                )));
            }
        }

        Ok(())
    }

    /// Grammar for the configured dialect and quote character
    pub fn grammar(&self) -> Grammar {
        let grammar = Grammar::new(self.dialect);
        match self.identifier_quote {
            Some(quote) => grammar.with_quote(quote),
            None => grammar,
        }
    }

    /// Empty registry using the configured eager-loading strategy
    pub fn registry(&self) -> ModelRegistry {
        ModelRegistry::with_strategy(self.eager_load_strategy)
    }

    /// Open a SQLite database file with this configuration's grammar
    pub fn open_sqlite<P: AsRef<Path>>(&self, path: P) -> ModelResult<SqliteConnection> {
        self.require_dialect(SqlDialect::SQLite)?;
        Ok(SqliteConnection::open(path)?.with_grammar(self.grammar()))
    }

    pub fn sqlite_in_memory(&self) -> ModelResult<SqliteConnection> {
        self.require_dialect(SqlDialect::SQLite)?;
        Ok(SqliteConnection::open_in_memory()?.with_grammar(self.grammar()))
    }

    fn require_dialect(&self, dialect: SqlDialect) -> ModelResult<()> {
        if self.dialect != dialect {
            return Err(ModelError::Configuration(format!(
                "Configured dialect is {}, not {}",
                self.dialect, dialect
            )));
        }
        Ok(())
    }
}

fn invalid_value(key: &str, value: &str, expected: &str) -> ModelError {
    ModelError::Configuration(format!(
        "Invalid value '{}' for {}: expected {}",
        value, key, expected
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::query::{PredicateBuilder, QueryBuilder};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = OrmConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, OrmConfig::default());
        assert_eq!(config.dialect, SqlDialect::SQLite);
        assert_eq!(config.eager_load_strategy, EagerLoadStrategy::Batched);
        assert_eq!(config.chunk_size, 1000);
    }

    #[test]
    fn test_env_overrides() {
        let config = OrmConfig::from_lookup(lookup(&[
            ("ORM_DIALECT", "postgres"),
            ("ORM_EAGER_STRATEGY", "per_parent"),
            ("ORM_CHUNK_SIZE", "50"),
        ]))
        .unwrap();
        assert_eq!(config.dialect, SqlDialect::PostgreSQL);
        assert_eq!(config.eager_load_strategy, EagerLoadStrategy::PerParent);
        assert_eq!(config.chunk_size, 50);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for vars in [
            [("ORM_CHUNK_SIZE", "0")],
            [("ORM_CHUNK_SIZE", "lots")],
            [("ORM_IDENTIFIER_QUOTE", "ab")],
            [("ORM_IDENTIFIER_QUOTE", "x")],
            [("ORM_EAGER_STRATEGY", "eventually")],
            [("ORM_DIALECT", "oracle")],
        ] {
            assert!(
                matches!(OrmConfig::from_lookup(lookup(&vars)), Err(ModelError::Configuration(_))),
                "{:?} should be rejected",
                vars
            );
        }
    }

    #[test]
    fn test_quote_override_reaches_compiled_sql() {
        let config = OrmConfig {
            identifier_quote: Some('`'),
            ..Default::default()
        };
        let compiled = QueryBuilder::table("users")
            .where_eq("name", "ann")
            .compile(&config.grammar())
            .unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM `users` WHERE `name` = ?1");
    }

    #[test]
    fn test_sqlite_requires_sqlite_dialect() {
        let config = OrmConfig {
            dialect: SqlDialect::PostgreSQL,
            ..Default::default()
        };
        assert!(matches!(config.sqlite_in_memory(), Err(ModelError::Configuration(_))));
        assert!(OrmConfig::default().sqlite_in_memory().is_ok());
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let config: OrmConfig =
            serde_json::from_value(serde_json::json!({ "eager_load_strategy": "per_parent" })).unwrap();
        assert_eq!(config.eager_load_strategy, EagerLoadStrategy::PerParent);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }
}
