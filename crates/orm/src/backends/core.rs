//! Core Database Backend Traits
//!
//! This module defines the boundary between the ORM core and the database
//! driver: the value type used for parameter binding, the row type handed
//! back to the hydrator, and the synchronous [`Connection`] collaborator.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ModelError, ModelResult};
use crate::sql::grammar::Grammar;

/// Abstract database connection.
///
/// Execution is synchronous and blocking; any async scheduling belongs to the
/// caller. Implementations surface driver failures as
/// [`ModelError::Connection`] and never retry.
pub trait Connection {
    /// SQL dialect spoken by this connection
    fn dialect(&self) -> SqlDialect;

    /// Grammar used to compile statements for this connection
    fn grammar(&self) -> Grammar {
        Grammar::new(self.dialect())
    }

    /// Execute a mutation statement
    fn execute(&mut self, sql: &str, bindings: &[DatabaseValue]) -> ModelResult<ExecuteResult>;

    /// Execute a query and return all result rows
    fn fetch_all(&mut self, sql: &str, bindings: &[DatabaseValue]) -> ModelResult<Vec<Row>>;

    /// Execute a query and return the first result row
    fn fetch_one(&mut self, sql: &str, bindings: &[DatabaseValue]) -> ModelResult<Option<Row>> {
        Ok(self.fetch_all(sql, bindings)?.into_iter().next())
    }

    /// Begin a transaction
    fn begin(&mut self) -> ModelResult<()>;

    /// Commit the current transaction
    fn commit(&mut self) -> ModelResult<()>;

    /// Roll back the current transaction
    fn rollback(&mut self) -> ModelResult<()>;
}

/// Outcome of a mutation statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    /// Row id generated by an INSERT, when the driver reports one
    pub last_insert_id: Option<i64>,
}

/// SQL dialect enumeration for generating database-specific SQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[serde(alias = "postgres")]
    PostgreSQL,
    #[default]
    SQLite,
}

impl SqlDialect {
    /// Get the parameter placeholder for a zero-based position in the binding list
    pub fn parameter_placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index + 1),
            SqlDialect::SQLite => format!("?{}", index + 1),
        }
    }

    /// Get the quote character for identifiers in this dialect
    pub fn identifier_quote(&self) -> char {
        '"'
    }

    /// Whether row locking clauses are understood
    pub fn supports_locking(&self) -> bool {
        matches!(self, SqlDialect::PostgreSQL)
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::PostgreSQL => write!(f, "postgresql"),
            SqlDialect::SQLite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for SqlDialect {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(SqlDialect::PostgreSQL),
            "sqlite" => Ok(SqlDialect::SQLite),
            _ => Err(ModelError::Configuration(format!(
                "Unsupported database dialect: {}",
                s
            ))),
        }
    }
}

/// Database value enumeration for type-safe parameter binding
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    DateTime(chrono::DateTime<chrono::Utc>),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    Json(JsonValue),
    Array(Vec<DatabaseValue>),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Scalars (and NULL) can be bound to a single placeholder
    pub fn is_scalar(&self) -> bool {
        !matches!(self, DatabaseValue::Json(_) | DatabaseValue::Array(_))
    }

    /// Integer view of the value, if it has one
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Int32(i) => Some(*i as i64),
            DatabaseValue::Int64(i) => Some(*i),
            DatabaseValue::Bool(b) => Some(*b as i64),
            DatabaseValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Float view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DatabaseValue::Float64(f) => Some(*f),
            DatabaseValue::Int32(i) => Some(*i as f64),
            DatabaseValue::Int64(i) => Some(*i as f64),
            DatabaseValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// String view of a textual value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Key used to match parent and related rows during eager loading.
    ///
    /// Integers and their string spellings produce the same key, since drivers
    /// disagree on the type of a foreign key column. NULL has no key.
    pub fn match_key(&self) -> Option<String> {
        match self {
            DatabaseValue::Null | DatabaseValue::Json(_) | DatabaseValue::Array(_) => None,
            DatabaseValue::Bool(b) => Some((*b as i64).to_string()),
            DatabaseValue::Int32(i) => Some(i.to_string()),
            DatabaseValue::Int64(i) => Some(i.to_string()),
            DatabaseValue::Float64(f) if f.fract() == 0.0 => Some((*f as i64).to_string()),
            DatabaseValue::Float64(f) => Some(f.to_string()),
            DatabaseValue::String(s) => Some(s.clone()),
            DatabaseValue::Bytes(b) => Some(format!("{:?}", b)),
            DatabaseValue::Uuid(u) => Some(u.to_string()),
            DatabaseValue::DateTime(dt) => Some(dt.to_rfc3339()),
            DatabaseValue::Date(d) => Some(d.to_string()),
            DatabaseValue::Time(t) => Some(t.to_string()),
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Int32(_) => "int32",
            DatabaseValue::Int64(_) => "int64",
            DatabaseValue::Float64(_) => "float64",
            DatabaseValue::String(_) => "string",
            DatabaseValue::Bytes(_) => "bytes",
            DatabaseValue::Uuid(_) => "uuid",
            DatabaseValue::DateTime(_) => "datetime",
            DatabaseValue::Date(_) => "date",
            DatabaseValue::Time(_) => "time",
            DatabaseValue::Json(_) => "json",
            DatabaseValue::Array(_) => "array",
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            DatabaseValue::Null => JsonValue::Null,
            DatabaseValue::Bool(b) => JsonValue::Bool(*b),
            DatabaseValue::Int32(i) => JsonValue::Number(serde_json::Number::from(*i)),
            DatabaseValue::Int64(i) => JsonValue::Number(serde_json::Number::from(*i)),
            DatabaseValue::Float64(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DatabaseValue::String(s) => JsonValue::String(s.clone()),
            DatabaseValue::Bytes(b) => JsonValue::Array(
                b.iter()
                    .map(|&x| JsonValue::Number(serde_json::Number::from(x)))
                    .collect(),
            ),
            DatabaseValue::Uuid(u) => JsonValue::String(u.to_string()),
            DatabaseValue::DateTime(dt) => JsonValue::String(dt.to_rfc3339()),
            DatabaseValue::Date(d) => JsonValue::String(d.to_string()),
            DatabaseValue::Time(t) => JsonValue::String(t.to_string()),
            DatabaseValue::Json(j) => j.clone(),
            DatabaseValue::Array(arr) => JsonValue::Array(arr.iter().map(|v| v.to_json()).collect()),
        }
    }

    /// Create DatabaseValue from JSON value
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => DatabaseValue::Null,
            JsonValue::Bool(b) => DatabaseValue::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DatabaseValue::Int64(i)
                } else if let Some(f) = n.as_f64() {
                    DatabaseValue::Float64(f)
                } else {
                    DatabaseValue::Null
                }
            }
            JsonValue::String(s) => DatabaseValue::String(s),
            JsonValue::Array(arr) => {
                DatabaseValue::Array(arr.into_iter().map(DatabaseValue::from_json).collect())
            }
            JsonValue::Object(_) => DatabaseValue::Json(json),
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int32(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<u32> for DatabaseValue {
    fn from(value: u32) -> Self {
        DatabaseValue::Int64(value as i64)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<&String> for DatabaseValue {
    fn from(value: &String) -> Self {
        DatabaseValue::String(value.clone())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Bytes(value)
    }
}

impl From<uuid::Uuid> for DatabaseValue {
    fn from(value: uuid::Uuid) -> Self {
        DatabaseValue::Uuid(value)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DatabaseValue {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        DatabaseValue::DateTime(value)
    }
}

impl From<chrono::NaiveDate> for DatabaseValue {
    fn from(value: chrono::NaiveDate) -> Self {
        DatabaseValue::Date(value)
    }
}

impl From<chrono::NaiveTime> for DatabaseValue {
    fn from(value: chrono::NaiveTime) -> Self {
        DatabaseValue::Time(value)
    }
}

impl From<JsonValue> for DatabaseValue {
    fn from(value: JsonValue) -> Self {
        DatabaseValue::Json(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// A raw result row: ordered column names with their values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<DatabaseValue>,
}

impl Row {
    /// Create a row from parallel column/value lists
    pub fn new(columns: Vec<String>, values: Vec<DatabaseValue>) -> ModelResult<Self> {
        if columns.len() != values.len() {
            return Err(ModelError::InvalidArgument(format!(
                "Row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Build a row from (column, value) pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        let mut row = Row::default();
        for (column, value) in pairs {
            row.columns.push(column.into());
            row.values.push(value.into());
        }
        row
    }

    /// Get a column value by name
    pub fn get(&self, name: &str) -> Option<&DatabaseValue> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| &self.values[idx])
    }

    /// Get a column value by index
    pub fn get_by_index(&self, index: usize) -> Option<&DatabaseValue> {
        self.values.get(index)
    }

    /// Get column names
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Get column count
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over (column, value) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.columns
            .iter()
            .map(|c| c.as_str())
            .zip(self.values.iter())
    }

    /// Convert row to a JSON object
    pub fn to_json(&self) -> JsonValue {
        let map = self
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        JsonValue::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_per_dialect() {
        assert_eq!(SqlDialect::PostgreSQL.parameter_placeholder(0), "$1");
        assert_eq!(SqlDialect::SQLite.parameter_placeholder(2), "?3");
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("postgres".parse::<SqlDialect>().unwrap(), SqlDialect::PostgreSQL);
        assert_eq!("SQLite".parse::<SqlDialect>().unwrap(), SqlDialect::SQLite);
        assert!("oracle".parse::<SqlDialect>().is_err());
    }

    #[test]
    fn test_scalar_classification() {
        assert!(DatabaseValue::Null.is_scalar());
        assert!(DatabaseValue::from("x").is_scalar());
        assert!(!DatabaseValue::Array(vec![]).is_scalar());
        assert!(!DatabaseValue::Json(serde_json::json!({"a": 1})).is_scalar());
    }

    #[test]
    fn test_match_key_unifies_integer_spellings() {
        assert_eq!(DatabaseValue::Int32(7).match_key(), DatabaseValue::Int64(7).match_key());
        assert_eq!(DatabaseValue::from("7").match_key(), Some("7".to_string()));
        assert_eq!(DatabaseValue::Null.match_key(), None);
    }

    #[test]
    fn test_row_access() {
        let row = Row::from_pairs([("id", DatabaseValue::Int64(1)), ("name", "Ann".into())]);
        assert_eq!(row.get("name"), Some(&DatabaseValue::String("Ann".into())));
        assert_eq!(row.get_by_index(0), Some(&DatabaseValue::Int64(1)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.to_json(), serde_json::json!({"id": 1, "name": "Ann"}));
    }

    #[test]
    fn test_row_new_rejects_mismatched_lengths() {
        let result = Row::new(vec!["a".into()], vec![]);
        assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
    }
}
