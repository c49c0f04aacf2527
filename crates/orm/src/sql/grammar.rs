//! SQL grammar: identifier quoting and placeholder rendering
//!
//! Every table and column reference passes through [`Grammar::wrap`], so a
//! single quote character is applied consistently across the statement,
//! including joins and correlated subqueries.

use crate::backends::SqlDialect;
use crate::error::{ModelError, ModelResult};

/// Maximum identifier length accepted by the grammar (PostgreSQL's limit)
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Dialect-aware identifier quoting and placeholder rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grammar {
    dialect: SqlDialect,
    quote: char,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new(SqlDialect::default())
    }
}

impl Grammar {
    /// Create a grammar using the dialect's default quote character
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            quote: dialect.identifier_quote(),
        }
    }

    /// Override the identifier quote character
    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = quote;
        self
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn quote_char(&self) -> char {
        self.quote
    }

    /// Placeholder for a zero-based position in the linearized binding list
    pub fn placeholder(&self, index: usize) -> String {
        self.dialect.parameter_placeholder(index)
    }

    /// Quote a table reference. An empty reference is a configuration error.
    pub fn wrap_table(&self, table: &str) -> ModelResult<String> {
        if table.trim().is_empty() {
            return Err(ModelError::Configuration(
                "Table reference cannot be empty".to_string(),
            ));
        }
        self.wrap(table)
    }

    /// Quote a column or table reference.
    ///
    /// `table.column` is quoted segment by segment, `name AS alias` has each
    /// side quoted independently and `*` is passed through.
    pub fn wrap(&self, identifier: &str) -> ModelResult<String> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ModelError::InvalidArgument(
                "Identifier cannot be empty".to_string(),
            ));
        }

        if let Some(pos) = identifier.to_ascii_lowercase().find(" as ") {
            let (name, alias) = (&identifier[..pos], &identifier[pos + 4..]);
            return Ok(format!("{} AS {}", self.wrap(name)?, self.wrap_segment(alias.trim())?));
        }

        let segments = identifier
            .split('.')
            .map(|segment| self.wrap_segment(segment))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(segments.join("."))
    }

    /// Quote a single alias
    pub fn wrap_alias(&self, alias: &str) -> ModelResult<String> {
        self.wrap_segment(alias.trim())
    }

    /// Quote a list of columns and join them with commas
    pub fn columnize<S: AsRef<str>>(&self, columns: &[S]) -> ModelResult<String> {
        let wrapped = columns
            .iter()
            .map(|c| self.wrap(c.as_ref()))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(wrapped.join(", "))
    }

    fn wrap_segment(&self, segment: &str) -> ModelResult<String> {
        if segment == "*" {
            return Ok(segment.to_string());
        }
        validate_identifier(segment)?;

        let doubled = format!("{}{}", self.quote, self.quote);
        let escaped = segment.replace(self.quote, &doubled);
        Ok(format!("{}{}{}", self.quote, escaped, self.quote))
    }
}

/// Validate a single identifier segment
pub fn validate_identifier(identifier: &str) -> ModelResult<()> {
    if identifier.is_empty() {
        return Err(ModelError::InvalidArgument(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if identifier.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ModelError::InvalidArgument(format!(
            "Identifier '{}' is too long (max {} characters)",
            identifier, MAX_IDENTIFIER_LENGTH
        )));
    }

    if let Some(c) = identifier
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(ModelError::InvalidArgument(format!(
            "Identifier '{}' contains invalid character '{}'",
            identifier, c
        )));
    }

    if identifier.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ModelError::InvalidArgument(format!(
            "Identifier '{}' cannot start with a number",
            identifier
        )));
    }

    Ok(())
}
