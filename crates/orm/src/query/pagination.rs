//! Query Builder pagination operations

use super::builder::QueryBuilder;
use crate::error::ModelError;

impl QueryBuilder {
    /// Add LIMIT clause
    pub fn limit(mut self, count: i64) -> Self {
        self.limit_count = Some(count);
        self
    }

    /// Add OFFSET clause
    pub fn offset(mut self, count: i64) -> Self {
        self.offset_value = Some(count);
        self
    }

    /// LIMIT + OFFSET for a 1-based page
    ///
    /// An offset past `i64::MAX` is reported when the query is compiled.
    pub fn for_page(mut self, page: i64, per_page: i64) -> Self {
        match page_offset(page, per_page) {
            Some(offset) => {
                self.limit_count = Some(per_page);
                self.offset_value = Some(offset);
            }
            None => self.defer_error(ModelError::InvalidArgument(format!(
                "Page {} of size {} is out of range",
                page, per_page
            ))),
        }
        self
    }
}

/// Row offset of a 1-based page, `None` on overflow
pub(crate) fn page_offset(page: i64, per_page: i64) -> Option<i64> {
    (page.max(1) - 1).checked_mul(per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_page_computes_offset() {
        let query = QueryBuilder::table("users").for_page(3, 20);
        assert_eq!(query.get_limit(), Some(20));
        assert_eq!(query.get_offset(), Some(40));

        let query = QueryBuilder::table("users").for_page(0, 20);
        assert_eq!(query.get_offset(), Some(0));
    }

    #[test]
    fn test_for_page_overflow_fails_at_compile() {
        let result = QueryBuilder::table("users").for_page(i64::MAX, 10).to_sql();
        assert!(matches!(result, Err(ModelError::InvalidArgument(_))));

        let query = QueryBuilder::table("users").for_page(i64::MAX, 1);
        assert_eq!(query.get_offset(), Some(i64::MAX - 1));
    }
}
