//! Soft-delete scoping for model queries
//!
//! Queries against a model that uses soft deletes exclude rows whose
//! deleted-at column is set, unless the scope is widened.

use super::builder::QueryBuilder;
use super::types::*;

impl QueryBuilder {
    /// Include soft-deleted rows
    pub fn with_trashed(mut self) -> Self {
        self.soft_delete_scope = SoftDeleteScope::WithTrashed;
        self
    }

    /// Only soft-deleted rows
    pub fn only_trashed(mut self) -> Self {
        self.soft_delete_scope = SoftDeleteScope::OnlyTrashed;
        self
    }

    /// Restore the default scope (exclude soft-deleted rows)
    pub fn without_trashed(mut self) -> Self {
        self.soft_delete_scope = SoftDeleteScope::Default;
        self
    }

    pub fn soft_delete_scope(&self) -> SoftDeleteScope {
        self.soft_delete_scope
    }

    /// Predicate implied by the scope, qualified with the table reference
    pub(crate) fn soft_delete_predicate(&self) -> Option<Predicate> {
        let schema = self.model.as_ref()?;
        if !schema.soft_deletes {
            return None;
        }

        let column = format!("{}.{}", self.table_reference(), schema.deleted_at_column);
        match self.soft_delete_scope {
            SoftDeleteScope::Default => Some(Predicate::Null {
                column,
                negated: false,
            }),
            SoftDeleteScope::OnlyTrashed => Some(Predicate::Null {
                column,
                negated: true,
            }),
            SoftDeleteScope::WithTrashed => None,
        }
    }
}
