//! Parameter binding buckets
//!
//! Values are appended to one bucket per clause while a statement is compiled
//! and concatenated in a fixed order at the end. Placeholders reference their
//! value by position in that concatenated list.

use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};

/// Clause bucket a bound value belongs to, in linearization order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Cte,
    MutationSet,
    Where,
    Join,
    Having,
    Union,
    SelectSubquery,
    Order,
}

impl Bucket {
    /// All buckets in the order they are linearized
    pub const ALL: [Bucket; 8] = [
        Bucket::Cte,
        Bucket::MutationSet,
        Bucket::Where,
        Bucket::Join,
        Bucket::Having,
        Bucket::Union,
        Bucket::SelectSubquery,
        Bucket::Order,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Bucket::Cte => "cte",
            Bucket::MutationSet => "mutation_set",
            Bucket::Where => "where",
            Bucket::Join => "join",
            Bucket::Having => "having",
            Bucket::Union => "union",
            Bucket::SelectSubquery => "select_subquery",
            Bucket::Order => "order",
        }
    }
}

/// Collects bound values per bucket and linearizes them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingAggregator {
    buckets: [Vec<DatabaseValue>; 8],
}

impl BindingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to a bucket, returning its position within the bucket.
    ///
    /// Only scalars (and NULL) can be bound. A non-scalar in a WHERE or HAVING
    /// predicate is a configuration error; anywhere else it is an invalid
    /// argument.
    pub fn push(&mut self, bucket: Bucket, value: DatabaseValue) -> ModelResult<usize> {
        if !value.is_scalar() {
            let message = format!(
                "Cannot bind a {} value in the {} clause",
                value.type_name(),
                bucket.name()
            );
            return Err(match bucket {
                Bucket::Where | Bucket::Having => ModelError::Configuration(message),
                _ => ModelError::InvalidArgument(message),
            });
        }

        let values = &mut self.buckets[bucket.index()];
        values.push(value);
        Ok(values.len() - 1)
    }

    /// Values currently held by one bucket
    pub fn bucket(&self, bucket: Bucket) -> &[DatabaseValue] {
        &self.buckets[bucket.index()]
    }

    /// Start of a bucket inside the linearized list
    pub fn offset(&self, bucket: Bucket) -> usize {
        self.buckets[..bucket.index()].iter().map(Vec::len).sum()
    }

    /// Linearized position of the value at `index` within `bucket`
    pub fn position(&self, bucket: Bucket, index: usize) -> usize {
        self.offset(bucket) + index
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Concatenate every bucket in the fixed order
    pub fn linearize(&self) -> Vec<DatabaseValue> {
        let mut values = Vec::with_capacity(self.len());
        for bucket in Bucket::ALL {
            values.extend(self.bucket(bucket).iter().cloned());
        }
        values
    }

    /// Consume the aggregator into its linearized list
    pub fn into_linearized(self) -> Vec<DatabaseValue> {
        self.buckets.into_iter().flatten().collect()
    }

    pub fn clear(&mut self) {
        for values in self.buckets.iter_mut() {
            values.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linearize_uses_fixed_bucket_order() {
        let mut bindings = BindingAggregator::new();
        bindings.push(Bucket::Order, "o".into()).unwrap();
        bindings.push(Bucket::Where, "w".into()).unwrap();
        bindings.push(Bucket::MutationSet, "s".into()).unwrap();
        bindings.push(Bucket::Cte, "c".into()).unwrap();
        bindings.push(Bucket::Having, "h".into()).unwrap();

        let values: Vec<_> = bindings
            .linearize()
            .into_iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert_eq!(values, vec!["c", "s", "w", "h", "o"]);
        assert_eq!(bindings.clone().into_linearized(), bindings.linearize());
    }

    #[test]
    fn test_positions_account_for_earlier_buckets() {
        let mut bindings = BindingAggregator::new();
        let w = bindings.push(Bucket::Where, 1.into()).unwrap();
        let s0 = bindings.push(Bucket::MutationSet, 2.into()).unwrap();
        let s1 = bindings.push(Bucket::MutationSet, 3.into()).unwrap();

        assert_eq!(bindings.position(Bucket::MutationSet, s0), 0);
        assert_eq!(bindings.position(Bucket::MutationSet, s1), 1);
        assert_eq!(bindings.position(Bucket::Where, w), 2);
        assert_eq!(bindings.offset(Bucket::Order), 3);
    }

    #[test]
    fn test_non_scalar_values_are_rejected_per_bucket() {
        let mut bindings = BindingAggregator::new();
        let array = DatabaseValue::Array(vec![1.into()]);

        assert!(matches!(
            bindings.push(Bucket::Where, array.clone()),
            Err(ModelError::Configuration(_))
        ));
        assert!(matches!(
            bindings.push(Bucket::Having, array.clone()),
            Err(ModelError::Configuration(_))
        ));
        assert!(matches!(
            bindings.push(Bucket::MutationSet, array),
            Err(ModelError::InvalidArgument(_))
        ));
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_clear_resets_all_buckets() {
        let mut bindings = BindingAggregator::new();
        bindings.push(Bucket::Join, DatabaseValue::Null).unwrap();
        bindings.clear();
        assert_eq!(bindings.len(), 0);
    }
}
