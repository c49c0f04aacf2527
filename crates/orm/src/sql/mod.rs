//! SQL Generation
//!
//! Identifier quoting, parameter binding buckets and the compiler that turns
//! query state into a parameterized statement.

pub mod bindings;
pub mod compiler;
pub mod grammar;

pub use bindings::{BindingAggregator, Bucket};
pub use compiler::{CompiledQuery, QueryCompiler};
pub use grammar::Grammar;
