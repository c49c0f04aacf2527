//! # strata-orm: embedded ORM core
//!
//! Fluent query state compiled into parameterized SQL, relationship
//! descriptors, eager loading and correlated aggregate subqueries, executed
//! through a synchronous [`Connection`](backends::Connection).
//!
//! ```no_run
//! use strata_orm::prelude::*;
//!
//! # fn demo(conn: &mut SqliteConnection) -> ModelResult<()> {
//! let users = QueryBuilder::table("users")
//!     .where_eq("active", true)
//!     .order_by("name")
//!     .get_rows(conn)?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod relationships;
pub mod sql;
pub mod transaction;

pub use backends::{Connection, DatabaseValue, ExecuteResult, Row, SqlDialect, SqliteConnection};
pub use config::OrmConfig;
pub use error::{ModelError, ModelResult, OrmError, OrmResult};
pub use model::{Entity, Existence, Model, ModelSchema, RelationValue};
pub use query::{Page, QueryBuilder};
pub use transaction::{transaction, transaction_with, IsolationLevel, TransactionConfig};

pub mod prelude {
    pub use crate::backends::{Connection, DatabaseValue, SqliteConnection};
    pub use crate::config::OrmConfig;
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::model::{
        AttributeDef, AttributeTransform, Entity, Existence, Model, ModelRef, RelationValue,
    };
    pub use crate::query::{PredicateBuilder, QueryBuilder};
    pub use crate::relationships::{
        EagerLoadStrategy, ModelRegistry, RelationshipConstraintBuilder, RelationshipDescriptor,
    };
    pub use crate::transaction::transaction;
}
