//! Database Backend Abstractions
//!
//! The [`Connection`] trait is the only boundary the ORM core executes
//! through. SQLite is always available; the PostgreSQL adapter is behind the
//! `postgres` feature.

pub mod core;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sqlite;

pub use core::*;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnection;
pub use sqlite::SqliteConnection;
