//! `queryapi-db`: the query executor contract routes are bound to.
//!
//! The API layer never talks to a database directly: it forwards a SQL string
//! and positional parameters to a [`QueryExecutor`] supplied by the caller.

pub mod executor;
pub mod in_memory;
pub mod postgres;
pub mod sql;

pub use executor::{DbError, DbResult, FnExecutor, QueryExecutor};
pub use in_memory::{RecordedQuery, StaticExecutor};
pub use postgres::PgExecutor;
pub use sql::{QueryOutput, Row, SqlParam, SqlType, WriteSummary};
