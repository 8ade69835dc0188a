//! SOQL SQL Backend
//!
//! Translates parsed SOQL queries into SQL for a relational store.
//!
//! # Overview
//!
//! - `builder` - Emission target trait and the SQL Server / PostgreSQL dialects
//! - `config` - Output configuration (dialect, quoting, keyword case)
//! - `translate` - Scoped translator: join aliasing, inheritance filters and
//!   correlated collection subqueries

pub mod builder;
pub mod config;
pub mod translate;

pub use builder::{
    ColumnRef, JoinKind, PostgresBuilder, PostgresDialect, SqlBuilder, SqlDialect,
    SqlServerBuilder, SqlServerDialect, TextSqlBuilder, quote_string,
};
pub use config::{Dialect, SqlConfig};
pub use translate::{translate, translate_where};

use soql_core::Result;
use soql_query::Query;
use soql_schema::SchemaCatalog;

/// Translate `query` into a SQL string using `config`
pub fn to_sql<S: SchemaCatalog + ?Sized>(
    query: &Query,
    schema: &S,
    config: &SqlConfig,
) -> Result<String> {
    let mut builder = config.builder();
    translate(query, schema, builder.as_mut())?;
    Ok(builder.sql().to_string())
}
