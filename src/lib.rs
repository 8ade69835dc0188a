//! SOQL - Embeddable object query language
//!
//! This is the main library crate that re-exports all SOQL components.

pub use soql_core as core;
pub use soql_query as query;
pub use soql_schema as schema;
pub use soql_sql as sql;

// Re-export commonly used types
pub use soql_core::{Error, Result, Value};

pub use soql_query::{
    EvaluationContext, Expr, InMemoryContext, MemoryObject, ObjectId, Query, evaluate,
    evaluate_condition, involved_classes, involved_classes_of_query, matches, parse_expression,
    parse_query, parse_where_clause, simplify, simplify_query,
};
pub use soql_schema::{ClassInfo, CollectionInfo, FieldInfo, FieldType, Schema, SchemaCatalog};
pub use soql_sql::{Dialect, SqlBuilder, SqlConfig, to_sql, translate, translate_where};
