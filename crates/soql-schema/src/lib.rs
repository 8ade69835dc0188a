//! SOQL Schema Catalog
//!
//! Describes the object model queries are written against.
//!
//! # Overview
//!
//! The schema catalog provides:
//! - Class definitions with their backing tables and primary keys
//! - Scalar and reference fields
//! - One-to-many and many-to-many collections
//! - Single-table inheritance with discriminator (selector) values

pub mod catalog;
pub mod schema;

pub use catalog::SchemaCatalog;
pub use schema::{ClassInfo, CollectionInfo, CollectionKind, FieldInfo, FieldType, Schema};
