//! SOQL Core Library
//!
//! This crate provides the value model and error handling shared by every
//! stage of the SOQL object query language.
//!
//! # Modules
//!
//! - `value` - Typed scalar values and the numeric promotion ladder
//! - `error` - Error types and result aliases

pub mod error;
pub mod value;

pub use error::{Error, Result};
pub use value::{NumericRank, Value};
