//! Error types for SOQL
//!
//! Every stage of the pipeline (lexing, parsing, schema resolution,
//! evaluation, SQL translation) reports failures through this one enum.

use thiserror::Error;

/// The main error type for SOQL operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ========== Front-end Errors ==========
    #[error("Invalid token '{character}' at position {position}")]
    Lex { character: char, position: usize },

    #[error("Syntax error at position {position}: expected {expected}, found {found}")]
    Syntax {
        expected: String,
        found: String,
        position: usize,
    },

    // ========== Schema Errors ==========
    #[error("Schema resolution error: {0}")]
    SchemaResolution(String),

    // ========== Evaluation Errors ==========
    #[error("Type error: {0}")]
    Type(String),

    #[error("Operation not supported: {0}")]
    UnsupportedOperation(String),

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for SOQL operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a syntax error from anything printable
    pub fn syntax(expected: impl Into<String>, found: impl Into<String>, position: usize) -> Self {
        Error::Syntax {
            expected: expected.into(),
            found: found.into(),
            position,
        }
    }

    /// Build a type error describing an operator and its operand types
    pub fn type_mismatch(op: &str, left: &str, right: &str) -> Self {
        Error::Type(format!(
            "operator '{}' cannot be applied to {} and {}",
            op, left, right
        ))
    }

    /// Returns true if this error came from the lexer or the parser
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::Lex { .. } | Error::Syntax { .. })
    }

    /// Source position for front-end errors
    pub fn position(&self) -> Option<usize> {
        match self {
            Error::Lex { position, .. } | Error::Syntax { position, .. } => Some(*position),
            _ => None,
        }
    }
}
