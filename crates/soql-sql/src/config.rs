//! SQL output configuration

use crate::builder::{PostgresBuilder, SqlBuilder, SqlServerBuilder};
use serde::{Deserialize, Serialize};
use soql_core::{Error, Result};

/// Target SQL engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    #[default]
    SqlServer,
    Postgres,
}

/// SQL output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Target engine
    pub dialect: Dialect,

    /// Quote table, column and alias names
    pub quote_identifiers: bool,

    /// Emit keywords in upper case
    pub uppercase_keywords: bool,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::SqlServer,
            quote_identifiers: false,
            uppercase_keywords: false,
        }
    }
}

impl SqlConfig {
    /// Create configuration for SQL Server
    pub fn for_sql_server() -> Self {
        Self {
            dialect: Dialect::SqlServer,
            ..Default::default()
        }
    }

    /// Create configuration for PostgreSQL
    pub fn for_postgres() -> Self {
        Self {
            dialect: Dialect::Postgres,
            quote_identifiers: true,
            ..Default::default()
        }
    }

    /// Parse a JSON configuration; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("invalid SQL configuration: {}", e)))
    }

    /// Empty builder for the configured dialect
    pub fn builder(&self) -> Box<dyn SqlBuilder> {
        match self.dialect {
            Dialect::SqlServer => Box::new(
                SqlServerBuilder::default()
                    .with_quoted_identifiers(self.quote_identifiers)
                    .with_uppercase_keywords(self.uppercase_keywords),
            ),
            Dialect::Postgres => Box::new(
                PostgresBuilder::default()
                    .with_quoted_identifiers(self.quote_identifiers)
                    .with_uppercase_keywords(self.uppercase_keywords),
            ),
        }
    }
}
