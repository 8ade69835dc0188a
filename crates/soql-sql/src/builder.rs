//! SQL emission target
//!
//! The translator never formats SQL text itself. Tables, joins, columns,
//! literals and parameters all go through a [`SqlBuilder`], whose dialect
//! decides quoting and placeholder syntax.

use chrono::NaiveDateTime;
use soql_core::Value;
use std::fmt;

/// Join flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

impl JoinKind {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "inner join",
            JoinKind::LeftOuter => "left outer join",
        }
    }
}

/// `alias.column`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef<'a> {
    pub alias: &'a str,
    pub column: &'a str,
}

impl<'a> ColumnRef<'a> {
    pub fn new(alias: &'a str, column: &'a str) -> Self {
        Self { alias, column }
    }
}

/// Receiver of translated SQL
pub trait SqlBuilder {
    /// Append text verbatim
    fn emit_text(&mut self, text: &str);

    /// Append a keyword in the configured case
    fn emit_keyword(&mut self, keyword: &str);

    /// Append an identifier, quoted if configured
    fn emit_identifier(&mut self, name: &str);

    /// Append `table alias`
    fn emit_table(&mut self, table: &str, alias: &str);

    /// Append a join on `on_left = on_right`, extended by an optional
    /// restriction on the joined rows
    fn emit_join(
        &mut self,
        kind: JoinKind,
        table: &str,
        alias: &str,
        on_left: ColumnRef<'_>,
        on_right: ColumnRef<'_>,
        restriction: Option<&str>,
    );

    /// Append a literal value
    fn emit_literal(&mut self, value: &Value);

    /// Append the placeholder for positional parameter `index`
    fn emit_parameter(&mut self, index: usize);

    /// Append `alias.column`
    fn emit_column(&mut self, alias: &str, column: &str);

    /// A new, empty builder with the same dialect and options
    fn fragment(&self) -> Box<dyn SqlBuilder>;

    /// Text emitted so far
    fn sql(&self) -> &str;
}

/// Differences between SQL engines
pub trait SqlDialect: fmt::Debug {
    /// Name of the dialect
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, alias)
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Placeholder for positional parameter `index`
    fn parameter_placeholder(&self, index: usize) -> String;

    /// Boolean used as a value
    fn boolean_value(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    /// Date/time literal
    fn datetime_literal(&self, value: &NaiveDateTime) -> String {
        format!("'{}'", value.format("%Y%m%d %H:%M:%S"))
    }
}

// ========== SQL Server ==========

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl SqlDialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "SQL Server"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn parameter_placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }
}

// ========== PostgreSQL ==========

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn parameter_placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn boolean_value(&self, value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }
}

/// Single-quote a string, doubling embedded quotes
pub fn quote_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Builder accumulating SQL text for one dialect
#[derive(Debug, Clone)]
pub struct TextSqlBuilder<D> {
    dialect: D,
    quote_identifiers: bool,
    uppercase_keywords: bool,
    buffer: String,
}

pub type SqlServerBuilder = TextSqlBuilder<SqlServerDialect>;
pub type PostgresBuilder = TextSqlBuilder<PostgresDialect>;

impl<D: SqlDialect + Clone + 'static> TextSqlBuilder<D> {
    /// Builder with unquoted identifiers and lowercase keywords
    pub fn new(dialect: D) -> Self {
        Self {
            dialect,
            quote_identifiers: false,
            uppercase_keywords: false,
            buffer: String::new(),
        }
    }

    pub fn with_quoted_identifiers(mut self, quote: bool) -> Self {
        self.quote_identifiers = quote;
        self
    }

    pub fn with_uppercase_keywords(mut self, upper: bool) -> Self {
        self.uppercase_keywords = upper;
        self
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Take the emitted text
    pub fn into_sql(self) -> String {
        self.buffer
    }

    fn identifier(&self, name: &str) -> String {
        if self.quote_identifiers {
            self.dialect.quote_identifier(name)
        } else {
            name.to_string()
        }
    }

    fn keyword(&self, keyword: &str) -> String {
        if self.uppercase_keywords {
            keyword.to_uppercase()
        } else {
            keyword.to_string()
        }
    }

    fn column(&self, column: ColumnRef<'_>) -> String {
        format!(
            "{}.{}",
            self.identifier(column.alias),
            self.identifier(column.column)
        )
    }
}

impl Default for SqlServerBuilder {
    fn default() -> Self {
        Self::new(SqlServerDialect)
    }
}

impl Default for PostgresBuilder {
    fn default() -> Self {
        Self::new(PostgresDialect)
    }
}

impl<D: SqlDialect + Clone + 'static> SqlBuilder for TextSqlBuilder<D> {
    fn emit_text(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn emit_keyword(&mut self, keyword: &str) {
        let keyword = self.keyword(keyword);
        self.buffer.push_str(&keyword);
    }

    fn emit_identifier(&mut self, name: &str) {
        let name = self.identifier(name);
        self.buffer.push_str(&name);
    }

    fn emit_table(&mut self, table: &str, alias: &str) {
        let text = format!("{} {}", self.identifier(table), self.identifier(alias));
        self.buffer.push_str(&text);
    }

    fn emit_join(
        &mut self,
        kind: JoinKind,
        table: &str,
        alias: &str,
        on_left: ColumnRef<'_>,
        on_right: ColumnRef<'_>,
        restriction: Option<&str>,
    ) {
        let mut condition = format!("{} = {}", self.column(on_left), self.column(on_right));
        if let Some(restriction) = restriction {
            condition.push_str(&format!(" {} {}", self.keyword("and"), restriction));
        }
        let text = format!(
            " {} {} {} {} ({})",
            self.keyword(kind.keyword()),
            self.identifier(table),
            self.identifier(alias),
            self.keyword("on"),
            condition
        );
        self.buffer.push_str(&text);
    }

    fn emit_literal(&mut self, value: &Value) {
        let text = match value {
            Value::Null => self.keyword("null"),
            Value::Boolean(b) => self.dialect.boolean_value(*b).to_string(),
            Value::String(s) => quote_string(s),
            Value::DateTime(dt) => self.dialect.datetime_literal(dt),
            other => other.to_string(),
        };
        self.buffer.push_str(&text);
    }

    fn emit_parameter(&mut self, index: usize) {
        let placeholder = self.dialect.parameter_placeholder(index);
        self.buffer.push_str(&placeholder);
    }

    fn emit_column(&mut self, alias: &str, column: &str) {
        let text = self.column(ColumnRef::new(alias, column));
        self.buffer.push_str(&text);
    }

    fn fragment(&self) -> Box<dyn SqlBuilder> {
        Box::new(Self {
            dialect: self.dialect.clone(),
            quote_identifiers: self.quote_identifiers,
            uppercase_keywords: self.uppercase_keywords,
            buffer: String::new(),
        })
    }

    fn sql(&self) -> &str {
        &self.buffer
    }
}
