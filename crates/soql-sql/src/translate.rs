//! SOQL to SQL translation
//!
//! Each query level owns a scope. Its from classes take the first table
//! aliases (`t0`, `t1`, ...), and every distinct reference prefix reached
//! from an alias gets exactly one left outer join. Nested levels use the
//! next prefix letter (`u`, then `v`, ...), so a correlated subquery can
//! always name the enclosing rows.
//!
//! Classes that take part in an inheritance hierarchy are narrowed to their
//! concrete selector values: in the where clause for from classes and in
//! the join condition for joined ones.

use crate::builder::{ColumnRef, JoinKind, SqlBuilder};
use soql_core::{Error, Result, Value};
use soql_query::{
    ArithmeticOp, Expr, ExprVisitor, JoinStep, PathExpr, Query, RelationalOp, resolve_references,
};
use soql_schema::{CollectionKind, SchemaCatalog};
use std::collections::HashMap;
use tracing::{debug, trace};

const ALIAS_PREFIXES: [&str; 7] = ["t", "u", "v", "w", "x", "y", "z"];

/// Translate a query, appending the SQL to `builder`
pub fn translate<S: SchemaCatalog + ?Sized>(
    query: &Query,
    schema: &S,
    builder: &mut dyn SqlBuilder,
) -> Result<()> {
    let mut translator = Translator::new(schema, builder.fragment());
    translator.query(query)?;
    debug!("Translated query over {} from classes", query.from.len());
    builder.emit_text(translator.out.sql());
    Ok(())
}

/// Translate `select * from class where condition`
pub fn translate_where<S: SchemaCatalog + ?Sized>(
    class: &str,
    condition: &Expr,
    schema: &S,
    builder: &mut dyn SqlBuilder,
) -> Result<()> {
    let query = Query::select_all(class, Some(condition.clone()));
    translate(&query, schema, builder)
}

/// A table in a scope's from list
#[derive(Debug)]
struct Entry {
    /// None for association tables
    class: Option<String>,
    /// User alias
    name: Option<String>,
    alias: String,
    table: String,
}

/// A left outer join hanging off one entry
#[derive(Debug)]
struct Join {
    entry: usize,
    alias: String,
    table: String,
    owner_alias: String,
    owner_column: String,
    key_column: String,
    restriction: Option<String>,
}

#[derive(Debug)]
struct Scope {
    prefix: String,
    next_alias: usize,
    entries: Vec<Entry>,
    /// Entry unqualified paths start from
    root: usize,
    joins: Vec<Join>,
    /// `owner_alias.Field` to join alias
    join_aliases: HashMap<String, String>,
}

impl Scope {
    fn new(depth: usize) -> Self {
        let prefix = ALIAS_PREFIXES
            .get(depth)
            .map(|p| p.to_string())
            .unwrap_or_else(|| format!("s{}_", depth));
        Self {
            prefix,
            next_alias: 0,
            entries: Vec::new(),
            root: 0,
            joins: Vec::new(),
            join_aliases: HashMap::new(),
        }
    }

    fn allocate(&mut self) -> String {
        let alias = format!("{}{}", self.prefix, self.next_alias);
        self.next_alias += 1;
        alias
    }

    fn add_entry(&mut self, class: Option<&str>, name: Option<&str>, table: &str) -> String {
        let alias = self.allocate();
        self.entries.push(Entry {
            class: class.map(str::to_string),
            name: name.map(str::to_string),
            alias: alias.clone(),
            table: table.to_string(),
        });
        alias
    }

    /// Entry named by a user alias or, failing that, by its class
    fn find_entry(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name.as_deref() == Some(name))
            .or_else(|| {
                self.entries
                    .iter()
                    .position(|e| e.name.is_none() && e.class.as_deref() == Some(name))
            })
    }
}

/// Row an object path lands on
struct ObjectRef {
    alias: String,
    class: String,
}

#[derive(Default)]
struct Clauses {
    select: String,
    where_clause: Option<String>,
    group_by: Option<String>,
    having: Option<String>,
    order_by: Option<String>,
}

struct Translator<'s, S: ?Sized> {
    schema: &'s S,
    scopes: Vec<Scope>,
    out: Box<dyn SqlBuilder>,
}

impl<'s, S: SchemaCatalog + ?Sized> Translator<'s, S> {
    fn new(schema: &'s S, out: Box<dyn SqlBuilder>) -> Self {
        Self {
            schema,
            scopes: Vec::new(),
            out,
        }
    }

    fn text(&mut self, text: &str) {
        self.out.emit_text(text);
    }

    fn keyword(&mut self, keyword: &str) {
        self.out.emit_keyword(keyword);
    }

    /// Run `f` against an empty builder and return what it emitted
    fn with_fragment<F>(&mut self, f: F) -> Result<String>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let fragment = self.out.fragment();
        let saved = std::mem::replace(&mut self.out, fragment);
        let result = f(self);
        let fragment = std::mem::replace(&mut self.out, saved);
        result.map(|_| fragment.sql().to_string())
    }

    /// Run `f` with `scope` pushed, handing the scope back afterwards
    fn within<T, F>(&mut self, scope: Scope, f: F) -> Result<(Scope, T)>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.scopes.push(scope);
        let result = f(self);
        let scope = self
            .scopes
            .pop()
            .ok_or_else(|| Error::UnsupportedOperation("unbalanced query scopes".to_string()))?;
        result.map(|value| (scope, value))
    }

    fn column_text(&self, alias: &str, column: &str) -> String {
        let mut fragment = self.out.fragment();
        fragment.emit_column(alias, column);
        fragment.sql().to_string()
    }

    fn table_of(&self, class: &str) -> Result<String> {
        self.schema
            .table_of(class)
            .map(str::to_string)
            .ok_or_else(|| Error::SchemaResolution(format!("class '{}' has no table", class)))
    }

    fn key_column(&self, class: &str) -> Result<String> {
        self.schema
            .primary_key_of(class)
            .map(|field| field.column.clone())
            .ok_or_else(|| {
                Error::SchemaResolution(format!("class '{}' has no primary key", class))
            })
    }

    /// Condition keeping only rows of `class` and its concrete subclasses
    fn restriction(&self, alias: &str, class: &str) -> Result<Option<String>> {
        if !self.schema.has_subclassing(class) {
            return Ok(None);
        }
        let selector = self
            .schema
            .selector_field_of(class)
            .map(|field| field.column.clone())
            .ok_or_else(|| {
                Error::SchemaResolution(format!(
                    "class '{}' belongs to a hierarchy without a selector field",
                    class
                ))
            })?;

        let values = self.schema.selector_values_for(class);
        let mut fragment = self.out.fragment();
        if values.is_empty() {
            fragment.emit_text("(1=0)");
        } else {
            fragment.emit_column(alias, &selector);
            fragment.emit_text(" ");
            fragment.emit_keyword("in");
            fragment.emit_text(" (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    fragment.emit_text(", ");
                }
                fragment.emit_literal(value);
            }
            fragment.emit_text(")");
        }
        Ok(Some(fragment.sql().to_string()))
    }

    /// Scope, entry and number of leading segments naming that entry.
    ///
    /// A user alias of the current level comes first, then a field of the
    /// current root, then from entries of the enclosing levels.
    fn locate(&self, segments: &[&str]) -> Result<(usize, usize, usize)> {
        let current = self
            .scopes
            .len()
            .checked_sub(1)
            .ok_or_else(|| Error::UnsupportedOperation("path outside of a query".to_string()))?;
        let root = self.scopes[current].root;
        let Some(first) = segments.first() else {
            return Ok((current, root, 0));
        };

        let scope = &self.scopes[current];
        if let Some(entry) = scope.entries.iter().position(|e| {
            e.class.is_some() && e.name.as_deref() == Some(*first)
        }) {
            return Ok((current, entry, 1));
        }
        let root_has_field = scope
            .entries
            .get(root)
            .and_then(|e| e.class.as_deref())
            .is_some_and(|class| self.schema.find_field_by_name(class, first).is_some());
        if root_has_field {
            return Ok((current, root, 0));
        }

        for (index, scope) in self.scopes.iter().enumerate().rev() {
            if let Some(entry) = scope.find_entry(first) {
                if scope.entries[entry].class.is_some() {
                    return Ok((index, entry, 1));
                }
            }
        }
        Ok((current, root, 0))
    }

    /// Join along `path` and return the row it ends on
    fn resolve_object(&mut self, path: Option<&PathExpr>) -> Result<ObjectRef> {
        let segments = path.map(|p| p.segments()).unwrap_or_default();
        let (scope, entry, skip) = self.locate(&segments)?;

        let (mut alias, root) = {
            let found = &self.scopes[scope].entries[entry];
            let class = found.class.clone().ok_or_else(|| {
                Error::SchemaResolution("association table has no properties".to_string())
            })?;
            (found.alias.clone(), class)
        };

        let steps = resolve_references(self.schema, &root, &segments[skip..])?;
        for step in &steps {
            alias = self.ensure_join(scope, entry, &alias, step)?;
        }
        let class = steps
            .last()
            .map(|step| step.target_class.clone())
            .unwrap_or(root);
        Ok(ObjectRef { alias, class })
    }

    /// Alias of the row `step` points at, joining it on first use
    fn ensure_join(
        &mut self,
        scope: usize,
        entry: usize,
        owner_alias: &str,
        step: &JoinStep,
    ) -> Result<String> {
        let key = format!("{}.{}", owner_alias, step.field.name);
        if let Some(alias) = self.scopes[scope].join_aliases.get(&key) {
            return Ok(alias.clone());
        }

        let table = self.table_of(&step.target_class)?;
        let key_column = self.key_column(&step.target_class)?;
        let alias = self.scopes[scope].allocate();
        let restriction = self.restriction(&alias, &step.target_class)?;
        trace!("Joining {} as {}", step.prefix, alias);

        let target = &mut self.scopes[scope];
        target.join_aliases.insert(key, alias.clone());
        target.joins.push(Join {
            entry,
            alias: alias.clone(),
            table,
            owner_alias: owner_alias.to_string(),
            owner_column: step.field.column.clone(),
            key_column,
            restriction,
        });
        Ok(alias)
    }

    fn query(&mut self, query: &Query) -> Result<()> {
        if query.from.is_empty() {
            return Err(Error::SchemaResolution("query has no from clause".to_string()));
        }

        let mut scope = Scope::new(self.scopes.len());
        let mut conditions = Vec::new();
        for item in &query.from {
            self.schema.require_class(&item.class)?;
            let table = self.table_of(&item.class)?;
            let alias = scope.add_entry(Some(&item.class), item.alias.as_deref(), &table);
            conditions.extend(self.restriction(&alias, &item.class)?);
        }

        let (scope, clauses) = self.within(scope, |t| t.clauses(query))?;
        conditions.extend(clauses.where_clause);

        self.keyword("select");
        self.text(" ");
        if query.distinct {
            self.keyword("distinct");
            self.text(" ");
        }
        self.text(&clauses.select);
        self.text(" ");
        self.emit_from(&scope);
        self.emit_conditions(&conditions);
        if let Some(group_by) = clauses.group_by {
            self.text(" ");
            self.keyword("group by");
            self.text(" ");
            self.text(&group_by);
        }
        if let Some(having) = clauses.having {
            self.text(" ");
            self.keyword("having");
            self.text(" ");
            self.text(&having);
        }
        if let Some(order_by) = clauses.order_by {
            self.text(" ");
            self.keyword("order by");
            self.text(" ");
            self.text(&order_by);
        }
        Ok(())
    }

    /// Translate every clause inside the current scope
    fn clauses(&mut self, query: &Query) -> Result<Clauses> {
        let mut clauses = Clauses {
            select: self.with_fragment(|t| {
                for (i, item) in query.select.iter().enumerate() {
                    if i > 0 {
                        t.text(", ");
                    }
                    t.value(&item.expression)?;
                    if let Some(alias) = &item.alias {
                        t.text(" ");
                        t.keyword("as");
                        t.text(" ");
                        t.out.emit_identifier(alias);
                    }
                }
                Ok(())
            })?,
            ..Default::default()
        };

        if let Some(condition) = &query.where_clause {
            clauses.where_clause = Some(self.with_fragment(|t| t.predicate(condition))?);
        }
        if !query.group_by.is_empty() {
            clauses.group_by = Some(self.with_fragment(|t| t.list(&query.group_by))?);
        }
        if let Some(having) = &query.having {
            clauses.having = Some(self.with_fragment(|t| t.predicate(having))?);
        }
        if !query.order_by.is_empty() {
            clauses.order_by = Some(self.with_fragment(|t| {
                for (i, item) in query.order_by.iter().enumerate() {
                    if i > 0 {
                        t.text(", ");
                    }
                    t.value(&item.expression)?;
                    if !item.ascending {
                        t.text(" ");
                        t.keyword("desc");
                    }
                }
                Ok(())
            })?);
        }
        Ok(clauses)
    }

    fn list(&mut self, items: &[Expr]) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.text(", ");
            }
            self.value(item)?;
        }
        Ok(())
    }

    /// An operand used as a value: boolean literals become `1`/`0`
    fn value(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::BooleanLiteral(b) => {
                self.out.emit_literal(&Value::Boolean(*b));
                Ok(())
            }
            other => other.accept(self),
        }
    }

    /// An operand used as a condition: host-typed values compare to true
    fn predicate(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Path(_) | Expr::Parameter { .. } | Expr::Function { .. } => {
                self.text("(");
                expr.accept(self)?;
                self.text(" = ");
                self.out.emit_literal(&Value::Boolean(true));
                self.text(")");
                Ok(())
            }
            other => other.accept(self),
        }
    }

    /// `from table alias [joins], ...`
    fn emit_from(&mut self, scope: &Scope) {
        self.keyword("from");
        self.text(" ");
        for (i, entry) in scope.entries.iter().enumerate() {
            if i > 0 {
                self.text(", ");
            }
            self.out.emit_table(&entry.table, &entry.alias);
            for join in scope.joins.iter().filter(|j| j.entry == i) {
                self.out.emit_join(
                    JoinKind::LeftOuter,
                    &join.table,
                    &join.alias,
                    ColumnRef::new(&join.owner_alias, &join.owner_column),
                    ColumnRef::new(&join.alias, &join.key_column),
                    join.restriction.as_deref(),
                );
            }
        }
    }

    fn emit_conditions(&mut self, conditions: &[String]) {
        if conditions.is_empty() {
            return;
        }
        self.text(" ");
        self.keyword("where");
        self.text(" ");
        for (i, condition) in conditions.iter().enumerate() {
            if i > 0 {
                self.text(" ");
                self.keyword("and");
                self.text(" ");
            }
            self.text(condition);
        }
    }

    /// Correlated subquery over a collection: a count when `element` is
    /// None, otherwise an existence test
    fn collection(
        &mut self,
        path: Option<&PathExpr>,
        collection: &str,
        element: Option<&Expr>,
    ) -> Result<()> {
        let schema = self.schema;
        let owner = self.resolve_object(path)?;
        let info = schema.require_collection(&owner.class, collection)?;
        let owner_key = self.column_text(&owner.alias, &self.key_column(&owner.class)?);

        // A scalar element is a value of the enclosing row
        let scalar = match element {
            Some(e) if !e.is_boolean() => Some(self.with_fragment(|t| t.value(e))?),
            _ => None,
        };

        let mut scope = Scope::new(self.scopes.len());
        let mut conditions = Vec::new();
        let mut member: Option<(String, String)> = None;

        match &info.kind {
            CollectionKind::OneToMany {
                class,
                foreign_field,
            } => {
                let table = self.table_of(class)?;
                let alias = scope.add_entry(Some(class), None, &table);
                let foreign = schema.require_field(class, foreign_field)?;
                conditions.push(format!(
                    "{} = {}",
                    self.column_text(&alias, &foreign.column),
                    owner_key
                ));
                member = Some((alias, class.clone()));
            }
            CollectionKind::ManyToMany {
                element_class,
                association_table,
                owner_column,
                element_column,
            } => {
                let link = scope.add_entry(None, None, association_table);
                conditions.push(format!(
                    "{} = {}",
                    self.column_text(&link, owner_column),
                    owner_key
                ));
                if element.is_some() {
                    let table = self.table_of(element_class)?;
                    let alias = scope.add_entry(Some(element_class), None, &table);
                    scope.root = scope.entries.len() - 1;
                    conditions.push(format!(
                        "{} = {}",
                        self.column_text(&link, element_column),
                        self.column_text(&alias, &self.key_column(element_class)?)
                    ));
                    member = Some((alias, element_class.clone()));
                }
            }
        }

        if let Some((alias, class)) = &member {
            conditions.extend(self.restriction(alias, class)?);
            if let Some(value) = scalar {
                conditions.push(format!(
                    "{} = {}",
                    self.column_text(alias, &self.key_column(class)?),
                    value
                ));
            }
        }

        let (scope, predicate) = self.within(scope, |t| match element {
            Some(e) if e.is_boolean() => t.with_fragment(|t| e.accept(t)).map(Some),
            _ => Ok(None),
        })?;
        conditions.extend(predicate);

        if element.is_some() {
            self.keyword("exists");
            self.text("(");
            self.keyword("select");
            self.text(" * ");
        } else {
            self.text("(");
            self.keyword("select");
            self.text(" ");
            self.keyword("count");
            self.text("(*) ");
        }
        self.emit_from(&scope);
        self.emit_conditions(&conditions);
        self.text(")");
        Ok(())
    }

    fn binary_operator(
        &mut self,
        symbol: &str,
        left: &Expr,
        right: &Expr,
        operand: fn(&mut Self, &Expr) -> Result<()>,
    ) -> Result<()> {
        self.text("(");
        operand(self, left)?;
        self.text(" ");
        self.keyword(symbol);
        self.text(" ");
        operand(self, right)?;
        self.text(")");
        Ok(())
    }

    /// `case selector when value then 'Class' ... end`
    fn class_tag(&mut self, object: &ObjectRef) -> Result<()> {
        let schema = self.schema;
        let selector = if schema.has_subclassing(&object.class) {
            schema.selector_field_of(&object.class)
        } else {
            None
        };
        let Some(selector) = selector else {
            self.out.emit_literal(&Value::String(object.class.clone()));
            return Ok(());
        };

        let candidates: Vec<(Value, String)> = schema
            .find_class(&object.class)
            .into_iter()
            .chain(schema.subclasses_of(&object.class))
            .filter(|info| !info.is_abstract)
            .filter_map(|info| {
                info.subclass_selector_value
                    .clone()
                    .map(|value| (value, info.name.clone()))
            })
            .collect();
        if candidates.is_empty() {
            self.out.emit_literal(&Value::Null);
            return Ok(());
        }

        self.text("(");
        self.keyword("case");
        self.text(" ");
        self.out.emit_column(&object.alias, &selector.column);
        for (value, name) in &candidates {
            self.text(" ");
            self.keyword("when");
            self.text(" ");
            self.out.emit_literal(value);
            self.text(" ");
            self.keyword("then");
            self.text(" ");
            self.out.emit_literal(&Value::String(name.clone()));
        }
        self.text(" ");
        self.keyword("end");
        self.text(")");
        Ok(())
    }
}

fn is_null_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(Value::Null))
}

impl<S: SchemaCatalog + ?Sized> ExprVisitor for Translator<'_, S> {
    type Output = Result<()>;

    fn visit_literal(&mut self, value: &Value) -> Result<()> {
        self.out.emit_literal(value);
        Ok(())
    }

    fn visit_parameter(&mut self, index: usize, _modifier: Option<&str>) -> Result<()> {
        self.out.emit_parameter(index);
        Ok(())
    }

    fn visit_path(&mut self, path: &PathExpr) -> Result<()> {
        let object = self.resolve_object(path.left.as_deref())?;
        let field = self.schema.require_field(&object.class, &path.name)?;
        self.out.emit_column(&object.alias, &field.column);
        Ok(())
    }

    fn visit_binary(&mut self, op: ArithmeticOp, left: &Expr, right: &Expr) -> Result<()> {
        self.binary_operator(op.symbol(), left, right, Self::value)
    }

    fn visit_negate(&mut self, operand: &Expr) -> Result<()> {
        self.text("(-");
        self.value(operand)?;
        self.text(")");
        Ok(())
    }

    fn visit_function(&mut self, name: &str, args: &[Expr]) -> Result<()> {
        self.text(name);
        self.text("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.text(", ");
            }
            match arg {
                Expr::Asterisk(None) => self.text("*"),
                other => self.value(other)?,
            }
        }
        self.text(")");
        Ok(())
    }

    fn visit_raw(&mut self, text: &str) -> Result<()> {
        self.text(text);
        Ok(())
    }

    fn visit_query(&mut self, query: &Query) -> Result<()> {
        self.text("(");
        self.query(query)?;
        self.text(")");
        Ok(())
    }

    fn visit_and(&mut self, left: &Expr, right: &Expr) -> Result<()> {
        self.binary_operator("and", left, right, Self::predicate)
    }

    fn visit_or(&mut self, left: &Expr, right: &Expr) -> Result<()> {
        self.binary_operator("or", left, right, Self::predicate)
    }

    fn visit_not(&mut self, operand: &Expr) -> Result<()> {
        self.text("(");
        self.keyword("not");
        self.text(" ");
        self.predicate(operand)?;
        self.text(")");
        Ok(())
    }

    fn visit_relational(&mut self, op: RelationalOp, left: &Expr, right: &Expr) -> Result<()> {
        let null_test = match op {
            RelationalOp::Equal => Some(false),
            RelationalOp::NotEqual => Some(true),
            _ => None,
        };
        if let Some(negated) = null_test {
            if is_null_literal(right) {
                return self.visit_is_null(left, negated);
            }
            if is_null_literal(left) {
                return self.visit_is_null(right, negated);
            }
        }
        let symbol = match op {
            RelationalOp::Equal => "=",
            RelationalOp::NotEqual => "<>",
            RelationalOp::Like => "like",
            other => other.symbol(),
        };
        self.binary_operator(symbol, left, right, Self::value)
    }

    fn visit_in(&mut self, operand: &Expr, candidates: &[Expr]) -> Result<()> {
        if candidates.is_empty() {
            self.text("(1=0)");
            return Ok(());
        }
        self.text("(");
        self.value(operand)?;
        self.text(" ");
        self.keyword("in");
        self.text(" (");
        self.list(candidates)?;
        self.text("))");
        Ok(())
    }

    fn visit_is_null(&mut self, operand: &Expr, negated: bool) -> Result<()> {
        self.text("(");
        operand.accept(self)?;
        self.text(" ");
        self.keyword(if negated { "is not null" } else { "is null" });
        self.text(")");
        Ok(())
    }

    fn visit_boolean_literal(&mut self, value: bool) -> Result<()> {
        self.text(if value { "(1=1)" } else { "(1=0)" });
        Ok(())
    }

    fn visit_exists(&mut self, query: &Query) -> Result<()> {
        self.keyword("exists");
        self.text("(");
        self.query(query)?;
        self.text(")");
        Ok(())
    }

    fn visit_count(&mut self, path: Option<&PathExpr>, collection: &str) -> Result<()> {
        self.collection(path, collection, None)
    }

    fn visit_contains(
        &mut self,
        path: Option<&PathExpr>,
        collection: &str,
        element: &Expr,
    ) -> Result<()> {
        self.collection(path, collection, Some(element))
    }

    fn visit_asterisk(&mut self, path: Option<&PathExpr>) -> Result<()> {
        let object = self.resolve_object(path)?;
        self.out.emit_identifier(&object.alias);
        self.text(".*");
        Ok(())
    }

    fn visit_class_tag(&mut self, path: Option<&PathExpr>) -> Result<()> {
        let object = self.resolve_object(path)?;
        self.class_tag(&object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SqlServerBuilder;
    use crate::builder::quote_string;
    use crate::config::SqlConfig;
    use proptest::prelude::*;
    use soql_query::{parse_query, parse_where_clause};
    use soql_schema::{ClassInfo, CollectionInfo, FieldInfo, FieldType, Schema};

    fn schema() -> Schema {
        Schema::new()
            .with_class(
                ClassInfo::new("Contact", "contact")
                    .with_primary_key("Id", "id")
                    .with_field(FieldInfo::scalar("Name", "name", FieldType::String))
                    .with_field(FieldInfo::scalar("Age", "age", FieldType::Int32))
                    .with_field(FieldInfo::scalar("Active", "active", FieldType::Boolean))
                    .with_field(FieldInfo::reference("PrimaryGroup", "primary_group", "Group"))
                    .with_field(FieldInfo::reference("Group", "group_id", "Group"))
                    .with_field(FieldInfo::reference("Manager", "manager", "Contact"))
                    .with_collection(CollectionInfo::many_to_many(
                        "Vehicles",
                        "Vehicle",
                        "contact_vehicle",
                        "contact_id",
                        "vehicle_id",
                    )),
            )
            .with_class(
                ClassInfo::new("Group", "_group")
                    .with_primary_key("Id", "id")
                    .with_field(FieldInfo::scalar("Name", "name", FieldType::String))
                    .with_field(FieldInfo::reference("Manager", "manager", "Contact"))
                    .with_collection(CollectionInfo::one_to_many(
                        "Members",
                        "Contact",
                        "PrimaryGroup",
                    )),
            )
            .with_class(
                ClassInfo::new("Vehicle", "vehicle")
                    .with_primary_key("Id", "id")
                    .with_field(FieldInfo::scalar("Type", "type", FieldType::Int32))
                    .with_field(FieldInfo::scalar("Name", "name", FieldType::String))
                    .with_selector_field("Type")
                    .abstract_class(),
            )
            .with_class(ClassInfo::subclass("Car", "Vehicle").with_selector_value(1))
            .with_class(ClassInfo::subclass("Bike", "Vehicle").with_selector_value(2))
            .with_class(ClassInfo::subclass("MountainBike", "Bike").with_selector_value(3))
            .with_class(ClassInfo::subclass("Boat", "Vehicle").abstract_class())
            .with_class(
                ClassInfo::new("Garage", "garage")
                    .with_primary_key("Id", "id")
                    .with_field(FieldInfo::reference("Bike", "bike", "Bike")),
            )
    }

    fn sql(text: &str) -> String {
        let query = parse_query(text).unwrap();
        let mut builder = SqlServerBuilder::default();
        translate(&query, &schema(), &mut builder).unwrap();
        builder.into_sql()
    }

    fn sql_where(class: &str, condition: &str) -> String {
        let condition = parse_where_clause(condition).unwrap();
        let mut builder = SqlServerBuilder::default();
        translate_where(class, &condition, &schema(), &mut builder).unwrap();
        builder.into_sql()
    }

    fn failure(text: &str) -> Error {
        let query = parse_query(text).unwrap();
        let mut builder = SqlServerBuilder::default();
        translate(&query, &schema(), &mut builder).unwrap_err()
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(
            sql("select Name, Age from Contact where Age > 18 order by Name desc"),
            "select t0.name, t0.age from contact t0 where (t0.age > 18) order by t0.name desc"
        );
        assert_eq!(
            sql_where("Contact", "Name = 'it''s' and Age > {0}"),
            "select t0.* from contact t0 where ((t0.name = 'it''s') and (t0.age > @p0))"
        );
    }

    #[test]
    fn test_one_alias_per_prefix() {
        assert_eq!(
            sql("select PrimaryGroup.Id from Contact where PrimaryGroup.Name = 'x'"),
            "select t1.id from contact t0 left outer join _group t1 on (t0.primary_group = t1.id) \
             where (t1.name = 'x')"
        );
        assert_eq!(
            sql("select Name from Contact where PrimaryGroup.Manager.Name = 'Bob' and PrimaryGroup.Name = 'x'"),
            "select t0.name from contact t0 \
             left outer join _group t1 on (t0.primary_group = t1.id) \
             left outer join contact t2 on (t1.manager = t2.id) \
             where ((t2.name = 'Bob') and (t1.name = 'x'))"
        );
    }

    #[test]
    fn test_null_comparisons() {
        assert_eq!(
            sql_where("Contact", "Manager = null or null <> Name"),
            "select t0.* from contact t0 where ((t0.manager is null) or (t0.name is not null))"
        );
        assert_eq!(
            sql_where("Contact", "not (Name is null)"),
            "select t0.* from contact t0 where (not (t0.name is null))"
        );
    }

    #[test]
    fn test_literal_predicates() {
        assert_eq!(
            sql_where("Contact", "true and Age in ()"),
            "select t0.* from contact t0 where ((1=1) and (1=0))"
        );
        assert_eq!(
            sql_where("Contact", "Age in (1, 2) and Name like 'A%'"),
            "select t0.* from contact t0 where ((t0.age in (1, 2)) and (t0.name like 'A%'))"
        );
    }

    #[test]
    fn test_boolean_values() {
        assert_eq!(
            sql_where("Contact", "Active = true"),
            "select t0.* from contact t0 where (t0.active = 1)"
        );
        assert_eq!(
            sql_where("Contact", "Active in (true, false)"),
            "select t0.* from contact t0 where (t0.active in (1, 0))"
        );
        assert_eq!(
            sql_where("Contact", "Active <> false or true"),
            "select t0.* from contact t0 where ((t0.active <> 0) or (1=1))"
        );
    }

    #[test]
    fn test_boolean_operand_as_condition() {
        assert_eq!(
            sql_where("Contact", "Active"),
            "select t0.* from contact t0 where (t0.active = 1)"
        );
        assert_eq!(
            sql_where("Contact", "not Active and Age > 1"),
            "select t0.* from contact t0 where ((not (t0.active = 1)) and (t0.age > 1))"
        );
        assert_eq!(
            sql_where("Contact", "{0} or Active = {1}"),
            "select t0.* from contact t0 where ((@p0 = 1) or (t0.active = @p1))"
        );

        let condition = parse_where_clause("Active").unwrap();
        let mut builder = crate::builder::PostgresBuilder::default();
        translate_where("Contact", &condition, &schema(), &mut builder).unwrap();
        assert_eq!(builder.sql(), "select t0.* from contact t0 where (t0.active = true)");
    }

    #[test]
    fn test_inheritance_in_where() {
        assert_eq!(
            sql("select Name from Bike"),
            "select t0.name from vehicle t0 where t0.type in (2, 3)"
        );
        assert_eq!(
            sql("select Name from Car where Name = 'x'"),
            "select t0.name from vehicle t0 where t0.type in (1) and (t0.name = 'x')"
        );
        assert_eq!(
            sql("select Name from Boat"),
            "select t0.name from vehicle t0 where (1=0)"
        );
        assert_eq!(
            sql("select Name from Contact"),
            "select t0.name from contact t0"
        );
    }

    #[test]
    fn test_inheritance_in_join() {
        assert_eq!(
            sql("select Bike.Name from Garage"),
            "select t1.name from garage t0 \
             left outer join vehicle t1 on (t0.bike = t1.id and t1.type in (2, 3))"
        );
    }

    #[test]
    fn test_count_subquery() {
        assert_eq!(
            sql("select Name from Group where Members.Count > 2"),
            "select t0.name from _group t0 where \
             ((select count(*) from contact u0 where u0.primary_group = t0.id) > 2)"
        );
        assert_eq!(
            sql("select Name from Contact where PrimaryGroup.Members.Count > 1"),
            "select t0.name from contact t0 \
             left outer join _group t1 on (t0.primary_group = t1.id) where \
             ((select count(*) from contact u0 where u0.primary_group = t1.id) > 1)"
        );
        assert_eq!(
            sql("select Vehicles.Count from Contact"),
            "select (select count(*) from contact_vehicle u0 where u0.contact_id = t0.id) \
             from contact t0"
        );
    }

    #[test]
    fn test_contains_subquery() {
        assert_eq!(
            sql("select Name from Group where Members.Contains({0})"),
            "select t0.name from _group t0 where \
             exists(select * from contact u0 where u0.primary_group = t0.id and u0.id = @p0)"
        );
        assert_eq!(
            sql("select Name from Group where Members.Contains(Manager)"),
            "select t0.name from _group t0 where \
             exists(select * from contact u0 where u0.primary_group = t0.id and u0.id = t0.manager)"
        );
        assert_eq!(
            sql("select Name from Group where Members.Contains(Manager.Name = 'Bob')"),
            "select t0.name from _group t0 where \
             exists(select * from contact u0 left outer join contact u1 on (u0.manager = u1.id) \
             where u0.primary_group = t0.id and (u1.name = 'Bob'))"
        );
    }

    #[test]
    fn test_many_to_many_contains() {
        assert_eq!(
            sql("select Name from Contact where Vehicles.Contains(Name = 'Car')"),
            "select t0.name from contact t0 where \
             exists(select * from contact_vehicle u0, vehicle u1 \
             where u0.contact_id = t0.id and u0.vehicle_id = u1.id \
             and u1.type in (2, 1, 3) and (u1.name = 'Car'))"
        );
    }

    #[test]
    fn test_nested_levels_use_next_prefix() {
        assert_eq!(
            sql("select Name from Group where Members.Contains(Vehicles.Count > 0)"),
            "select t0.name from _group t0 where \
             exists(select * from contact u0 where u0.primary_group = t0.id and \
             ((select count(*) from contact_vehicle v0 where v0.contact_id = u0.id) > 0))"
        );
    }

    #[test]
    fn test_correlated_exists() {
        assert_eq!(
            sql("select Name from Contact c where exists(select * from Group g where g.Id = c.PrimaryGroup)"),
            "select t0.name from contact t0 where \
             exists(select u0.* from _group u0 where (u0.id = t0.primary_group))"
        );
        assert_eq!(
            sql("select Name from Contact where exists(Group where Manager.Name = 'Bob')"),
            "select t0.name from contact t0 where \
             exists(select u0.* from _group u0 left outer join contact u1 on (u0.manager = u1.id) \
             where (u1.name = 'Bob'))"
        );
    }

    #[test]
    fn test_field_shadows_outer_class() {
        assert_eq!(
            sql("select Name from Group where exists(Contact where Group.Name = 'x')"),
            "select t0.name from _group t0 where \
             exists(select u0.* from contact u0 left outer join _group u1 on (u0.group_id = u1.id) \
             where (u1.name = 'x'))"
        );
        assert_eq!(
            sql("select Name from Group g where exists(Contact where g.Name = Name)"),
            "select t0.name from _group t0 where \
             exists(select u0.* from contact u0 where (t0.name = u0.name))"
        );
        assert_eq!(
            sql("select Contact.Name from Contact"),
            "select t0.name from contact t0"
        );
    }

    #[test]
    fn test_outer_join_from_nested_scope() {
        assert_eq!(
            sql("select Name from Contact c where exists(select * from Group g where g.Name = c.Manager.Name)"),
            "select t0.name from contact t0 left outer join contact t1 on (t0.manager = t1.id) where \
             exists(select u0.* from _group u0 where (u0.name = t1.name))"
        );
    }

    #[test]
    fn test_class_tag() {
        assert_eq!(
            sql("select SoodaClass from Vehicle"),
            "select (case t0.type when 2 then 'Bike' when 1 then 'Car' when 3 then 'MountainBike' end) \
             from vehicle t0 where t0.type in (2, 1, 3)"
        );
        assert_eq!(
            sql("select SoodaClass from Contact"),
            "select 'Contact' from contact t0"
        );
    }

    #[test]
    fn test_functions_and_grouping() {
        assert_eq!(
            sql("select Name, count(*) as Total from Contact group by Name having count(*) > 1"),
            "select t0.name, count(*) as Total from contact t0 group by t0.name having (count(*) > 1)"
        );
        assert_eq!(
            sql("select distinct -Age + 1 from Contact"),
            "select distinct ((-t0.age) + 1) from contact t0"
        );
    }

    #[test]
    fn test_raw_passes_through() {
        assert_eq!(
            sql_where("Contact", "RAWQUERY(dbo.score(id) > 3)"),
            "select t0.* from contact t0 where dbo.score(id) > 3"
        );
    }

    #[test]
    fn test_multiple_from_classes() {
        assert_eq!(
            sql("select c.Name, g.Name from Contact c, Group g where c.PrimaryGroup = g.Id and g.Manager.Name = 'x'"),
            "select t0.name, t1.name from contact t0, _group t1 \
             left outer join contact t2 on (t1.manager = t2.id) \
             where ((t0.primary_group = t1.id) and (t2.name = 'x'))"
        );
    }

    #[test]
    fn test_configured_output() {
        let query = parse_query("select Name from Contact where Age > {1}").unwrap();
        let config = SqlConfig {
            uppercase_keywords: true,
            ..SqlConfig::for_postgres()
        };
        let mut builder = config.builder();
        translate(&query, &schema(), builder.as_mut()).unwrap();
        assert_eq!(
            builder.sql(),
            "SELECT \"t0\".\"name\" FROM \"contact\" \"t0\" WHERE (\"t0\".\"age\" > $2)"
        );
    }

    #[test]
    fn test_resolution_errors() {
        assert!(matches!(
            failure("select Salary from Contact"),
            Error::SchemaResolution(_)
        ));
        assert!(matches!(
            failure("select Name from Nobody"),
            Error::SchemaResolution(_)
        ));
        assert!(matches!(
            failure("select Name from Contact where Friends.Count > 1"),
            Error::SchemaResolution(_)
        ));
        assert!(matches!(
            failure("select Name from Contact where Name.First = 'x'"),
            Error::SchemaResolution(_)
        ));
    }

    proptest! {
        #[test]
        fn prop_string_literals_stay_quoted(text in "[ -~]{0,12}") {
            let condition = Expr::relational(
                RelationalOp::Equal,
                Expr::path("Name"),
                Expr::literal(text.as_str()),
            );
            let mut builder = SqlServerBuilder::default();
            translate_where("Contact", &condition, &schema(), &mut builder).unwrap();
            let expected = format!("where (t0.name = {})", quote_string(&text));
            prop_assert!(builder.sql().ends_with(&expected));
        }

        #[test]
        fn prop_repeated_prefix_joins_once(repeats in 1usize..6) {
            let condition = (0..repeats)
                .map(|i| Expr::relational(
                    RelationalOp::Greater,
                    Expr::path("PrimaryGroup.Manager.Age"),
                    Expr::literal(i as i32),
                ))
                .reduce(Expr::and)
                .unwrap();
            let mut builder = SqlServerBuilder::default();
            translate_where("Contact", &condition, &schema(), &mut builder).unwrap();
            prop_assert_eq!(builder.sql().matches("left outer join").count(), 2);
        }
    }
}
