//! Class-involvement analysis
//!
//! Computes the set of schema classes an expression reads, so callers can
//! tell which cached results a change to a class invalidates.

use crate::ast::{ArithmeticOp, Expr, FromItem, PathExpr, Query, RelationalOp};
use crate::resolve::resolve_references;
use crate::visitor::ExprVisitor;
use soql_core::{Error, Result, Value};
use soql_schema::SchemaCatalog;
use std::collections::BTreeSet;
use tracing::debug;

/// Classes touched by `expr` when evaluated against objects of `root`
pub fn involved_classes<S: SchemaCatalog + ?Sized>(
    expr: &Expr,
    root: &str,
    schema: &S,
) -> Result<BTreeSet<String>> {
    let mut analyzer = ClassAnalyzer::new(schema, root);
    expr.accept(&mut analyzer)?;
    debug!("Expression touches {} classes", analyzer.classes.len());
    Ok(analyzer.classes)
}

/// Classes touched by every clause of a query
pub fn involved_classes_of_query<S: SchemaCatalog + ?Sized>(
    query: &Query,
    schema: &S,
) -> Result<BTreeSet<String>> {
    let root = query
        .root_class()
        .ok_or_else(|| Error::SchemaResolution("query has no from clause".to_string()))?;
    let mut analyzer = ClassAnalyzer::new(schema, root);
    analyzer.query(query)?;
    Ok(analyzer.classes)
}

/// One query level: the class unqualified paths start from and the from
/// entries a qualified path may name
struct Frame {
    root: String,
    entries: Vec<FromItem>,
}

impl Frame {
    fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            entries: Vec::new(),
        }
    }

    fn aliased(&self, name: &str) -> Option<&FromItem> {
        self.entries.iter().find(|e| e.alias.as_deref() == Some(name))
    }

    /// Entry named by a user alias or, failing that, by its class
    fn named(&self, name: &str) -> Option<&FromItem> {
        self.aliased(name).or_else(|| {
            self.entries
                .iter()
                .find(|e| e.alias.is_none() && e.class == name)
        })
    }
}

struct ClassAnalyzer<'s, S: SchemaCatalog + ?Sized> {
    schema: &'s S,
    frames: Vec<Frame>,
    classes: BTreeSet<String>,
}

impl<'s, S: SchemaCatalog + ?Sized> ClassAnalyzer<'s, S> {
    fn new(schema: &'s S, root: &str) -> Self {
        Self {
            schema,
            frames: vec![Frame::new(root)],
            classes: BTreeSet::new(),
        }
    }

    /// Class a path starts from and how many leading segments name it
    fn locate(&self, segments: &[&str]) -> Result<(String, usize)> {
        let frame = self
            .frames
            .last()
            .ok_or_else(|| Error::UnsupportedOperation("path outside of a query".to_string()))?;
        let Some(first) = segments.first() else {
            return Ok((frame.root.clone(), 0));
        };
        if let Some(item) = frame.aliased(first) {
            return Ok((item.class.clone(), 1));
        }
        if self.schema.find_field_by_name(&frame.root, first).is_some() {
            return Ok((frame.root.clone(), 0));
        }
        if let Some(item) = self.frames.iter().rev().find_map(|f| f.named(first)) {
            return Ok((item.class.clone(), 1));
        }
        Ok((frame.root.clone(), 0))
    }

    /// Add the starting class and every class reached through `path`;
    /// returns the class `path` points at
    fn add_prefix(&mut self, path: Option<&PathExpr>) -> Result<String> {
        let segments = path.map(|p| p.segments()).unwrap_or_default();
        let (start, skip) = self.locate(&segments)?;
        self.schema.require_class(&start)?;
        self.classes.insert(start.clone());

        let steps = resolve_references(self.schema, &start, &segments[skip..])?;
        for step in &steps {
            self.classes.insert(step.target_class.clone());
        }
        Ok(steps
            .last()
            .map(|step| step.target_class.clone())
            .unwrap_or(start))
    }

    /// Add the owner and element classes of a collection
    fn add_collection(&mut self, path: Option<&PathExpr>, collection: &str) -> Result<String> {
        let owner = self.add_prefix(path)?;
        let info = self.schema.require_collection(&owner, collection)?;
        let element = info.element_class().to_string();
        self.classes.insert(element.clone());
        Ok(element)
    }

    /// Analyze `exprs` one level down, sharing the result set
    fn within<'e>(&mut self, frame: Frame, exprs: impl IntoIterator<Item = &'e Expr>) -> Result<()> {
        self.frames.push(frame);
        let result = exprs.into_iter().try_for_each(|expr| expr.accept(self));
        self.frames.pop();
        result
    }

    fn query(&mut self, query: &Query) -> Result<()> {
        for item in &query.from {
            self.schema.require_class(&item.class)?;
            self.classes.insert(item.class.clone());
        }
        let Some(root) = query.root_class() else {
            return Ok(());
        };
        let frame = Frame {
            root: root.to_string(),
            entries: query.from.clone(),
        };

        let clauses = query
            .select
            .iter()
            .map(|s| &s.expression)
            .chain(query.where_clause.iter())
            .chain(query.group_by.iter())
            .chain(query.having.iter())
            .chain(query.order_by.iter().map(|o| &o.expression));
        self.within(frame, clauses)
    }
}

impl<S: SchemaCatalog + ?Sized> ExprVisitor for ClassAnalyzer<'_, S> {
    type Output = Result<()>;

    fn visit_literal(&mut self, _value: &Value) -> Result<()> {
        Ok(())
    }

    fn visit_parameter(&mut self, _index: usize, _modifier: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn visit_path(&mut self, path: &PathExpr) -> Result<()> {
        let owner = self.add_prefix(path.left.as_deref())?;
        self.schema.require_field(&owner, &path.name)?;
        Ok(())
    }

    fn visit_binary(&mut self, _op: ArithmeticOp, left: &Expr, right: &Expr) -> Result<()> {
        left.accept(self)?;
        right.accept(self)
    }

    fn visit_negate(&mut self, operand: &Expr) -> Result<()> {
        operand.accept(self)
    }

    fn visit_function(&mut self, _name: &str, args: &[Expr]) -> Result<()> {
        args.iter().try_for_each(|arg| arg.accept(self))
    }

    fn visit_raw(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn visit_query(&mut self, query: &Query) -> Result<()> {
        self.query(query)
    }

    fn visit_and(&mut self, left: &Expr, right: &Expr) -> Result<()> {
        left.accept(self)?;
        right.accept(self)
    }

    fn visit_or(&mut self, left: &Expr, right: &Expr) -> Result<()> {
        left.accept(self)?;
        right.accept(self)
    }

    fn visit_not(&mut self, operand: &Expr) -> Result<()> {
        operand.accept(self)
    }

    fn visit_relational(&mut self, _op: RelationalOp, left: &Expr, right: &Expr) -> Result<()> {
        left.accept(self)?;
        right.accept(self)
    }

    fn visit_in(&mut self, operand: &Expr, candidates: &[Expr]) -> Result<()> {
        operand.accept(self)?;
        candidates.iter().try_for_each(|c| c.accept(self))
    }

    fn visit_is_null(&mut self, operand: &Expr, _negated: bool) -> Result<()> {
        operand.accept(self)
    }

    fn visit_boolean_literal(&mut self, _value: bool) -> Result<()> {
        Ok(())
    }

    fn visit_exists(&mut self, query: &Query) -> Result<()> {
        self.query(query)
    }

    fn visit_count(&mut self, path: Option<&PathExpr>, collection: &str) -> Result<()> {
        self.add_collection(path, collection).map(|_| ())
    }

    fn visit_contains(
        &mut self,
        path: Option<&PathExpr>,
        collection: &str,
        element: &Expr,
    ) -> Result<()> {
        let element_class = self.add_collection(path, collection)?;
        if element.is_boolean() {
            let frame = Frame {
                entries: vec![FromItem {
                    class: element_class.clone(),
                    alias: None,
                }],
                root: element_class,
            };
            self.within(frame, [element])
        } else {
            element.accept(self)
        }
    }

    fn visit_asterisk(&mut self, path: Option<&PathExpr>) -> Result<()> {
        self.add_prefix(path).map(|_| ())
    }

    fn visit_class_tag(&mut self, path: Option<&PathExpr>) -> Result<()> {
        let class = self.add_prefix(path)?;
        for sub in self.schema.subclasses_of(&class) {
            self.classes.insert(sub.name.clone());
        }
        Ok(())
    }
}
