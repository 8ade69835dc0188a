//! In-memory evaluation of expressions
//!
//! The evaluator walks an expression against a host-supplied
//! [`EvaluationContext`]. It never mutates the tree or the context, and
//! implements three-valued logic: a boolean result may be unknown (null).

pub mod memory;
pub mod ops;

use crate::ast::{ArithmeticOp, Expr, PathExpr, Query, RelationalOp};
use crate::visitor::ExprVisitor;
use soql_core::{Error, Result, Value};
use tracing::trace;

pub use memory::{InMemoryContext, MemoryObject, ObjectId};

/// What a property lookup yields: a plain value or another object
#[derive(Debug, Clone, PartialEq)]
pub enum Datum<O> {
    Value(Value),
    Object(O),
}

impl<O> Datum<O> {
    /// Null datum
    pub fn null() -> Self {
        Datum::Value(Value::Null)
    }
}

/// Host capabilities needed to evaluate expressions
pub trait EvaluationContext {
    /// Handle to a host object
    type Object: Clone;

    /// The object bare property names are resolved against
    fn root(&self) -> Self::Object;

    /// Value bound to positional parameter `index`
    fn parameter(&self, index: usize) -> Option<Value>;

    /// Property `name` of `object`; a missing reference is a null value
    fn property(&self, object: &Self::Object, name: &str) -> Result<Datum<Self::Object>>;

    /// Elements of collection `name` on `object`
    fn collection(&self, object: &Self::Object, name: &str) -> Result<Vec<Self::Object>>;

    /// Class name of `object`
    fn class_name(&self, object: &Self::Object) -> Result<String>;

    /// Primary key of `object`, used when an object appears as a value
    fn primary_key(&self, object: &Self::Object) -> Result<Value>;
}

/// Evaluate an expression against the context's root object
pub fn evaluate<C: EvaluationContext>(expr: &Expr, context: &C) -> Result<Value> {
    expr.accept(&mut Evaluator::new(context))
}

/// Evaluate a condition; `None` means unknown
pub fn evaluate_condition<C: EvaluationContext>(expr: &Expr, context: &C) -> Result<Option<bool>> {
    ops::truth(&evaluate(expr, context)?)
}

/// Returns true if the condition holds; unknown counts as not matching
pub fn matches<C: EvaluationContext>(expr: &Expr, context: &C) -> Result<bool> {
    Ok(evaluate_condition(expr, context)? == Some(true))
}

/// Visitor computing the value of an expression
pub struct Evaluator<'c, C: EvaluationContext> {
    context: &'c C,
    root: C::Object,
}

impl<'c, C: EvaluationContext> Evaluator<'c, C> {
    /// Evaluator rooted at the context's root object
    pub fn new(context: &'c C) -> Self {
        Self {
            context,
            root: context.root(),
        }
    }

    /// Evaluator rooted at another object, used for collection elements
    pub fn with_root(context: &'c C, root: C::Object) -> Self {
        Self { context, root }
    }

    fn resolve(&self, path: &PathExpr) -> Result<Datum<C::Object>> {
        let parent = match &path.left {
            Some(left) => self.resolve(left)?,
            None => Datum::Object(self.root.clone()),
        };
        match parent {
            Datum::Object(object) => self.context.property(&object, &path.name),
            Datum::Value(Value::Null) => Ok(Datum::null()),
            Datum::Value(other) => Err(Error::Type(format!(
                "cannot read property '{}' of {}",
                path.name,
                other.type_name()
            ))),
        }
    }

    /// Object a path prefix points at; `None` when the prefix is null
    fn resolve_object(&self, path: Option<&PathExpr>) -> Result<Option<C::Object>> {
        let path = match path {
            Some(path) => path,
            None => return Ok(Some(self.root.clone())),
        };
        match self.resolve(path)? {
            Datum::Object(object) => Ok(Some(object)),
            Datum::Value(Value::Null) => Ok(None),
            Datum::Value(other) => Err(Error::Type(format!(
                "'{}' is a {} value, not an object",
                path.dotted(),
                other.type_name()
            ))),
        }
    }

    fn to_value(&self, datum: Datum<C::Object>) -> Result<Value> {
        match datum {
            Datum::Value(value) => Ok(value),
            Datum::Object(object) => self.context.primary_key(&object),
        }
    }

    fn condition(&mut self, expr: &Expr) -> Result<Option<bool>> {
        ops::truth(&expr.accept(self)?)
    }

    /// Element satisfies the argument of `Contains`
    fn element_matches(&self, element: &C::Object, predicate: &Expr) -> Result<bool> {
        if predicate.is_boolean() {
            let mut nested = Evaluator::with_root(self.context, element.clone());
            return Ok(nested.condition(predicate)? == Some(true));
        }
        let mut outer = Evaluator::with_root(self.context, self.root.clone());
        let wanted = predicate.accept(&mut outer)?;
        let key = self.context.primary_key(element)?;
        Ok(ops::compare(RelationalOp::Equal, &key, &wanted)? == Some(true))
    }

    fn call_function(&mut self, name: &str, args: &[Expr]) -> Result<Value> {
        let lower = name.to_ascii_lowercase();
        if lower == "coalesce" || lower == "isnull" {
            for arg in args {
                let value = arg.accept(self)?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            return Ok(Value::Null);
        }

        let values = args
            .iter()
            .map(|arg| arg.accept(self))
            .collect::<Result<Vec<_>>>()?;
        let single = || single_argument(name, &values);
        let wrong_type = |value: &Value| {
            Error::Type(format!(
                "function '{}' cannot be applied to {}",
                name,
                value.type_name()
            ))
        };

        match lower.as_str() {
            "lower" | "upper" | "len" => {
                let value = single()?;
                let text = match value {
                    Value::Null => return Ok(Value::Null),
                    Value::String(s) => s,
                    other => return Err(wrong_type(other)),
                };
                Ok(match lower.as_str() {
                    "lower" => Value::String(text.to_lowercase()),
                    "upper" => Value::String(text.to_uppercase()),
                    _ => count_value(text.chars().count(), "string length")?,
                })
            }
            "abs" => {
                let value = single()?;
                match value {
                    Value::Null => Ok(Value::Null),
                    v if v.is_numeric() => {
                        let negative = ops::compare(RelationalOp::Less, v, &Value::Int8(0))?;
                        if negative == Some(true) {
                            ops::negate(v)
                        } else {
                            Ok(v.clone())
                        }
                    }
                    other => Err(wrong_type(other)),
                }
            }
            _ => Err(Error::UnsupportedOperation(format!(
                "unknown function '{}'",
                name
            ))),
        }
    }
}

fn single_argument<'v>(name: &str, values: &'v [Value]) -> Result<&'v Value> {
    match values {
        [value] => Ok(value),
        _ => Err(Error::Type(format!(
            "function '{}' expects 1 argument, got {}",
            name,
            values.len()
        ))),
    }
}

fn unsupported(what: &str) -> Error {
    Error::UnsupportedOperation(format!("{} cannot be evaluated in memory", what))
}

impl<C: EvaluationContext> ExprVisitor for Evaluator<'_, C> {
    type Output = Result<Value>;

    fn visit_literal(&mut self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }

    fn visit_parameter(&mut self, index: usize, _modifier: Option<&str>) -> Result<Value> {
        self.context
            .parameter(index)
            .ok_or_else(|| Error::Type(format!("parameter {} out of range", index)))
    }

    fn visit_path(&mut self, path: &PathExpr) -> Result<Value> {
        let datum = self.resolve(path)?;
        self.to_value(datum)
    }

    fn visit_binary(&mut self, op: ArithmeticOp, left: &Expr, right: &Expr) -> Result<Value> {
        let l = left.accept(self)?;
        let r = right.accept(self)?;
        ops::arithmetic(op, &l, &r)
    }

    fn visit_negate(&mut self, operand: &Expr) -> Result<Value> {
        let value = operand.accept(self)?;
        ops::negate(&value)
    }

    fn visit_function(&mut self, name: &str, args: &[Expr]) -> Result<Value> {
        self.call_function(name, args)
    }

    fn visit_raw(&mut self, _text: &str) -> Result<Value> {
        Err(unsupported("raw query text"))
    }

    fn visit_query(&mut self, _query: &Query) -> Result<Value> {
        Err(unsupported("nested query"))
    }

    fn visit_and(&mut self, left: &Expr, right: &Expr) -> Result<Value> {
        let l = self.condition(left);
        if matches!(l, Ok(Some(false))) {
            return Ok(Value::Boolean(false));
        }
        let r = self.condition(right);
        if matches!(r, Ok(Some(false))) {
            return Ok(Value::Boolean(false));
        }
        match (l?, r?) {
            (Some(true), Some(true)) => Ok(Value::Boolean(true)),
            _ => Ok(Value::Null),
        }
    }

    fn visit_or(&mut self, left: &Expr, right: &Expr) -> Result<Value> {
        let l = self.condition(left);
        if matches!(l, Ok(Some(true))) {
            return Ok(Value::Boolean(true));
        }
        let r = self.condition(right);
        if matches!(r, Ok(Some(true))) {
            return Ok(Value::Boolean(true));
        }
        match (l?, r?) {
            (Some(false), Some(false)) => Ok(Value::Boolean(false)),
            _ => Ok(Value::Null),
        }
    }

    fn visit_not(&mut self, operand: &Expr) -> Result<Value> {
        let value = self.condition(operand)?;
        Ok(ops::from_truth(value.map(|b| !b)))
    }

    fn visit_relational(&mut self, op: RelationalOp, left: &Expr, right: &Expr) -> Result<Value> {
        let l = left.accept(self)?;
        let r = right.accept(self)?;
        ops::compare(op, &l, &r).map(ops::from_truth)
    }

    fn visit_in(&mut self, operand: &Expr, candidates: &[Expr]) -> Result<Value> {
        Expr::expand_in(operand, candidates).accept(self)
    }

    fn visit_is_null(&mut self, operand: &Expr, negated: bool) -> Result<Value> {
        let value = operand.accept(self)?;
        Ok(Value::Boolean(value.is_null() != negated))
    }

    fn visit_boolean_literal(&mut self, value: bool) -> Result<Value> {
        Ok(Value::Boolean(value))
    }

    fn visit_exists(&mut self, _query: &Query) -> Result<Value> {
        Err(unsupported("exists"))
    }

    fn visit_count(&mut self, path: Option<&PathExpr>, collection: &str) -> Result<Value> {
        let owner = match self.resolve_object(path)? {
            Some(owner) => owner,
            None => return Ok(Value::Null),
        };
        let elements = self.context.collection(&owner, collection)?;
        trace!("Counted {} elements in {}", elements.len(), collection);
        count_value(elements.len(), "collection size")
    }

    fn visit_contains(
        &mut self,
        path: Option<&PathExpr>,
        collection: &str,
        element: &Expr,
    ) -> Result<Value> {
        let owner = match self.resolve_object(path)? {
            Some(owner) => owner,
            None => return Ok(Value::Null),
        };
        for item in self.context.collection(&owner, collection)? {
            if self.element_matches(&item, element)? {
                return Ok(Value::Boolean(true));
            }
        }
        Ok(Value::Boolean(false))
    }

    fn visit_asterisk(&mut self, _path: Option<&PathExpr>) -> Result<Value> {
        Err(unsupported("'*'"))
    }

    fn visit_class_tag(&mut self, path: Option<&PathExpr>) -> Result<Value> {
        match self.resolve_object(path)? {
            Some(object) => self.context.class_name(&object).map(Value::String),
            None => Ok(Value::Null),
        }
    }
}

/// A length or element count as an `Int32` value
fn count_value(count: usize, what: &str) -> Result<Value> {
    i32::try_from(count)
        .map(Value::Int32)
        .map_err(|_| Error::Arithmetic(format!("{} {} does not fit in int32", what, count)))
}
