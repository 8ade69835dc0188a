//! Constant folding and boolean algebra
//!
//! A pure rewrite: the input tree is never modified and callers always use
//! the returned tree. Children are simplified first. Folding reuses the
//! evaluator's operators, and a fold that would fail leaves the node as it
//! was, so simplification itself never fails.

use crate::ast::{ArithmeticOp, Expr, OrderItem, PathExpr, Query, RelationalOp, SelectItem};
use crate::eval::ops;
use crate::visitor::ExprVisitor;
use soql_core::Value;
use tracing::trace;

/// Simplify an expression
pub fn simplify(expr: &Expr) -> Expr {
    let simplified = expr.accept(&mut Simplifier);
    trace!("Simplified {} to {}", expr, simplified);
    simplified
}

/// Simplify every clause of a query
pub fn simplify_query(query: &Query) -> Query {
    let mut simplifier = Simplifier;
    simplifier.query(query)
}

struct Simplifier;

impl Simplifier {
    fn query(&mut self, query: &Query) -> Query {
        Query {
            distinct: query.distinct,
            select: query
                .select
                .iter()
                .map(|item| SelectItem {
                    expression: item.expression.accept(self),
                    alias: item.alias.clone(),
                })
                .collect(),
            from: query.from.clone(),
            where_clause: query.where_clause.as_ref().map(|w| w.accept(self)),
            group_by: query.group_by.iter().map(|e| e.accept(self)).collect(),
            having: query.having.as_ref().map(|h| h.accept(self)),
            order_by: query
                .order_by
                .iter()
                .map(|item| OrderItem {
                    expression: item.expression.accept(self),
                    ascending: item.ascending,
                })
                .collect(),
        }
    }

    /// Fold `operand in (candidates)` when everything is constant
    fn fold_in(operand: &Value, candidates: &[Value]) -> Option<Expr> {
        let mut unknown = false;
        for candidate in candidates {
            match ops::compare(RelationalOp::Equal, operand, candidate).ok()? {
                Some(true) => return Some(Expr::BooleanLiteral(true)),
                Some(false) => {}
                None => unknown = true,
            }
        }
        Some(if unknown {
            Expr::Literal(Value::Null)
        } else {
            Expr::BooleanLiteral(false)
        })
    }
}

fn is_null_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(Value::Null))
}

impl ExprVisitor for Simplifier {
    type Output = Expr;

    fn visit_literal(&mut self, value: &Value) -> Expr {
        Expr::Literal(value.clone())
    }

    fn visit_parameter(&mut self, index: usize, modifier: Option<&str>) -> Expr {
        Expr::Parameter {
            index,
            modifier: modifier.map(str::to_string),
        }
    }

    fn visit_path(&mut self, path: &PathExpr) -> Expr {
        Expr::Path(path.clone())
    }

    fn visit_binary(&mut self, op: ArithmeticOp, left: &Expr, right: &Expr) -> Expr {
        let left = left.accept(self);
        let right = right.accept(self);

        if is_null_literal(&left) || is_null_literal(&right) {
            return Expr::Literal(Value::Null);
        }
        if let (Some(l), Some(r)) = (left.constant_value(), right.constant_value()) {
            if let Ok(value) = ops::arithmetic(op, &l, &r) {
                return Expr::from_value(value);
            }
        }
        Expr::binary(op, left, right)
    }

    fn visit_negate(&mut self, operand: &Expr) -> Expr {
        let operand = operand.accept(self);
        if let Expr::Literal(value) = &operand {
            if value.is_null() || value.is_numeric() {
                if let Ok(negated) = ops::negate(value) {
                    return Expr::Literal(negated);
                }
            }
        }
        Expr::Negate(Box::new(operand))
    }

    fn visit_function(&mut self, name: &str, args: &[Expr]) -> Expr {
        Expr::Function {
            name: name.to_string(),
            args: args.iter().map(|a| a.accept(self)).collect(),
        }
    }

    fn visit_raw(&mut self, text: &str) -> Expr {
        Expr::Raw(text.to_string())
    }

    fn visit_query(&mut self, query: &Query) -> Expr {
        Expr::Query(Box::new(self.query(query)))
    }

    fn visit_and(&mut self, left: &Expr, right: &Expr) -> Expr {
        let left = left.accept(self);
        let right = right.accept(self);
        match (left, right) {
            (Expr::BooleanLiteral(false), _) | (_, Expr::BooleanLiteral(false)) => {
                Expr::BooleanLiteral(false)
            }
            (Expr::BooleanLiteral(true), other) | (other, Expr::BooleanLiteral(true)) => other,
            (left, right) => Expr::and(left, right),
        }
    }

    fn visit_or(&mut self, left: &Expr, right: &Expr) -> Expr {
        let left = left.accept(self);
        let right = right.accept(self);
        match (left, right) {
            (Expr::BooleanLiteral(true), _) | (_, Expr::BooleanLiteral(true)) => {
                Expr::BooleanLiteral(true)
            }
            (Expr::BooleanLiteral(false), other) | (other, Expr::BooleanLiteral(false)) => other,
            (left, right) => Expr::or(left, right),
        }
    }

    fn visit_not(&mut self, operand: &Expr) -> Expr {
        match operand.accept(self) {
            Expr::BooleanLiteral(b) => Expr::BooleanLiteral(!b),
            other => Expr::not(other),
        }
    }

    fn visit_relational(&mut self, op: RelationalOp, left: &Expr, right: &Expr) -> Expr {
        let left = left.accept(self);
        let right = right.accept(self);
        if let (Some(l), Some(r)) = (left.constant_value(), right.constant_value()) {
            match ops::compare(op, &l, &r) {
                Ok(Some(b)) => return Expr::BooleanLiteral(b),
                Ok(None) => return Expr::Literal(Value::Null),
                Err(_) => {}
            }
        }
        Expr::relational(op, left, right)
    }

    fn visit_in(&mut self, operand: &Expr, candidates: &[Expr]) -> Expr {
        if candidates.is_empty() {
            return Expr::BooleanLiteral(false);
        }

        let operand = operand.accept(self);
        let candidates: Vec<Expr> = candidates.iter().map(|c| c.accept(self)).collect();

        let constants: Option<Vec<Value>> = candidates.iter().map(Expr::constant_value).collect();
        if let (Some(value), Some(constants)) = (operand.constant_value(), constants) {
            if let Some(folded) = Self::fold_in(&value, &constants) {
                return folded;
            }
        }
        Expr::in_list(operand, candidates)
    }

    fn visit_is_null(&mut self, operand: &Expr, negated: bool) -> Expr {
        Expr::IsNull {
            operand: Box::new(operand.accept(self)),
            negated,
        }
    }

    fn visit_boolean_literal(&mut self, value: bool) -> Expr {
        Expr::BooleanLiteral(value)
    }

    fn visit_exists(&mut self, query: &Query) -> Expr {
        Expr::Exists(Box::new(self.query(query)))
    }

    fn visit_count(&mut self, path: Option<&PathExpr>, collection: &str) -> Expr {
        Expr::Count {
            path: path.cloned(),
            collection: collection.to_string(),
        }
    }

    fn visit_contains(
        &mut self,
        path: Option<&PathExpr>,
        collection: &str,
        element: &Expr,
    ) -> Expr {
        Expr::Contains {
            path: path.cloned(),
            collection: collection.to_string(),
            element: Box::new(element.accept(self)),
        }
    }

    fn visit_asterisk(&mut self, path: Option<&PathExpr>) -> Expr {
        Expr::Asterisk(path.cloned())
    }

    fn visit_class_tag(&mut self, path: Option<&PathExpr>) -> Expr {
        Expr::ClassTag(path.cloned())
    }
}
