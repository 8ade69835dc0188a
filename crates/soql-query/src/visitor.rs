//! Double-dispatch traversal over expressions
//!
//! `Expr::accept` calls exactly the visitor method matching the node kind.
//! Visitors recurse into children themselves by calling `accept` again.
//! No method has a default body, so a new node kind fails to compile until
//! every traversal handles it.

use crate::ast::{ArithmeticOp, Expr, PathExpr, Query, RelationalOp};
use soql_core::Value;

/// One operation per expression node kind
pub trait ExprVisitor {
    type Output;

    fn visit_literal(&mut self, value: &Value) -> Self::Output;

    fn visit_parameter(&mut self, index: usize, modifier: Option<&str>) -> Self::Output;

    fn visit_path(&mut self, path: &PathExpr) -> Self::Output;

    fn visit_binary(&mut self, op: ArithmeticOp, left: &Expr, right: &Expr) -> Self::Output;

    fn visit_negate(&mut self, operand: &Expr) -> Self::Output;

    fn visit_function(&mut self, name: &str, args: &[Expr]) -> Self::Output;

    fn visit_raw(&mut self, text: &str) -> Self::Output;

    fn visit_query(&mut self, query: &Query) -> Self::Output;

    fn visit_and(&mut self, left: &Expr, right: &Expr) -> Self::Output;

    fn visit_or(&mut self, left: &Expr, right: &Expr) -> Self::Output;

    fn visit_not(&mut self, operand: &Expr) -> Self::Output;

    fn visit_relational(&mut self, op: RelationalOp, left: &Expr, right: &Expr) -> Self::Output;

    fn visit_in(&mut self, operand: &Expr, candidates: &[Expr]) -> Self::Output;

    fn visit_is_null(&mut self, operand: &Expr, negated: bool) -> Self::Output;

    fn visit_boolean_literal(&mut self, value: bool) -> Self::Output;

    fn visit_exists(&mut self, query: &Query) -> Self::Output;

    fn visit_count(&mut self, path: Option<&PathExpr>, collection: &str) -> Self::Output;

    fn visit_contains(
        &mut self,
        path: Option<&PathExpr>,
        collection: &str,
        element: &Expr,
    ) -> Self::Output;

    fn visit_asterisk(&mut self, path: Option<&PathExpr>) -> Self::Output;

    fn visit_class_tag(&mut self, path: Option<&PathExpr>) -> Self::Output;
}

impl Expr {
    /// Dispatch to the visitor method for this node's kind
    pub fn accept<V: ExprVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Expr::Literal(value) => visitor.visit_literal(value),
            Expr::Parameter { index, modifier } => {
                visitor.visit_parameter(*index, modifier.as_deref())
            }
            Expr::Path(path) => visitor.visit_path(path),
            Expr::Binary { op, left, right } => visitor.visit_binary(*op, left, right),
            Expr::Negate(operand) => visitor.visit_negate(operand),
            Expr::Function { name, args } => visitor.visit_function(name, args),
            Expr::Raw(text) => visitor.visit_raw(text),
            Expr::Query(query) => visitor.visit_query(query),
            Expr::And(left, right) => visitor.visit_and(left, right),
            Expr::Or(left, right) => visitor.visit_or(left, right),
            Expr::Not(operand) => visitor.visit_not(operand),
            Expr::Relational { op, left, right } => visitor.visit_relational(*op, left, right),
            Expr::In {
                operand,
                candidates,
            } => visitor.visit_in(operand, candidates),
            Expr::IsNull { operand, negated } => visitor.visit_is_null(operand, *negated),
            Expr::BooleanLiteral(value) => visitor.visit_boolean_literal(*value),
            Expr::Exists(query) => visitor.visit_exists(query),
            Expr::Count { path, collection } => visitor.visit_count(path.as_ref(), collection),
            Expr::Contains {
                path,
                collection,
                element,
            } => visitor.visit_contains(path.as_ref(), collection, element),
            Expr::Asterisk(path) => visitor.visit_asterisk(path.as_ref()),
            Expr::ClassTag(path) => visitor.visit_class_tag(path.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts nodes, recursing into every child
    struct NodeCounter {
        count: usize,
    }

    impl ExprVisitor for NodeCounter {
        type Output = ();

        fn visit_literal(&mut self, _: &Value) {
            self.count += 1;
        }
        fn visit_parameter(&mut self, _: usize, _: Option<&str>) {
            self.count += 1;
        }
        fn visit_path(&mut self, _: &PathExpr) {
            self.count += 1;
        }
        fn visit_binary(&mut self, _: ArithmeticOp, left: &Expr, right: &Expr) {
            self.count += 1;
            left.accept(self);
            right.accept(self);
        }
        fn visit_negate(&mut self, operand: &Expr) {
            self.count += 1;
            operand.accept(self);
        }
        fn visit_function(&mut self, _: &str, args: &[Expr]) {
            self.count += 1;
            args.iter().for_each(|a| a.accept(self));
        }
        fn visit_raw(&mut self, _: &str) {
            self.count += 1;
        }
        fn visit_query(&mut self, _: &Query) {
            self.count += 1;
        }
        fn visit_and(&mut self, left: &Expr, right: &Expr) {
            self.count += 1;
            left.accept(self);
            right.accept(self);
        }
        fn visit_or(&mut self, left: &Expr, right: &Expr) {
            self.count += 1;
            left.accept(self);
            right.accept(self);
        }
        fn visit_not(&mut self, operand: &Expr) {
            self.count += 1;
            operand.accept(self);
        }
        fn visit_relational(&mut self, _: RelationalOp, left: &Expr, right: &Expr) {
            self.count += 1;
            left.accept(self);
            right.accept(self);
        }
        fn visit_in(&mut self, operand: &Expr, candidates: &[Expr]) {
            self.count += 1;
            operand.accept(self);
            candidates.iter().for_each(|c| c.accept(self));
        }
        fn visit_is_null(&mut self, operand: &Expr, _: bool) {
            self.count += 1;
            operand.accept(self);
        }
        fn visit_boolean_literal(&mut self, _: bool) {
            self.count += 1;
        }
        fn visit_exists(&mut self, _: &Query) {
            self.count += 1;
        }
        fn visit_count(&mut self, _: Option<&PathExpr>, _: &str) {
            self.count += 1;
        }
        fn visit_contains(&mut self, _: Option<&PathExpr>, _: &str, element: &Expr) {
            self.count += 1;
            element.accept(self);
        }
        fn visit_asterisk(&mut self, _: Option<&PathExpr>) {
            self.count += 1;
        }
        fn visit_class_tag(&mut self, _: Option<&PathExpr>) {
            self.count += 1;
        }
    }

    #[test]
    fn test_dispatch_reaches_every_node() {
        let expr = Expr::and(
            Expr::relational(
                RelationalOp::Greater,
                Expr::binary(ArithmeticOp::Add, Expr::path("a"), Expr::literal(1)),
                Expr::parameter(0),
            ),
            Expr::in_list(Expr::path("b"), vec![Expr::literal(1), Expr::literal(2)]),
        );

        let mut counter = NodeCounter { count: 0 };
        expr.accept(&mut counter);
        assert_eq!(counter.count, 10);
    }
}
