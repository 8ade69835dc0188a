//! Expression generators shared by property tests

use crate::ast::{ArithmeticOp, Expr, PathExpr, RelationalOp};
use proptest::prelude::*;
use soql_core::Value;

/// Identifiers that can never collide with a keyword
pub fn arb_identifier() -> impl Strategy<Value = String> {
    "x[a-z0-9_]{0,5}"
}

pub fn arb_arithmetic_op() -> impl Strategy<Value = ArithmeticOp> {
    prop_oneof![
        Just(ArithmeticOp::Add),
        Just(ArithmeticOp::Subtract),
        Just(ArithmeticOp::Multiply),
        Just(ArithmeticOp::Divide),
        Just(ArithmeticOp::Modulo),
    ]
}

pub fn arb_relational_op() -> impl Strategy<Value = RelationalOp> {
    prop_oneof![
        Just(RelationalOp::Equal),
        Just(RelationalOp::NotEqual),
        Just(RelationalOp::Less),
        Just(RelationalOp::LessOrEqual),
        Just(RelationalOp::Greater),
        Just(RelationalOp::GreaterOrEqual),
        Just(RelationalOp::Like),
    ]
}

/// Scalar expressions the parser can produce
pub fn arb_scalar() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (0..i32::MAX).prop_map(Expr::literal),
        "[a-z' %]{0,8}".prop_map(|s| Expr::literal(s.as_str())),
        prop::collection::vec(arb_identifier(), 1..4)
            .prop_map(|segments| Expr::Path(PathExpr::from_segments(segments).unwrap())),
        (0usize..10).prop_map(Expr::parameter),
        Just(Expr::Literal(Value::Null)),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (arb_arithmetic_op(), inner.clone(), inner.clone())
                .prop_map(|(op, l, r)| Expr::binary(op, l, r)),
            inner.prop_map(|e| Expr::Negate(Box::new(e))),
        ]
    })
}

/// Boolean expressions the parser can produce
pub fn arb_condition() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Expr::BooleanLiteral),
        (arb_relational_op(), arb_scalar(), arb_scalar())
            .prop_map(|(op, l, r)| Expr::relational(op, l, r)),
        (arb_scalar(), prop::collection::vec(arb_scalar(), 0..3))
            .prop_map(|(o, c)| Expr::in_list(o, c)),
        (arb_scalar(), any::<bool>()).prop_map(|(o, negated)| Expr::IsNull {
            operand: Box::new(o),
            negated
        }),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::and(l, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::or(l, r)),
            inner.prop_map(Expr::not),
        ]
    })
}

/// Small integer arithmetic over literals only
pub fn arb_constant_scalar() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-50i32..50).prop_map(Expr::literal),
        Just(Expr::Literal(Value::Null)),
    ];
    leaf.prop_recursive(3, 12, 2, |inner| {
        prop_oneof![
            (arb_arithmetic_op(), inner.clone(), inner.clone())
                .prop_map(|(op, l, r)| Expr::binary(op, l, r)),
            inner.prop_map(|e| Expr::Negate(Box::new(e))),
        ]
    })
}

/// Conditions over literals only
pub fn arb_constant_condition() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Expr::BooleanLiteral),
        (
            prop_oneof![
                Just(RelationalOp::Equal),
                Just(RelationalOp::NotEqual),
                Just(RelationalOp::Less),
                Just(RelationalOp::GreaterOrEqual),
            ],
            arb_constant_scalar(),
            arb_constant_scalar()
        )
            .prop_map(|(op, l, r)| Expr::relational(op, l, r)),
        (
            arb_constant_scalar(),
            prop::collection::vec(arb_constant_scalar(), 0..3)
        )
            .prop_map(|(o, c)| Expr::in_list(o, c)),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::and(l, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::or(l, r)),
            inner.prop_map(Expr::not),
        ]
    })
}
