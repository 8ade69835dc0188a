//! SOQL Query Core
//!
//! Provides SOQL parsing, simplification and in-memory evaluation.
//!
//! # Overview
//!
//! The query core implements:
//! - Lexer and recursive-descent parser
//! - Expression tree with a visitor protocol
//! - Printer that round-trips through the parser
//! - Constant folding and boolean simplification
//! - Three-valued evaluation against a host context
//! - Path resolution and class-involvement analysis

pub mod analyze;
pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod resolve;
pub mod simplify;
pub mod visitor;

#[cfg(test)]
mod testing;

pub use analyze::{involved_classes, involved_classes_of_query};
pub use ast::{
    ArithmeticOp, Expr, FromItem, OrderItem, PathExpr, Query, RelationalOp, SelectItem,
};
pub use eval::{
    Datum, EvaluationContext, Evaluator, InMemoryContext, MemoryObject, ObjectId, evaluate,
    evaluate_condition, matches,
};
pub use lexer::{Lexer, Token, TokenKind, tokenize};
pub use parser::{parse_expression, parse_query, parse_where_clause};
pub use resolve::{JoinStep, ResolvedPath, class_of, resolve_path, resolve_references};
pub use simplify::{simplify, simplify_query};
pub use visitor::ExprVisitor;
