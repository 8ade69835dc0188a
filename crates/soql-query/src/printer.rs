//! Textual form of expressions and queries
//!
//! Every composite node is printed inside its own parentheses, so the output
//! parses back to the same tree without precedence analysis.

use crate::ast::{ArithmeticOp, Expr, PathExpr, Query, RelationalOp};
use crate::visitor::ExprVisitor;
use soql_core::Value;
use std::fmt;

/// Quote a string literal, doubling embedded quotes
pub fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn path_prefix(path: Option<&PathExpr>) -> String {
    match path {
        Some(path) => format!("{}.", path.dotted()),
        None => String::new(),
    }
}

/// Visitor producing SOQL text
struct Printer;

impl ExprVisitor for Printer {
    type Output = String;

    fn visit_literal(&mut self, value: &Value) -> String {
        match value {
            Value::String(s) => quote(s),
            Value::DateTime(_) => quote(&value.to_string()),
            other => other.to_string(),
        }
    }

    fn visit_parameter(&mut self, index: usize, modifier: Option<&str>) -> String {
        match modifier {
            Some(m) => format!("{{{}:{}}}", index, m),
            None => format!("{{{}}}", index),
        }
    }

    fn visit_path(&mut self, path: &PathExpr) -> String {
        path.dotted()
    }

    fn visit_binary(&mut self, op: ArithmeticOp, left: &Expr, right: &Expr) -> String {
        format!("({} {} {})", left.accept(self), op.symbol(), right.accept(self))
    }

    fn visit_negate(&mut self, operand: &Expr) -> String {
        format!("(-{})", operand.accept(self))
    }

    fn visit_function(&mut self, name: &str, args: &[Expr]) -> String {
        let args: Vec<String> = args.iter().map(|a| a.accept(self)).collect();
        format!("{}({})", name, args.join(", "))
    }

    fn visit_raw(&mut self, text: &str) -> String {
        format!("RAWQUERY({})", text)
    }

    fn visit_query(&mut self, query: &Query) -> String {
        format!("({})", query)
    }

    fn visit_and(&mut self, left: &Expr, right: &Expr) -> String {
        format!("({} and {})", left.accept(self), right.accept(self))
    }

    fn visit_or(&mut self, left: &Expr, right: &Expr) -> String {
        format!("({} or {})", left.accept(self), right.accept(self))
    }

    fn visit_not(&mut self, operand: &Expr) -> String {
        format!("(not {})", operand.accept(self))
    }

    fn visit_relational(&mut self, op: RelationalOp, left: &Expr, right: &Expr) -> String {
        format!("({} {} {})", left.accept(self), op.symbol(), right.accept(self))
    }

    fn visit_in(&mut self, operand: &Expr, candidates: &[Expr]) -> String {
        let candidates: Vec<String> = candidates.iter().map(|c| c.accept(self)).collect();
        format!("({} in ({}))", operand.accept(self), candidates.join(", "))
    }

    fn visit_is_null(&mut self, operand: &Expr, negated: bool) -> String {
        let keyword = if negated { "is not null" } else { "is null" };
        format!("({} {})", operand.accept(self), keyword)
    }

    fn visit_boolean_literal(&mut self, value: bool) -> String {
        value.to_string()
    }

    fn visit_exists(&mut self, query: &Query) -> String {
        format!("exists({})", query)
    }

    fn visit_count(&mut self, path: Option<&PathExpr>, collection: &str) -> String {
        format!("{}{}.Count", path_prefix(path), collection)
    }

    fn visit_contains(
        &mut self,
        path: Option<&PathExpr>,
        collection: &str,
        element: &Expr,
    ) -> String {
        format!(
            "{}{}.Contains({})",
            path_prefix(path),
            collection,
            element.accept(self)
        )
    }

    fn visit_asterisk(&mut self, path: Option<&PathExpr>) -> String {
        format!("{}*", path_prefix(path))
    }

    fn visit_class_tag(&mut self, path: Option<&PathExpr>) -> String {
        format!("{}SoodaClass", path_prefix(path))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.accept(&mut Printer))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select ")?;
        if self.distinct {
            write!(f, "distinct ")?;
        }

        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item.expression)?;
            if let Some(alias) = &item.alias {
                write!(f, " as {}", alias)?;
            }
        }

        write!(f, " from ")?;
        for (i, item) in self.from.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item.class)?;
            if let Some(alias) = &item.alias {
                write!(f, " as {}", alias)?;
            }
        }

        if let Some(condition) = &self.where_clause {
            write!(f, " where {}", condition)?;
        }

        if !self.group_by.is_empty() {
            let keys: Vec<String> = self.group_by.iter().map(|e| e.to_string()).collect();
            write!(f, " group by {}", keys.join(", "))?;
        }

        if let Some(having) = &self.having {
            write!(f, " having {}", having)?;
        }

        if !self.order_by.is_empty() {
            let items: Vec<String> = self
                .order_by
                .iter()
                .map(|o| {
                    if o.ascending {
                        o.expression.to_string()
                    } else {
                        format!("{} desc", o.expression)
                    }
                })
                .collect();
            write!(f, " order by {}", items.join(", "))?;
        }

        Ok(())
    }
}
