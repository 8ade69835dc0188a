//! SOQL parser
//!
//! Recursive descent over the token stream produced by [`crate::lexer`].
//! Precedence, lowest first: `or`, `and`, `not`, relational, additive,
//! multiplicative, unary minus, primary.
//!
//! The first unexpected token aborts the parse with [`Error::Syntax`].

use crate::ast::*;
use crate::lexer::{Token, TokenKind, tokenize};
use rust_decimal::Decimal;
use soql_core::{Error, Result, Value};
use std::str::FromStr;
use tracing::{debug, trace};

/// Keywords that end a from-list entry instead of naming its alias
const CLAUSE_KEYWORDS: &[&str] = &[
    "where", "group", "having", "order", "select", "from", "by", "as", "and", "or", "not",
];

/// Parse a standalone expression
pub fn parse_expression(text: &str) -> Result<Expr> {
    let mut parser = Parser::new(text)?;
    let expr = parser.parse_or()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse the body of a where clause.
///
/// The result must be able to produce a boolean: boolean node kinds are
/// accepted, and so are paths, parameters, function calls and raw text whose
/// type only the host knows.
pub fn parse_where_clause(text: &str) -> Result<Expr> {
    let mut parser = Parser::new(text)?;
    let start = parser.peek().position;
    let expr = parser.parse_or()?;
    parser.expect_end()?;

    if !expr.is_boolean() && !expr.is_host_typed() {
        return Err(Error::syntax(
            "boolean expression",
            "scalar expression",
            start,
        ));
    }
    Ok(expr)
}

/// Parse a complete `select ... from ...` query
pub fn parse_query(text: &str) -> Result<Query> {
    let mut parser = Parser::new(text)?;
    let query = parser.parse_select()?;
    parser.expect_end()?;
    debug!(
        "Parsed query with {} select items over {} classes",
        query.select.len(),
        query.from.len()
    );
    Ok(query)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self> {
        let tokens = tokenize(source)?;
        trace!("Tokenized {} tokens", tokens.len());
        Ok(Self {
            source,
            tokens,
            pos: 0,
        })
    }

    // ========== Token cursor ==========

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn error(&self, expected: &str) -> Error {
        let token = self.peek();
        Error::syntax(expected, token.describe(), token.position)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(kind.describe()))
        }
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword)
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<Token> {
        if self.check_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.error(&format!("'{}'", keyword)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        Ok(self.expect(TokenKind::Keyword)?.text)
    }

    fn expect_end(&mut self) -> Result<()> {
        if self.check(TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }

    // ========== Queries ==========

    fn parse_select(&mut self) -> Result<Query> {
        self.expect_keyword("select")?;
        let distinct = self.consume_keyword("distinct");

        let mut select = Vec::new();
        loop {
            let expression = self.parse_or()?;
            let alias = if self.consume_keyword("as") {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            select.push(SelectItem { expression, alias });
            if !self.consume(TokenKind::Comma) {
                break;
            }
        }

        self.expect_keyword("from")?;
        let mut from = Vec::new();
        loop {
            let class = self.expect_identifier()?;
            let alias = if self.consume_keyword("as") {
                Some(self.expect_identifier()?)
            } else if self.check(TokenKind::Keyword)
                && !CLAUSE_KEYWORDS.contains(&self.peek().lower.as_str())
            {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            from.push(FromItem { class, alias });
            if !self.consume(TokenKind::Comma) {
                break;
            }
        }

        let where_clause = if self.consume_keyword("where") {
            Some(self.parse_or()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.consume_keyword("group") {
            self.expect_keyword("by")?;
            loop {
                group_by.push(self.parse_or()?);
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }

        let having = if self.consume_keyword("having") {
            Some(self.parse_or()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.consume_keyword("order") {
            self.expect_keyword("by")?;
            loop {
                let expression = self.parse_or()?;
                let ascending = if self.consume_keyword("desc") {
                    false
                } else {
                    self.consume_keyword("asc");
                    true
                };
                order_by.push(OrderItem {
                    expression,
                    ascending,
                });
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(Query {
            distinct,
            select,
            from,
            where_clause,
            group_by,
            having,
            order_by,
        })
    }

    /// Query nested in `exists(...)`: a full select or `Class [where cond]`
    fn parse_nested_query(&mut self) -> Result<Query> {
        if self.check_keyword("select") {
            return self.parse_select();
        }
        let class = self.expect_identifier()?;
        let where_clause = if self.consume_keyword("where") {
            Some(self.parse_or()?)
        } else {
            None
        };
        Ok(Query::select_all(class, where_clause))
    }

    fn starts_short_query(&self) -> bool {
        self.check(TokenKind::Keyword) && self.peek_at(1).is_keyword("where")
    }

    // ========== Boolean expressions ==========

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.consume_keyword("or") || self.consume(TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.consume_keyword("and") || self.consume(TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.consume_keyword("not") || self.consume(TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::not(operand));
        }
        self.parse_relational()
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;

        if self.consume_keyword("is") {
            let negated = self.consume_keyword("not");
            self.expect_keyword("null")?;
            return Ok(Expr::IsNull {
                operand: Box::new(left),
                negated,
            });
        }

        // `not like` / `not in`
        if self.check_keyword("not")
            && (self.peek_at(1).is_keyword("like") || self.peek_at(1).is_keyword("in"))
        {
            self.advance();
            let positive = self.parse_relational_tail(left)?;
            return Ok(Expr::not(positive));
        }

        self.parse_relational_tail(left)
    }

    fn parse_relational_tail(&mut self, left: Expr) -> Result<Expr> {
        if self.consume_keyword("in") {
            self.expect(TokenKind::LeftParen)?;
            let mut candidates = Vec::new();
            if !self.check(TokenKind::RightParen) {
                loop {
                    candidates.push(self.parse_additive()?);
                    if !self.consume(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RightParen)?;
            return Ok(Expr::in_list(left, candidates));
        }

        let op = if self.consume_keyword("like") {
            RelationalOp::Like
        } else {
            let op = match self.peek().kind {
                TokenKind::Equal => RelationalOp::Equal,
                TokenKind::NotEqual => RelationalOp::NotEqual,
                TokenKind::Less => RelationalOp::Less,
                TokenKind::LessOrEqual => RelationalOp::LessOrEqual,
                TokenKind::Greater => RelationalOp::Greater,
                TokenKind::GreaterOrEqual => RelationalOp::GreaterOrEqual,
                _ => return Ok(left),
            };
            self.advance();
            op
        };

        let right = self.parse_additive()?;
        Ok(Expr::relational(op, left, right))
    }

    // ========== Scalar expressions ==========

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Add => ArithmeticOp::Add,
                TokenKind::Sub => ArithmeticOp::Subtract,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Mul => ArithmeticOp::Multiply,
                TokenKind::Div => ArithmeticOp::Divide,
                TokenKind::Mod => ArithmeticOp::Modulo,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.consume(TokenKind::Sub) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek().kind {
            TokenKind::Number => {
                let token = self.advance();
                Ok(Expr::Literal(number_literal(&token)?))
            }
            TokenKind::String => {
                let token = self.advance();
                let value = token
                    .string_value()
                    .ok_or_else(|| Error::syntax("string", token.describe(), token.position))?;
                Ok(Expr::Literal(Value::String(value)))
            }
            TokenKind::LeftCurly => self.parse_parameter(),
            TokenKind::LeftParen => {
                self.advance();
                if self.check_keyword("select") {
                    let query = self.parse_select()?;
                    self.expect(TokenKind::RightParen)?;
                    return Ok(Expr::Query(Box::new(query)));
                }
                let expr = self.parse_or()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::Mul => {
                self.advance();
                Ok(Expr::Asterisk(None))
            }
            TokenKind::Keyword => self.parse_keyword_primary(),
            _ => Err(self.error("expression")),
        }
    }

    fn parse_parameter(&mut self) -> Result<Expr> {
        self.expect(TokenKind::LeftCurly)?;
        let token = self.expect(TokenKind::Number)?;
        let index = token
            .text
            .parse::<usize>()
            .map_err(|_| Error::syntax("parameter index", token.describe(), token.position))?;
        let modifier = if self.consume(TokenKind::Colon) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        self.expect(TokenKind::RightCurly)?;
        Ok(Expr::Parameter { index, modifier })
    }

    fn parse_keyword_primary(&mut self) -> Result<Expr> {
        let lower = self.peek().lower.clone();
        match lower.as_str() {
            "true" => {
                self.advance();
                Ok(Expr::BooleanLiteral(true))
            }
            "false" => {
                self.advance();
                Ok(Expr::BooleanLiteral(false))
            }
            "null" => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            "exists" if self.peek_at(1).kind == TokenKind::LeftParen => {
                self.advance();
                self.advance();
                let query = self.parse_nested_query()?;
                self.expect(TokenKind::RightParen)?;
                Ok(Expr::Exists(Box::new(query)))
            }
            "rawquery" if self.peek_at(1).kind == TokenKind::LeftParen => self.parse_raw(),
            "soodaclass" if self.peek_at(1).kind != TokenKind::LeftParen => {
                self.advance();
                Ok(Expr::ClassTag(None))
            }
            _ if self.starts_short_query() => {
                let query = self.parse_nested_query()?;
                Ok(Expr::Query(Box::new(query)))
            }
            _ => self.parse_path_or_call(),
        }
    }

    /// `RAWQUERY(...)`: source text up to the matching parenthesis
    fn parse_raw(&mut self) -> Result<Expr> {
        self.advance();
        let open = self.expect(TokenKind::LeftParen)?;
        let start = open.position + 1;
        let mut depth = 1usize;
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        let text = self.source[start..token.position].trim().to_string();
                        return Ok(Expr::Raw(text));
                    }
                }
                TokenKind::Eof => {
                    return Err(Error::syntax("')'", token.describe(), token.position));
                }
                _ => {}
            }
        }
    }

    fn parse_path_or_call(&mut self) -> Result<Expr> {
        let first = self.expect(TokenKind::Keyword)?;

        if self.check(TokenKind::LeftParen) {
            let args = self.parse_arguments()?;
            return Ok(Expr::Function {
                name: first.text,
                args,
            });
        }

        let mut path = PathExpr::new(first.text);
        while self.consume(TokenKind::Dot) {
            if self.consume(TokenKind::Mul) {
                return Ok(Expr::Asterisk(Some(path)));
            }

            let segment = self.expect(TokenKind::Keyword)?;
            let next = self.peek().kind;

            if segment.is_keyword("count") && next != TokenKind::LeftParen {
                let PathExpr { left, name } = path;
                return Ok(Expr::Count {
                    path: left.map(|l| *l),
                    collection: name,
                });
            }

            if segment.is_keyword("contains") && next == TokenKind::LeftParen {
                self.advance();
                let element = self.parse_contains_element()?;
                self.expect(TokenKind::RightParen)?;
                let PathExpr { left, name } = path;
                return Ok(Expr::Contains {
                    path: left.map(|l| *l),
                    collection: name,
                    element: Box::new(element),
                });
            }

            if segment.is_keyword("soodaclass") && next != TokenKind::LeftParen {
                return Ok(Expr::ClassTag(Some(path)));
            }

            path = path.child(segment.text);
        }

        Ok(Expr::Path(path))
    }

    /// Argument of `Contains`: an expression, or `Class where predicate`
    /// whose predicate applies to the collection's elements
    fn parse_contains_element(&mut self) -> Result<Expr> {
        if self.starts_short_query() {
            self.advance();
            self.advance();
        }
        self.parse_or()
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_or()?);
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(args)
    }
}

/// Literal value of a number token.
///
/// The lexer accepts any run of digits and dots; malformed numbers such as
/// `1.2.3` are rejected here.
fn number_literal(token: &Token) -> Result<Value> {
    let text = token.text.as_str();
    let invalid = || Error::syntax("numeric literal", token.describe(), token.position);

    if text.contains('.') {
        if text.matches('.').count() > 1 || text.ends_with('.') {
            return Err(invalid());
        }
        return Decimal::from_str(text)
            .map(Value::Decimal)
            .map_err(|_| invalid());
    }

    if let Ok(v) = text.parse::<i32>() {
        return Ok(Value::Int32(v));
    }
    if let Ok(v) = text.parse::<i64>() {
        return Ok(Value::Int64(v));
    }
    Decimal::from_str(text)
        .map(Value::Decimal)
        .map_err(|_| invalid())
}
