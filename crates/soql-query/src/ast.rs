//! Abstract syntax tree for SOQL expressions and queries
//!
//! Nodes are plain data. Traversals (printing, simplification, evaluation,
//! class analysis, SQL translation) live in their own modules and reach the
//! nodes through [`crate::visitor::ExprVisitor`].

use serde::{Deserialize, Serialize};
use soql_core::Value;

/// Arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl ArithmeticOp {
    /// Operator as written in SOQL and SQL
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Modulo => "%",
        }
    }
}

/// Relational operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationalOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Like,
}

impl RelationalOp {
    /// Operator as written in SOQL and SQL
    pub fn symbol(self) -> &'static str {
        match self {
            RelationalOp::Equal => "=",
            RelationalOp::NotEqual => "<>",
            RelationalOp::Less => "<",
            RelationalOp::LessOrEqual => "<=",
            RelationalOp::Greater => ">",
            RelationalOp::GreaterOrEqual => ">=",
            RelationalOp::Like => "like",
        }
    }
}

/// Dotted property chain: `left.name`, or just `name` off the current root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathExpr {
    pub left: Option<Box<PathExpr>>,
    pub name: String,
}

impl PathExpr {
    /// A single property of the root object
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            left: None,
            name: name.into(),
        }
    }

    /// Extend this path by one property
    pub fn child(self, name: impl Into<String>) -> Self {
        Self {
            left: Some(Box::new(self)),
            name: name.into(),
        }
    }

    /// Build a path from its segments, root first
    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut iter = segments.into_iter();
        let mut path = PathExpr::new(iter.next()?);
        for segment in iter {
            path = path.child(segment);
        }
        Some(path)
    }

    /// Segments of the path, root first
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = match &self.left {
            Some(left) => left.segments(),
            None => Vec::new(),
        };
        segments.push(&self.name);
        segments
    }

    /// Dotted text of the path
    pub fn dotted(&self) -> String {
        self.segments().join(".")
    }
}

/// SOQL expression
///
/// Boolean-valued variants may appear wherever a value is expected; they
/// evaluate to true, false or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    // ========== Scalar ==========
    /// Typed literal value
    Literal(Value),

    /// Positional parameter `{index}` or `{index:modifier}`
    Parameter {
        index: usize,
        modifier: Option<String>,
    },

    /// Property path
    Path(PathExpr),

    /// Arithmetic on two operands
    Binary {
        op: ArithmeticOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary minus
    Negate(Box<Expr>),

    /// Function call
    Function { name: String, args: Vec<Expr> },

    /// Opaque text passed through to the backend unchanged
    Raw(String),

    /// Nested query used as a value
    Query(Box<Query>),

    // ========== Boolean ==========
    And(Box<Expr>, Box<Expr>),

    Or(Box<Expr>, Box<Expr>),

    Not(Box<Expr>),

    /// Relational comparison
    Relational {
        op: RelationalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `operand in (candidates...)`
    In {
        operand: Box<Expr>,
        candidates: Vec<Expr>,
    },

    /// `operand is [not] null`
    IsNull { operand: Box<Expr>, negated: bool },

    /// `true` / `false`
    BooleanLiteral(bool),

    /// `exists(query)`
    Exists(Box<Query>),

    /// `path.Collection.Count`
    Count {
        path: Option<PathExpr>,
        collection: String,
    },

    /// `path.Collection.Contains(element)`; `element` is evaluated against
    /// the collection's element class
    Contains {
        path: Option<PathExpr>,
        collection: String,
        element: Box<Expr>,
    },

    /// `*` or `path.*`
    Asterisk(Option<PathExpr>),

    /// `SoodaClass` or `path.SoodaClass`: name of the object's class
    ClassTag(Option<PathExpr>),
}

impl Expr {
    /// Literal helper
    pub fn literal<V: Into<Value>>(value: V) -> Self {
        Expr::Literal(value.into())
    }

    /// Path helper taking dotted text
    pub fn path(dotted: &str) -> Self {
        match PathExpr::from_segments(dotted.split('.')) {
            Some(path) => Expr::Path(path),
            None => Expr::Literal(Value::Null),
        }
    }

    /// Parameter helper
    pub fn parameter(index: usize) -> Self {
        Expr::Parameter {
            index,
            modifier: None,
        }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Expr) -> Self {
        Expr::Not(Box::new(operand))
    }

    pub fn binary(op: ArithmeticOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn relational(op: RelationalOp, left: Expr, right: Expr) -> Self {
        Expr::Relational {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn in_list(operand: Expr, candidates: Vec<Expr>) -> Self {
        Expr::In {
            operand: Box::new(operand),
            candidates,
        }
    }

    /// Returns true for the boolean-valued node kinds
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Expr::And(..)
                | Expr::Or(..)
                | Expr::Not(_)
                | Expr::Relational { .. }
                | Expr::In { .. }
                | Expr::IsNull { .. }
                | Expr::BooleanLiteral(_)
                | Expr::Exists(_)
                | Expr::Contains { .. }
        )
    }

    /// Returns true for nodes whose type is only known at run time
    pub fn is_host_typed(&self) -> bool {
        matches!(
            self,
            Expr::Path(_) | Expr::Parameter { .. } | Expr::Function { .. } | Expr::Raw(_)
        )
    }

    /// Returns true for literal nodes (including boolean literals)
    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Literal(_) | Expr::BooleanLiteral(_))
    }

    /// Value of a literal node
    pub fn constant_value(&self) -> Option<Value> {
        match self {
            Expr::Literal(value) => Some(value.clone()),
            Expr::BooleanLiteral(b) => Some(Value::Boolean(*b)),
            _ => None,
        }
    }

    /// Build the literal node that represents `value`
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Boolean(b) => Expr::BooleanLiteral(b),
            other => Expr::Literal(other),
        }
    }

    /// The OR-of-equalities equivalent of `operand in (candidates)`.
    ///
    /// An empty candidate list is the constant `false`.
    pub fn expand_in(operand: &Expr, candidates: &[Expr]) -> Expr {
        let mut iter = candidates.iter();
        let first = match iter.next() {
            Some(first) => first,
            None => return Expr::BooleanLiteral(false),
        };
        let mut result = Expr::relational(RelationalOp::Equal, operand.clone(), first.clone());
        for candidate in iter {
            result = Expr::or(
                result,
                Expr::relational(RelationalOp::Equal, operand.clone(), candidate.clone()),
            );
        }
        result
    }
}

/// Item in the select list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    pub expression: Expr,
    pub alias: Option<String>,
}

/// Class in the from list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromItem {
    pub class: String,
    pub alias: Option<String>,
}

/// Item in the order by list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub expression: Expr,
    pub ascending: bool,
}

/// A complete query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub distinct: bool,
    pub select: Vec<SelectItem>,
    pub from: Vec<FromItem>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderItem>,
}

impl Query {
    /// `select * from class where condition`
    pub fn select_all(class: impl Into<String>, where_clause: Option<Expr>) -> Self {
        Self {
            distinct: false,
            select: vec![SelectItem {
                expression: Expr::Asterisk(None),
                alias: None,
            }],
            from: vec![FromItem {
                class: class.into(),
                alias: None,
            }],
            where_clause,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
        }
    }

    /// Class of the first from item
    pub fn root_class(&self) -> Option<&str> {
        self.from.first().map(|f| f.class.as_str())
    }
}
