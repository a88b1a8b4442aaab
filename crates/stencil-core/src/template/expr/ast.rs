//! Expression syntax tree

use crate::template::value::Value;

/// Position of a node in the template file (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
}

/// Short-circuiting operators; they yield one of their operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Value),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Await(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    depth: usize,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        let children = match &kind {
            ExprKind::Literal(_) | ExprKind::Ident(_) => 0,
            ExprKind::Array(items) => max_depth(items.iter()),
            ExprKind::Object(props) => max_depth(props.iter().map(|(_, value)| value)),
            ExprKind::Member { object, .. } => object.depth,
            ExprKind::Index { object, index } => object.depth.max(index.depth),
            ExprKind::Call { callee, args } => callee.depth.max(max_depth(args.iter())),
            ExprKind::Unary { operand, .. } => operand.depth,
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                left.depth.max(right.depth)
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => test.depth.max(consequent.depth).max(alternate.depth),
            ExprKind::Await(inner) => inner.depth,
        };
        Self {
            kind,
            span,
            depth: children + 1,
        }
    }

    /// Height of the tree rooted here; a leaf has depth 1
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Short source-like description for error messages
    pub fn describe(&self) -> String {
        match &self.kind {
            ExprKind::Ident(name) => name.clone(),
            ExprKind::Member { object, property } => format!("{}.{}", object.describe(), property),
            ExprKind::Index { object, .. } => format!("{}[...]", object.describe()),
            ExprKind::Call { callee, .. } => format!("{}(...)", callee.describe()),
            _ => "expression".to_string(),
        }
    }
}

fn max_depth<'a>(exprs: impl Iterator<Item = &'a Expr>) -> usize {
    exprs.map(Expr::depth).max().unwrap_or(0)
}
