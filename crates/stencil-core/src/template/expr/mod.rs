//! Expression language used inside `${...}` fragments

pub mod ast;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr, ExprKind, LogicalOp, Span, UnaryOp};
pub(crate) use parser::parse_fragment;
