//! Recursive-descent expression parser
//!
//! Precedence, lowest first:
//!
//! ```text
//! conditional   a ? b : c
//! logical_or    ||  ??
//! logical_and   &&
//! equality      ==  !=  ===  !==
//! relational    <  <=  >  >=
//! additive      +  -
//! multiplicative *  /  %
//! unary         !  -  +  await
//! postfix       a.b  a[b]  a(b)
//! primary       literals, names, (expr), [..], {..}
//! ```

use super::ast::{BinaryOp, Expr, ExprKind, LogicalOp, Span, UnaryOp};
use super::lexer::{lex, Lexed, Tok};
use crate::template::error::{SyntaxError, SyntaxErrorKind};
use crate::template::value::Value;

/// Deepest nesting a fragment may use, both in parser recursion and in the
/// height of the resulting tree
pub(crate) const MAX_NESTING: usize = 64;

struct Parser {
    tokens: Vec<Lexed>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Lexed {
        // The token list always ends with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Lexed {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_punct(&self, punct: &str) -> bool {
        matches!(&self.peek().tok, Tok::Punct(p) if *p == punct)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.at_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let token = self.peek();
        SyntaxError::new(
            SyntaxErrorKind::UnexpectedToken {
                found: token.tok.to_string(),
                expected: expected.to_string(),
            },
            token.span.line,
            token.span.column,
        )
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), SyntaxError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", punct)))
        }
    }

    fn too_deep(&self) -> SyntaxError {
        let span = self.peek().span;
        SyntaxError::new(
            SyntaxErrorKind::NestingTooDeep(MAX_NESTING),
            span.line,
            span.column,
        )
    }

    /// Run a recursive production one level deeper
    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Expr, SyntaxError>,
    ) -> Result<Expr, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Build a node, rejecting trees taller than the nesting limit
    fn node(&self, kind: ExprKind, span: Span) -> Result<Expr, SyntaxError> {
        let expr = Expr::new(kind, span);
        if expr.depth() > MAX_NESTING {
            return Err(self.too_deep());
        }
        Ok(expr)
    }

    fn logical(&self, op: LogicalOp, left: Expr, right: Expr) -> Result<Expr, SyntaxError> {
        let span = left.span;
        self.node(
            ExprKind::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::conditional)
    }

    fn conditional(&mut self) -> Result<Expr, SyntaxError> {
        let test = self.logical_or()?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.nested(Self::conditional)?;
        self.expect_punct(":")?;
        let alternate = self.nested(Self::conditional)?;
        let span = test.span;
        self.node(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        )
    }

    fn logical_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.logical_and()?;
        loop {
            let op = if self.eat_punct("||") {
                LogicalOp::Or
            } else if self.eat_punct("??") {
                LogicalOp::Nullish
            } else {
                return Ok(left);
            };
            let right = self.logical_and()?;
            left = self.logical(op, left, right)?;
        }
    }

    fn logical_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.equality()?;
        while self.eat_punct("&&") {
            let right = self.equality()?;
            left = self.logical(LogicalOp::And, left, right)?;
        }
        Ok(left)
    }

    /// One left-associative binary precedence level
    fn binary_level(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, SyntaxError>,
    ) -> Result<Expr, SyntaxError> {
        let mut left = next(self)?;
        'outer: loop {
            for (punct, op) in ops {
                if self.eat_punct(punct) {
                    let right = next(self)?;
                    let span = left.span;
                    left = self.node(
                        ExprKind::Binary {
                            op: *op,
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        span,
                    )?;
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn equality(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNe),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::Ne),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(&[("+", BinaryOp::Add), ("-", BinaryOp::Sub)], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let span = self.peek().span;
        let op = if self.eat_punct("!") {
            Some(UnaryOp::Not)
        } else if self.eat_punct("-") {
            Some(UnaryOp::Neg)
        } else if self.eat_punct("+") {
            Some(UnaryOp::Plus)
        } else {
            None
        };
        if let Some(op) = op {
            let operand = self.nested(Self::unary)?;
            return self.node(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            );
        }

        if matches!(&self.peek().tok, Tok::Ident(name) if name == "await") {
            self.advance();
            let operand = self.nested(Self::unary)?;
            return self.node(ExprKind::Await(Box::new(operand)), span);
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        loop {
            let span = self.peek().span;
            if self.eat_punct(".") {
                let property = match &self.peek().tok {
                    Tok::Ident(name) => name.clone(),
                    _ => return Err(self.unexpected("property name")),
                };
                self.advance();
                expr = self.node(
                    ExprKind::Member {
                        object: Box::new(expr),
                        property,
                    },
                    span,
                )?;
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = self.node(
                    ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                )?;
            } else if self.eat_punct("(") {
                let args = self.list(")")?;
                // Calls are located at the callee so traces point at the name
                let call_span = expr.span;
                expr = self.node(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    call_span,
                )?;
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed
    fn list(&mut self, close: &str) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        while !self.eat_punct(close) {
            items.push(self.expression()?);
            if !self.eat_punct(",") {
                self.expect_punct(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let Lexed { tok, span } = self.peek().clone();
        let kind = match tok {
            Tok::Number(n) => ExprKind::Literal(Value::Number(n)),
            Tok::Str(s) => ExprKind::Literal(Value::String(s)),
            Tok::Ident(name) => match name.as_str() {
                "true" => ExprKind::Literal(Value::Bool(true)),
                "false" => ExprKind::Literal(Value::Bool(false)),
                "null" => ExprKind::Literal(Value::Null),
                "undefined" => ExprKind::Literal(Value::Undefined),
                _ => ExprKind::Ident(name),
            },
            Tok::Punct("(") => {
                self.advance();
                let inner = self.expression()?;
                self.expect_punct(")")?;
                return Ok(inner);
            }
            Tok::Punct("[") => {
                self.advance();
                let items = self.list("]")?;
                return self.node(ExprKind::Array(items), span);
            }
            Tok::Punct("{") => {
                self.advance();
                return self.object(span);
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        self.node(kind, span)
    }

    fn object(&mut self, span: Span) -> Result<Expr, SyntaxError> {
        let mut props = Vec::new();
        while !self.eat_punct("}") {
            let key_token = self.advance();
            let key = match key_token.tok {
                Tok::Ident(name) => {
                    if !self.at_punct(":") {
                        // Shorthand `{name}`
                        let value = Expr::new(ExprKind::Ident(name.clone()), key_token.span);
                        props.push((name, value));
                        if !self.eat_punct(",") {
                            self.expect_punct("}")?;
                            break;
                        }
                        continue;
                    }
                    name
                }
                Tok::Str(s) => s,
                Tok::Number(n) => Value::Number(n).to_string(),
                other => {
                    return Err(SyntaxError::new(
                        SyntaxErrorKind::UnexpectedToken {
                            found: other.to_string(),
                            expected: "property name".to_string(),
                        },
                        key_token.span.line,
                        key_token.span.column,
                    ))
                }
            };
            self.expect_punct(":")?;
            let value = self.expression()?;
            props.push((key, value));
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        self.node(ExprKind::Object(props), span)
    }
}

/// Parse one fragment's source located at `origin` in the template file
pub(crate) fn parse_fragment(source: &str, origin: Span) -> Result<Expr, SyntaxError> {
    let tokens = lex(source, origin)?;
    if matches!(tokens.first(), Some(Lexed { tok: Tok::Eof, .. })) {
        return Err(SyntaxError::new(
            SyntaxErrorKind::EmptyFragment,
            origin.line,
            origin.column,
        ));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    if parser.peek().tok != Tok::Eof {
        return Err(parser.unexpected("end of fragment"));
    }
    Ok(expr)
}
