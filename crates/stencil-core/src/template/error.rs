//! Template compile error types

use std::fmt;

/// Reason a template body failed to compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// `${` opened but never closed
    UnterminatedFragment,

    /// String literal inside a fragment never closed
    UnterminatedString,

    /// `${}` with nothing but whitespace inside
    EmptyFragment,

    /// Token the expression parser did not expect
    UnexpectedToken {
        /// Textual form of what was found
        found: String,
        /// What the parser was looking for
        expected: String,
    },

    /// Character that cannot start any token
    InvalidCharacter(char),

    /// Number literal that does not parse
    InvalidNumber(String),

    /// Expression nested past the given limit
    NestingTooDeep(usize),
}

/// Compile failure located in the original template file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Failure classification
    pub kind: SyntaxErrorKind,
    /// 1-based line in the template file
    pub line: usize,
    /// 1-based column in the template file
    pub column: usize,
}

impl SyntaxError {
    pub(crate) fn new(kind: SyntaxErrorKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxErrorKind::UnterminatedFragment => {
                write!(f, "Unterminated ${{...}} fragment")
            }
            SyntaxErrorKind::UnterminatedString => write!(f, "Unterminated string literal"),
            SyntaxErrorKind::EmptyFragment => write!(f, "Empty ${{}} fragment"),
            SyntaxErrorKind::UnexpectedToken { found, expected } => {
                write!(f, "Unexpected {}, expected {}", found, expected)
            }
            SyntaxErrorKind::InvalidCharacter(c) => write!(f, "Invalid character '{}'", c),
            SyntaxErrorKind::InvalidNumber(text) => write!(f, "Invalid number '{}'", text),
            SyntaxErrorKind::NestingTooDeep(limit) => {
                write!(f, "Expression nested deeper than {} levels", limit)
            }
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Malformed syntax at line {}, column {}: {}",
            self.line, self.column, self.kind
        )
    }
}

impl std::error::Error for SyntaxError {}
