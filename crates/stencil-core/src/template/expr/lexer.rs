//! Expression lexer
//!
//! Positions are reported relative to the template file: the lexer starts at
//! the fragment's origin instead of line 1, column 1.

use super::ast::Span;
use crate::template::error::{SyntaxError, SyntaxErrorKind};
use std::fmt;

/// Multi-character punctuators first so the longest match wins
const PUNCTUATORS: [&str; 27] = [
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "??", "(", ")", "[", "]", "{", "}", ",",
    ":", ".", "?", "+", "-", "*", "/", "%", "<", ">", "!",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    Eof,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Number(n) => write!(f, "number {}", n),
            Tok::Str(_) => write!(f, "string literal"),
            Tok::Ident(name) => write!(f, "'{}'", name),
            Tok::Punct(p) => write!(f, "'{}'", p),
            Tok::Eof => write!(f, "end of fragment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lexed {
    pub tok: Tok,
    pub span: Span,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(source: &str, origin: Span) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: origin.line,
            column: origin.column,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    fn error(&self, kind: SyntaxErrorKind, at: Span) -> SyntaxError {
        SyntaxError::new(kind, at.line, at.column)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn run(mut self) -> Result<Vec<Lexed>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let span = self.span();
            let Some(c) = self.peek() else {
                tokens.push(Lexed { tok: Tok::Eof, span });
                return Ok(tokens);
            };

            let tok = if c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()))
            {
                self.number(span)?
            } else if c == '\'' || c == '"' || c == '`' {
                self.string(c, span)?
            } else if is_ident_start(c) {
                self.ident()
            } else {
                self.punct(c, span)?
            };
            tokens.push(Lexed { tok, span });
        }
    }

    fn number(&mut self, span: Span) -> Result<Tok, SyntaxError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        // `1abc` is not a number followed by a name
        if self.peek().is_some_and(is_ident_start) {
            while self.peek().is_some_and(is_ident_continue) {
                self.bump();
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Tok::Number)
            .map_err(|_| self.error(SyntaxErrorKind::InvalidNumber(text.clone()), span))
    }

    fn string(&mut self, quote: char, span: Span) -> Result<Tok, SyntaxError> {
        self.bump();
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error(SyntaxErrorKind::UnterminatedString, span));
            };
            if c == quote {
                return Ok(Tok::Str(out));
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            let Some(escaped) = self.bump() else {
                return Err(self.error(SyntaxErrorKind::UnterminatedString, span));
            };
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                'u' => out.push(self.unicode_escape()),
                // Line continuation
                '\n' => {}
                other => out.push(other),
            }
        }
    }

    /// `\uXXXX`; malformed escapes decode to U+FFFD
    fn unicode_escape(&mut self) -> char {
        let mut code = 0u32;
        for _ in 0..4 {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(digit) => {
                    code = code * 16 + digit;
                    self.bump();
                }
                None => return char::REPLACEMENT_CHARACTER,
            }
        }
        char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn ident(&mut self) -> Tok {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        Tok::Ident(self.chars[start..self.pos].iter().collect())
    }

    fn punct(&mut self, c: char, span: Span) -> Result<Tok, SyntaxError> {
        for punct in PUNCTUATORS {
            let matches = punct
                .chars()
                .enumerate()
                .all(|(i, p)| self.peek_at(i) == Some(p));
            if matches {
                for _ in 0..punct.chars().count() {
                    self.bump();
                }
                return Ok(Tok::Punct(punct));
            }
        }
        Err(self.error(SyntaxErrorKind::InvalidCharacter(c), span))
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

/// Tokenize one fragment's source, positioned at `origin`
pub(crate) fn lex(source: &str, origin: Span) -> Result<Vec<Lexed>, SyntaxError> {
    Lexer::new(source, origin).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(source: &str) -> Vec<Tok> {
        lex(source, Span::new(1, 1))
            .unwrap()
            .into_iter()
            .map(|l| l.tok)
            .collect()
    }

    #[test]
    fn test_lex_call_with_object() {
        assert_eq!(
            toks("include('a', {x: 1})"),
            vec![
                Tok::Ident("include".into()),
                Tok::Punct("("),
                Tok::Str("a".into()),
                Tok::Punct(","),
                Tok::Punct("{"),
                Tok::Ident("x".into()),
                Tok::Punct(":"),
                Tok::Number(1.0),
                Tok::Punct("}"),
                Tok::Punct(")"),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_longest_punctuator_wins() {
        assert_eq!(
            toks("a !== b ?? c"),
            vec![
                Tok::Ident("a".into()),
                Tok::Punct("!=="),
                Tok::Ident("b".into()),
                Tok::Punct("??"),
                Tok::Ident("c".into()),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(toks("1.5e2 .5 7")[..3], [Tok::Number(150.0), Tok::Number(0.5), Tok::Number(7.0)]);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(toks(r#""a\n\"b\" A""#)[0], Tok::Str("a\n\"b\" A".into()));
    }

    #[test]
    fn test_spans_are_offset_by_origin() {
        let lexed = lex("a +\n  b", Span::new(4, 10)).unwrap();
        assert_eq!(lexed[0].span, Span::new(4, 10));
        assert_eq!(lexed[1].span, Span::new(4, 12));
        assert_eq!(lexed[2].span, Span::new(5, 3));
    }

    #[test]
    fn test_invalid_character() {
        let err = lex("a = 1", Span::new(2, 5)).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::InvalidCharacter('='));
        assert_eq!((err.line, err.column), (2, 7));
    }

    #[test]
    fn test_number_glued_to_name_is_invalid() {
        let err = lex("1abc", Span::new(1, 1)).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::InvalidNumber("1abc".into()));
    }
}
