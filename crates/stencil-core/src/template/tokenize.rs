//! Fragment scanning for template bodies
//!
//! Splits raw template text into literal text and `${...}` fragments in a
//! single forward-only pass.

use crate::template::error::{SyntaxError, SyntaxErrorKind};

/// One piece of a scanned template
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    /// Literal text, escapes already applied
    Text(String),

    /// Raw expression source between `${` and the matching `}`
    Fragment {
        source: String,
        /// Line of the first byte after `${`
        line: usize,
        /// Column of the first byte after `${`
        column: usize,
    },
}

/// Scanner state machine
///
/// ```text
/// Normal ──$──> SeenDollar ──{──> InFragment ──}(depth 0)──> [Yield Fragment] → Normal
///   │              │                 │    ▲
///   │ (\)          │ (not {)         │ '"`│ closing quote
///   └─count        └──> Normal       └──> InString
/// ```
///
/// Braces inside a fragment nest (`${ {a: 1}.a }`), and braces inside string
/// literals are ignored, so the fragment ends at the `}` that balances `${`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ScanState {
    /// Literal text, counting consecutive backslashes seen so far
    Normal { backslash_count: usize },

    /// Seen `$`, checking for `{`
    SeenDollar { backslash_count: usize },

    /// Inside `${...}` with `depth` unclosed inner braces
    InFragment { depth: usize },

    /// Inside a quoted string within a fragment
    InString {
        depth: usize,
        quote: u8,
        escaped: bool,
    },
}

/// Where the currently open fragment started
#[derive(Debug, Clone, Copy)]
struct FragmentStart {
    /// Position of the `$` (for error reporting)
    open_line: usize,
    open_column: usize,
    /// Byte offset of the first content byte
    content_start: usize,
    line: usize,
    column: usize,
}

/// Iterator over the pieces of a template body
///
/// Each byte is visited once. Line and column are tracked in characters so
/// locations match what an editor shows for the template file.
pub(crate) struct FragmentScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    state: ScanState,
    line: usize,
    column: usize,
    /// Position of the most recent `$` in Normal state
    dollar_at: (usize, usize),
    text: Vec<u8>,
    fragment: Option<FragmentStart>,
    done: bool,
}

impl<'a> FragmentScanner<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            bytes: source.as_bytes(),
            pos: 0,
            state: ScanState::Normal { backslash_count: 0 },
            line: 1,
            column: 1,
            dollar_at: (1, 1),
            text: Vec::new(),
            fragment: None,
            done: false,
        }
    }

    /// Move past one byte, keeping line/column in sync
    #[inline]
    fn advance(&mut self, byte: u8) {
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if byte & 0xC0 != 0x80 {
            // UTF-8 continuation bytes do not start a new column
            self.column += 1;
        }
    }

    fn push_backslashes(&mut self, count: usize) {
        self.text.extend(std::iter::repeat(b'\\').take(count));
    }

    fn take_text(&mut self) -> Option<Piece> {
        if self.text.is_empty() {
            return None;
        }
        let bytes = std::mem::take(&mut self.text);
        Some(Piece::Text(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Flush state at end of input
    fn finish(&mut self) -> Option<Result<Piece, SyntaxError>> {
        match self.state {
            ScanState::Normal { backslash_count } => self.push_backslashes(backslash_count),
            ScanState::SeenDollar { backslash_count } => {
                self.push_backslashes(backslash_count);
                self.text.push(b'$');
            }
            ScanState::InFragment { .. } | ScanState::InString { .. } => {
                let kind = if matches!(self.state, ScanState::InString { .. }) {
                    SyntaxErrorKind::UnterminatedString
                } else {
                    SyntaxErrorKind::UnterminatedFragment
                };
                let (line, column) = self
                    .fragment
                    .map(|f| (f.open_line, f.open_column))
                    .unwrap_or((self.line, self.column));
                return Some(Err(SyntaxError::new(kind, line, column)));
            }
        }
        self.take_text().map(Ok)
    }

    /// Handle `{` after `$`: either an escaped literal or a fragment opening
    ///
    /// Returns a text piece to yield when a fragment opens after pending text.
    fn open_fragment(&mut self, backslash_count: usize) -> Option<Piece> {
        self.push_backslashes(backslash_count / 2);
        self.advance(b'{');

        if backslash_count % 2 == 1 {
            self.text.extend_from_slice(b"${");
            self.state = ScanState::Normal { backslash_count: 0 };
            return None;
        }

        self.fragment = Some(FragmentStart {
            open_line: self.dollar_at.0,
            open_column: self.dollar_at.1,
            content_start: self.pos,
            line: self.line,
            column: self.column,
        });
        self.state = ScanState::InFragment { depth: 0 };
        self.take_text()
    }

    /// Handle the `}` that balances `${`
    fn close_fragment(&mut self) -> Option<Piece> {
        let start = self.fragment.take()?;
        let source = String::from_utf8_lossy(&self.bytes[start.content_start..self.pos]).into_owned();
        self.advance(b'}');
        self.state = ScanState::Normal { backslash_count: 0 };
        Some(Piece::Fragment {
            source,
            line: start.line,
            column: start.column,
        })
    }
}

impl Iterator for FragmentScanner<'_> {
    type Item = Result<Piece, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if self.pos >= self.bytes.len() {
                self.done = true;
                return self.finish();
            }

            let byte = self.bytes[self.pos];
            match self.state {
                ScanState::Normal { backslash_count } => match byte {
                    b'\\' => {
                        self.state = ScanState::Normal {
                            backslash_count: backslash_count + 1,
                        };
                        self.advance(byte);
                    }
                    b'$' => {
                        self.dollar_at = (self.line, self.column);
                        self.state = ScanState::SeenDollar { backslash_count };
                        self.advance(byte);
                    }
                    _ => {
                        self.push_backslashes(backslash_count);
                        self.text.push(byte);
                        self.state = ScanState::Normal { backslash_count: 0 };
                        self.advance(byte);
                    }
                },
                ScanState::SeenDollar { backslash_count } => {
                    if byte == b'{' {
                        if let Some(text) = self.open_fragment(backslash_count) {
                            return Some(Ok(text));
                        }
                    } else {
                        self.push_backslashes(backslash_count);
                        self.text.push(b'$');
                        // Reprocess this byte as plain text
                        self.state = ScanState::Normal { backslash_count: 0 };
                    }
                }
                ScanState::InFragment { depth } => match byte {
                    b'}' if depth == 0 => {
                        if let Some(fragment) = self.close_fragment() {
                            return Some(Ok(fragment));
                        }
                    }
                    b'}' => {
                        self.state = ScanState::InFragment { depth: depth - 1 };
                        self.advance(byte);
                    }
                    b'{' => {
                        self.state = ScanState::InFragment { depth: depth + 1 };
                        self.advance(byte);
                    }
                    b'\'' | b'"' | b'`' => {
                        self.state = ScanState::InString {
                            depth,
                            quote: byte,
                            escaped: false,
                        };
                        self.advance(byte);
                    }
                    _ => self.advance(byte),
                },
                ScanState::InString {
                    depth,
                    quote,
                    escaped,
                } => {
                    self.state = if escaped {
                        ScanState::InString {
                            depth,
                            quote,
                            escaped: false,
                        }
                    } else if byte == b'\\' {
                        ScanState::InString {
                            depth,
                            quote,
                            escaped: true,
                        }
                    } else if byte == quote {
                        ScanState::InFragment { depth }
                    } else {
                        self.state
                    };
                    self.advance(byte);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<Piece> {
        FragmentScanner::new(text)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn fragment(source: &str, line: usize, column: usize) -> Piece {
        Piece::Fragment {
            source: source.to_string(),
            line,
            column,
        }
    }

    #[test]
    fn test_plain_text_is_single_piece() {
        assert_eq!(scan("hello world"), vec![Piece::Text("hello world".into())]);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(scan("").is_empty());
    }

    #[test]
    fn test_text_and_fragment() {
        assert_eq!(
            scan("Hello ${name}!"),
            vec![
                Piece::Text("Hello ".into()),
                fragment("name", 1, 9),
                Piece::Text("!".into()),
            ]
        );
    }

    #[test]
    fn test_fragment_location_on_later_line() {
        let pieces = scan("a\nbb\n  ${x}");
        assert_eq!(pieces[1], fragment("x", 3, 5));
    }

    #[test]
    fn test_nested_braces_stay_in_fragment() {
        let pieces = scan("${include('a', {x: 1})} tail");
        assert_eq!(pieces[0], fragment("include('a', {x: 1})", 1, 3));
        assert_eq!(pieces[1], Piece::Text(" tail".into()));
    }

    #[test]
    fn test_brace_inside_string_is_ignored() {
        let pieces = scan(r#"${"}" + '{'}"#);
        assert_eq!(pieces, vec![fragment(r#""}" + '{'"#, 1, 3)]);
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let pieces = scan(r#"${'it\'s }'}"#);
        assert_eq!(pieces, vec![fragment(r#"'it\'s }'"#, 1, 3)]);
    }

    #[test]
    fn test_single_backslash_escapes_fragment() {
        assert_eq!(scan(r"cost: \${price}"), vec![Piece::Text("cost: ${price}".into())]);
    }

    #[test]
    fn test_double_backslash_renders_one_and_keeps_fragment() {
        assert_eq!(
            scan(r"\\${x}"),
            vec![Piece::Text(r"\".into()), fragment("x", 1, 5)]
        );
    }

    #[test]
    fn test_backslashes_not_before_fragment_are_literal() {
        assert_eq!(scan(r"a\\b\n"), vec![Piece::Text(r"a\\b\n".into())]);
        assert_eq!(scan(r"\` \$ end\"), vec![Piece::Text(r"\` \$ end\".into())]);
    }

    #[test]
    fn test_lone_dollar_is_literal() {
        assert_eq!(scan("$5 and $"), vec![Piece::Text("$5 and $".into())]);
    }

    #[test]
    fn test_unterminated_fragment_reports_open_position() {
        let err = FragmentScanner::new("ok\n  ${name")
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnterminatedFragment);
        assert_eq!((err.line, err.column), (2, 3));
    }

    #[test]
    fn test_unterminated_string_in_fragment() {
        let err = FragmentScanner::new("${'abc}")
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnterminatedString);
    }

    #[test]
    fn test_columns_count_characters_not_bytes() {
        let pieces = scan("héllo ${x}");
        assert_eq!(pieces[1], fragment("x", 1, 9));
    }
}
