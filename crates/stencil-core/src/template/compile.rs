//! Template compiler
//!
//! Turns raw template text into a [`CompiledUnit`]: literal text interleaved
//! with parsed fragment expressions. Each fragment is parsed with its origin
//! (line/column of the first byte after `${`) as the lexer's starting
//! position, so every node carries its location in the template file.

use crate::template::error::SyntaxError;
use crate::template::expr::{parse_fragment, Expr, Span};
use crate::template::tokenize::{FragmentScanner, Piece};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// One piece of a compiled template
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Fragment(Expr),
}

/// Immutable, reusable representation of one template file
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledUnit {
    path: PathBuf,
    segments: Vec<Segment>,
}

impl CompiledUnit {
    /// File this unit was compiled from; failures are attributed to it
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of `${...}` fragments
    pub fn fragment_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Fragment(_)))
            .count()
    }
}

/// Compiles template bodies and counts how often it does so
#[derive(Debug, Default)]
pub struct Compiler {
    compiled: AtomicUsize,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `source`, attributing it to `path`
    ///
    /// Every call counts, including ones that fail.
    pub fn compile(&self, path: &Path, source: &str) -> Result<CompiledUnit, SyntaxError> {
        self.compiled.fetch_add(1, Ordering::SeqCst);

        let mut segments = Vec::new();
        for piece in FragmentScanner::new(source) {
            match piece? {
                Piece::Text(text) => segments.push(Segment::Text(text)),
                Piece::Fragment {
                    source,
                    line,
                    column,
                } => {
                    let expr = parse_fragment(&source, Span::new(line, column))?;
                    segments.push(Segment::Fragment(expr));
                }
            }
        }

        Ok(CompiledUnit {
            path: path.to_path_buf(),
            segments,
        })
    }

    /// Total compile attempts since construction
    pub fn compile_count(&self) -> usize {
        self.compiled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::error::SyntaxErrorKind;
    use crate::template::expr::ExprKind;

    #[test]
    fn test_compile_mixed_template() {
        let compiler = Compiler::new();
        let unit = compiler
            .compile(Path::new("/views/page.template"), "Hi ${name}, bye")
            .unwrap();

        assert_eq!(unit.path(), Path::new("/views/page.template"));
        assert_eq!(unit.fragment_count(), 1);
        assert_eq!(unit.segments()[0], Segment::Text("Hi ".into()));
        match &unit.segments()[1] {
            Segment::Fragment(expr) => {
                assert_eq!(expr.kind, ExprKind::Ident("name".into()));
                assert_eq!(expr.span, Span::new(1, 6));
            }
            other => panic!("Expected fragment, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_error_has_file_location() {
        let compiler = Compiler::new();
        let err = compiler
            .compile(Path::new("/v/a.template"), "line one\nline two ${ 1 + }\n")
            .unwrap_err();

        assert!(matches!(err.kind, SyntaxErrorKind::UnexpectedToken { .. }));
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 17);
    }

    #[test]
    fn test_compile_count_includes_failures() {
        let compiler = Compiler::new();
        let path = Path::new("/v/a.template");
        compiler.compile(path, "ok").unwrap();
        compiler.compile(path, "${").unwrap_err();
        assert_eq!(compiler.compile_count(), 2);
    }

    #[test]
    fn test_plain_text_has_no_fragments() {
        let unit = Compiler::new()
            .compile(Path::new("/v/a.template"), "just text")
            .unwrap();
        assert_eq!(unit.fragment_count(), 0);
    }
}
