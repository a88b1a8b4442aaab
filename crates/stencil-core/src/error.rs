use crate::template::SyntaxError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// One entry in a runtime failure trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A location inside a template file (1-based)
    Template {
        path: PathBuf,
        line: usize,
        column: usize,
    },
    /// The engine's own execution machinery
    Internal(&'static str),
}

impl Frame {
    pub fn template(path: &Path, line: usize, column: usize) -> Self {
        Frame::Template {
            path: path.to_path_buf(),
            line,
            column,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Frame::Internal(_))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Template { path, line, column } => {
                write!(f, "at {}:{}:{}", path.display(), line, column)
            }
            Frame::Internal(name) => write!(f, "at <stencil internal: {}>", name),
        }
    }
}

fn format_trace(trace: &[Frame]) -> String {
    trace.iter().map(|frame| format!("\n    {}", frame)).collect()
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO_ERROR: failed to {operation} '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        source: std::io::Error,
    },

    #[error("COMPILE_ERROR: {}: {source}", .path.display())]
    Compile { path: PathBuf, source: SyntaxError },

    #[error("RUNTIME_ERROR: {message}{}", format_trace(.trace))]
    Runtime { message: String, trace: Vec<Frame> },

    #[error(
        "TIMEOUT: rendering '{}' did not finish within {}ms",
        .path.display(),
        .timeout.as_millis()
    )]
    Timeout { path: PathBuf, timeout: Duration },

    #[error("CONFIG_ERROR: {0}")]
    Config(String),
}

impl RenderError {
    /// Runtime failure located at `frame`
    pub fn runtime(message: impl Into<String>, frame: Frame) -> Self {
        RenderError::Runtime {
            message: message.into(),
            trace: vec![frame],
        }
    }

    /// Stable error code, the prefix of the display message
    pub fn code(&self) -> &'static str {
        match self {
            RenderError::Io { .. } => "IO_ERROR",
            RenderError::Compile { .. } => "COMPILE_ERROR",
            RenderError::Runtime { .. } => "RUNTIME_ERROR",
            RenderError::Timeout { .. } => "TIMEOUT",
            RenderError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Trace of a runtime failure; empty for every other kind
    pub fn trace(&self) -> &[Frame] {
        match self {
            RenderError::Runtime { trace, .. } => trace,
            _ => &[],
        }
    }

    /// Append `frame` to a runtime failure's trace; other kinds pass through
    pub fn with_frame(mut self, frame: Frame) -> Self {
        if let RenderError::Runtime { trace, .. } = &mut self {
            trace.push(frame);
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
