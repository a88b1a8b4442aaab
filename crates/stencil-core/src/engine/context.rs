//! Execution context builder
//!
//! Every render call gets a fresh context holding exactly the names its
//! fragments may reference. Nothing from the host process is reachable except
//! through these bindings. This keeps templates from leaking state into each
//! other; it is not a security boundary.

use crate::config::consts::metadata;
use crate::engine::options::ViewSettings;
use crate::engine::Engine;
use crate::error::{Frame, RenderError};
use crate::path::template_stem;
use crate::template::expr::Span;
use crate::template::{Builtin, Map, Value};
use std::path::{Path, PathBuf};

/// State owned by one render invocation
#[derive(Debug, Default)]
pub(crate) struct Session {
    store: Map,
    exports: Option<Map>,
}

impl Session {
    /// `exports` is `Some` when the invocation acts as an export target
    pub(crate) fn new(exports: Option<Map>) -> Self {
        Self {
            store: Map::new(),
            exports,
        }
    }

    pub(crate) fn set(&mut self, key: String, value: Value) {
        self.store.insert(key, value);
    }

    pub(crate) fn get(&self, key: &str) -> Value {
        self.store.get(key).cloned().unwrap_or_default()
    }

    /// Record an exported variable; ignored outside an export target
    pub(crate) fn export(&mut self, key: String, value: Value) {
        if let Some(exports) = self.exports.as_mut() {
            exports.insert(key, value);
        }
    }

    pub(crate) fn into_exports(self) -> Option<Map> {
        self.exports
    }
}

/// Names visible to one execution of a compiled unit
#[derive(Debug)]
pub(crate) struct ExecutionContext {
    pub(crate) engine: Engine,
    pub(crate) path: PathBuf,
    /// Caller locals as received, forwarded to nested includes
    pub(crate) locals: Map,
    pub(crate) settings: Option<ViewSettings>,
    pub(crate) session: Session,
    bindings: Map,
}

impl ExecutionContext {
    pub(crate) fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Runtime failure located at `span` in this template
    pub(crate) fn fail(&self, span: Span, message: impl Into<String>) -> RenderError {
        RenderError::runtime(message, Frame::template(&self.path, span.line, span.column))
    }

    pub(crate) fn frame(&self, span: Span) -> Frame {
        Frame::template(&self.path, span.line, span.column)
    }
}

/// Assemble the context for rendering `path`
///
/// Later layers win on name collisions: Injected Globals, then caller
/// locals, then capabilities and identity metadata.
pub(crate) fn build_context(
    engine: &Engine,
    path: &Path,
    locals: Map,
    settings: Option<ViewSettings>,
    session: Session,
) -> ExecutionContext {
    let mut bindings = engine.globals().clone();
    bindings.extend(locals.iter().map(|(k, v)| (k.clone(), v.clone())));

    for builtin in Builtin::ALL {
        bindings.insert(builtin.name().to_string(), Value::Builtin(builtin));
    }

    bindings.insert(metadata::TEMPLATE.to_string(), Value::from(template_stem(path)));
    bindings.insert(
        metadata::FILENAME.to_string(),
        Value::from(path.display().to_string()),
    );
    bindings.insert(
        metadata::DIRNAME.to_string(),
        Value::from(
            path.parent()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
        ),
    );

    ExecutionContext {
        engine: engine.clone(),
        path: path.to_path_buf(),
        locals,
        settings,
        session,
        bindings,
    }
}
