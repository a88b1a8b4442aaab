//! Renderer and include resolver
//!
//! A single invocation resolves a name to its Template Identity, brings the
//! cache up to date under that path's lock, builds a fresh context and runs
//! the unit under the configured timeout. Nested `include(...)` and
//! `import_vars(...)` calls re-enter here with their own invocation.

use crate::engine::context::{build_context, Session};
use crate::engine::exec::dispatch;
use crate::engine::normalize::normalize;
use crate::engine::options::ViewSettings;
use crate::engine::Engine;
use crate::error::{RenderError, Result};
use crate::template::Map;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

/// One render request, top-level or nested
#[derive(Debug)]
pub(crate) struct Invocation {
    pub(crate) name: String,
    pub(crate) locals: Map,
    pub(crate) settings: Option<ViewSettings>,
    /// `Some` when the caller wants the template's exported variables
    pub(crate) exports: Option<Map>,
}

/// Render an invocation, returning its output and, for export targets, the
/// export bag it filled
pub(crate) fn render_invocation(
    engine: Engine,
    invocation: Invocation,
) -> BoxFuture<'static, Result<(String, Option<Map>)>> {
    async move {
        let Invocation {
            name,
            locals,
            settings,
            exports,
        } = invocation;

        let path = engine.resolve_with(&name, settings.as_ref())?;
        let unit = engine
            .inner
            .locks
            .with_lock(&path, engine.inner.cache.ensure_compiled(&path))
            .await?;

        let mut ctx = build_context(&engine, &path, locals, settings, Session::new(exports));
        let timeout = engine.inner.config.timeout();

        let rendered = match tokio::time::timeout(timeout, dispatch(&unit, &mut ctx)).await {
            Ok(rendered) => rendered,
            Err(_) => {
                tracing::debug!(path = %path.display(), ?timeout, "render timed out");
                Err(RenderError::Timeout {
                    path: path.clone(),
                    timeout,
                })
            }
        };

        match rendered {
            Ok(text) => Ok((text, ctx.session.into_exports())),
            Err(error) => Err(normalize(error)),
        }
    }
    .boxed()
}
