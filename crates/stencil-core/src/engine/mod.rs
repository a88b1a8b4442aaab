//! Template execution engine
//!
//! [`Engine`] is the public entry point. It owns the process-wide file cache
//! and lock table and is cheap to clone; clones share both.
//!
//! # Example
//!
//! ```rust,no_run
//! use stencil_core::config::EngineConfig;
//! use stencil_core::engine::{Engine, RenderOptions};
//!
//! # async fn run() -> stencil_core::Result<()> {
//! let engine = Engine::new(EngineConfig::default().with_views("views"))?;
//! let html = engine
//!     .render("index", RenderOptions::new().with_local("title", "Home"))
//!     .await?;
//! # let _ = html;
//! # Ok(())
//! # }
//! ```

mod cache;
mod context;
mod exec;
pub mod normalize;
pub mod options;
mod render;

pub use normalize::normalize;
pub use options::{RenderOptions, ViewSettings};

use crate::config::EngineConfig;
use crate::error::{RenderError, Result};
use crate::fs::{OsFs, TemplateFs};
use crate::lock::LockTable;
use crate::log::Logger;
use crate::path::{absolutize, normalize_extension, resolve_template_path};
use crate::template::{Map, Value};
use cache::FileCache;
use render::{render_invocation, Invocation};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

#[derive(Debug)]
struct EngineInner {
    config: EngineConfig,
    /// Absolute default search directory
    views: PathBuf,
    globals: Map,
    cache: FileCache,
    locks: LockTable,
}

impl Engine {
    /// Engine over the real filesystem
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_fs(config, Arc::new(OsFs))
    }

    /// Engine over a custom filesystem capability
    ///
    /// Templates named in `config.preload` are compiled in the background
    /// when a tokio runtime is available; failures are only logged.
    pub fn with_fs(config: EngineConfig, fs: Arc<dyn TemplateFs>) -> Result<Self> {
        config.validate()?;

        let views = match &config.views {
            Some(views) => absolutize(views),
            None => std::env::current_dir(),
        }
        .map_err(|e| RenderError::Config(format!("cannot resolve views directory: {}", e)))?;

        let globals = config
            .inject
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(value.clone())))
            .collect();

        let cache = FileCache::new(fs, config.logger.clone());

        let engine = Self {
            inner: Arc::new(EngineInner {
                config,
                views,
                globals,
                cache,
                locks: LockTable::new(),
            }),
        };
        engine.spawn_preload();
        Ok(engine)
    }

    fn spawn_preload(&self) {
        let preload = &self.inner.config.preload;
        if preload.is_empty() {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            tracing::warn!(
                templates = preload.len(),
                "no tokio runtime available, skipping template preload"
            );
            return;
        };

        for name in preload.iter().cloned() {
            let engine = self.clone();
            handle.spawn(async move {
                if let Err(error) = engine.warm(&name).await {
                    tracing::warn!(template = %name, %error, "template preload failed");
                }
            });
        }
    }

    /// Render `name` with the given locals and settings
    ///
    /// Failures are normalized: runtime traces only name template locations.
    pub async fn render(&self, name: &str, options: RenderOptions) -> Result<String> {
        let invocation = Invocation {
            name: name.to_string(),
            locals: options.locals,
            settings: options.settings,
            exports: None,
        };
        let (text, _) = render_invocation(self.clone(), invocation).await?;
        Ok(text)
    }

    /// Render on the current tokio runtime and hand the outcome to `callback`
    ///
    /// Returns `None`, after calling `callback` with a configuration error,
    /// when no runtime is available.
    pub fn render_with_callback<F>(
        &self,
        name: impl Into<String>,
        options: RenderOptions,
        callback: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(Result<String>) + Send + 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                callback(Err(RenderError::Config(format!(
                    "callback rendering requires a tokio runtime: {}",
                    e
                ))));
                return None;
            }
        };

        let engine = self.clone();
        let name = name.into();
        Some(handle.spawn(async move {
            callback(engine.render(&name, options).await);
        }))
    }

    /// Render `name` as an export target and return what it exported
    ///
    /// The rendered text is discarded.
    pub async fn import_vars(&self, name: &str, options: RenderOptions) -> Result<Map> {
        let invocation = Invocation {
            name: name.to_string(),
            locals: options.locals,
            settings: options.settings,
            exports: Some(Map::new()),
        };
        let (_, exports) = render_invocation(self.clone(), invocation).await?;
        Ok(exports.unwrap_or_default())
    }

    /// Bring the cache entry for `name` up to date without rendering it
    pub async fn warm(&self, name: &str) -> Result<()> {
        let path = self.resolve(name);
        self.inner
            .locks
            .with_lock(&path, self.inner.cache.ensure_compiled(&path))
            .await?;
        Ok(())
    }

    /// Template Identity of `name` under the engine defaults
    pub fn resolve(&self, name: &str) -> PathBuf {
        resolve_template_path(&self.inner.views, name, self.inner.config.extension())
    }

    /// Template Identity of `name`, honoring per-call view settings
    pub(crate) fn resolve_with(&self, name: &str, settings: Option<&ViewSettings>) -> Result<PathBuf> {
        let extension = settings
            .and_then(|s| s.view_engine.as_deref())
            .filter(|ext| !normalize_extension(ext).is_empty())
            .unwrap_or_else(|| self.inner.config.extension());

        let views = match settings.and_then(|s| s.views.as_deref()) {
            Some(views) => absolutize(views).map_err(|source| RenderError::Io {
                path: views.to_path_buf(),
                operation: "resolve",
                source,
            })?,
            None => self.inner.views.clone(),
        };

        Ok(resolve_template_path(&views, name, extension))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Absolute default search directory
    pub fn views(&self) -> &Path {
        &self.inner.views
    }

    /// Total compile attempts, failed ones included
    pub fn compile_count(&self) -> usize {
        self.inner.cache.compile_count()
    }

    /// Number of templates currently held in the cache
    pub fn cached_templates(&self) -> usize {
        self.inner.cache.len()
    }

    /// Modification time the cached unit for `name` was compiled from
    pub fn cached_modified(&self, name: &str) -> Option<SystemTime> {
        self.inner.cache.cached_modified(&self.resolve(name))
    }

    pub(crate) fn globals(&self) -> &Map {
        &self.inner.globals
    }

    pub(crate) fn logger(&self) -> &Logger {
        &self.inner.config.logger
    }
}
