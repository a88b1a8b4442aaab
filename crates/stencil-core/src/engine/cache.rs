//! File cache and reload protocol
//!
//! One entry per Template Identity, holding the compiled unit together with
//! the modification time of the file it was compiled from. Staleness is
//! detected purely by modification time: a file rewritten without its mtime
//! changing keeps serving the old unit.
//!
//! Callers are expected to hold the per-path lock for `path` around
//! [`FileCache::ensure_compiled`]; the cache itself only guards its map.

use crate::error::{RenderError, Result};
use crate::fs::TemplateFs;
use crate::log::Logger;
use crate::template::{CompiledUnit, Compiler};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct CacheEntry {
    modified: SystemTime,
    unit: Arc<CompiledUnit>,
}

#[derive(Debug)]
pub(crate) struct FileCache {
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
    /// Paths that compiled successfully at least once, entry or not
    loaded: RwLock<HashSet<PathBuf>>,
    fs: Arc<dyn TemplateFs>,
    compiler: Compiler,
    logger: Logger,
}

impl FileCache {
    pub(crate) fn new(fs: Arc<dyn TemplateFs>, logger: Logger) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            loaded: RwLock::new(HashSet::new()),
            fs,
            compiler: Compiler::new(),
            logger,
        }
    }

    /// Return a compiled unit for `path` that matches the file's current
    /// modification time, compiling it if missing or stale
    pub(crate) async fn ensure_compiled(&self, path: &Path) -> Result<Arc<CompiledUnit>> {
        let modified = self.fs.modified(path).await.map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            operation: "stat",
            source,
        })?;

        if let Some(unit) = self.fresh(path, modified) {
            tracing::debug!(path = %path.display(), "template cache hit");
            return Ok(unit);
        }

        let source = self
            .fs
            .read_to_string(path)
            .await
            .map_err(|source| RenderError::Io {
                path: path.to_path_buf(),
                operation: "read",
                source,
            })?;

        // Discard before compiling so a failed compile leaves nothing behind
        self.remove(path);

        let unit = self
            .compiler
            .compile(path, &source)
            .map_err(|source| RenderError::Compile {
                path: path.to_path_buf(),
                source,
            })?;
        let unit = Arc::new(unit);

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                path.to_path_buf(),
                CacheEntry {
                    modified,
                    unit: unit.clone(),
                },
            );

        let first_load = self
            .loaded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf());
        let verb = if first_load { "loaded" } else { "reloaded" };
        tracing::debug!(path = %path.display(), fragments = unit.fragment_count(), "template {}", verb);
        self.logger.info(&format!("{} {}", verb, path.display()));

        Ok(unit)
    }

    fn fresh(&self, path: &Path, modified: SystemTime) -> Option<Arc<CompiledUnit>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(path)
            .filter(|entry| entry.modified == modified)
            .map(|entry| entry.unit.clone())
    }

    fn remove(&self, path: &Path) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
    }

    /// Modification time the cached unit for `path` was compiled from
    pub(crate) fn cached_modified(&self, path: &Path) -> Option<SystemTime> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(path).map(|entry| entry.modified)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn compile_count(&self) -> usize {
        self.compiler.compile_count()
    }
}
