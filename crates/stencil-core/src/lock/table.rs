//! Lazily grown table of per-path mutexes

use super::PathLockGuard;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Process-wide mapping from template path to an exclusive section
#[derive(Debug, Default)]
pub struct LockTable {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutex for `path`, created on first use
    fn entry(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Acquire the exclusive section for `path`, waiting if another task
    /// holds it
    pub async fn acquire(&self, path: &Path) -> PathLockGuard {
        let mutex = self.entry(path);
        let guard = mutex.lock_owned().await;
        tracing::trace!(path = %path.display(), "acquired template lock");
        PathLockGuard {
            guard,
            path: path.to_path_buf(),
        }
    }

    /// Run `work` while holding the lock for `path`
    ///
    /// The lock is released when `work` completes, fails, or is dropped
    /// mid-flight (for example by a timeout).
    pub async fn with_lock<F, T>(&self, path: &Path, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let _guard = self.acquire(path).await;
        work.await
    }

    /// Number of distinct paths that have been locked
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
