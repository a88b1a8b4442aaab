//! RAII guard for per-path locks

use std::path::{Path, PathBuf};
use tokio::sync::OwnedMutexGuard;

/// RAII guard for a per-path lock
///
/// When this guard is dropped, the lock is released. This ensures the lock is
/// released on every exit path, including early returns and `?` propagation
/// from a failed compile.
#[derive(Debug)]
pub struct PathLockGuard {
    #[allow(dead_code)]
    pub(crate) guard: OwnedMutexGuard<()>,
    pub(crate) path: PathBuf,
}

impl PathLockGuard {
    /// Path this guard holds the lock for
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PathLockGuard {
    fn drop(&mut self) {
        // The inner OwnedMutexGuard unlocks when it drops right after this
        tracing::trace!(path = %self.path.display(), "released template lock");
    }
}
