//! Filesystem capability
//!
//! The engine only ever needs two operations on a template file: its
//! modification time and its full contents. Both go through [`TemplateFs`] so
//! embedders and tests can swap the real filesystem for something else.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, SystemTime};

/// Read access to template files
pub trait TemplateFs: Send + Sync + fmt::Debug {
    /// Current modification time of `path`
    fn modified<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<SystemTime>>;

    /// Full contents of `path` as UTF-8 text
    fn read_to_string<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<String>>;
}

/// The real filesystem, via `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl TemplateFs for OsFs {
    fn modified<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<SystemTime>> {
        async move { tokio::fs::metadata(path).await?.modified() }.boxed()
    }

    fn read_to_string<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<String>> {
        tokio::fs::read_to_string(path).boxed()
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    content: String,
    modified: SystemTime,
}

/// In-memory filesystem with a logical clock
///
/// Every write advances the clock by one second unless the caller asks to
/// keep the old modification time, which makes staleness detection fully
/// deterministic.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<HashMap<PathBuf, MemoryFile>>,
    clock: AtomicU64,
    reads: AtomicUsize,
    read_delay: Option<Duration>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every read by `delay`, widening race windows in tests
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    fn tick(&self) -> SystemTime {
        let seconds = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(seconds)
    }

    /// Create or overwrite a file, advancing its modification time
    pub fn write(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        let modified = self.tick();
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.insert(
            path.into(),
            MemoryFile {
                content: content.into(),
                modified,
            },
        );
    }

    /// Overwrite a file's content while keeping its modification time
    ///
    /// Returns `false` if the file does not exist.
    pub fn write_preserving_mtime(&self, path: &Path, content: impl Into<String>) -> bool {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        match files.get_mut(path) {
            Some(file) => {
                file.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Advance a file's modification time without changing its content
    pub fn touch(&self, path: &Path) -> bool {
        let modified = self.tick();
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        match files.get_mut(path) {
            Some(file) => {
                file.modified = modified;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, path: &Path) -> bool {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.remove(path).is_some()
    }

    /// Number of completed content reads
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn lookup(&self, path: &Path) -> io::Result<MemoryFile> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such template: {}", path.display()),
            )
        })
    }
}

impl TemplateFs for MemoryFs {
    fn modified<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<SystemTime>> {
        async move { self.lookup(path).map(|file| file.modified) }.boxed()
    }

    fn read_to_string<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<String>> {
        async move {
            if let Some(delay) = self.read_delay {
                tokio::time::sleep(delay).await;
            }
            let file = self.lookup(path)?;
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(file.content)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_fs_write_advances_mtime() {
        let fs = MemoryFs::new();
        let path = Path::new("/v/a.template");

        fs.write(path, "one");
        let first = fs.modified(path).await.unwrap();
        fs.write(path, "two");
        let second = fs.modified(path).await.unwrap();

        assert!(second > first);
        assert_eq!(fs.read_to_string(path).await.unwrap(), "two");
    }

    #[tokio::test]
    async fn test_memory_fs_preserving_write_keeps_mtime() {
        let fs = MemoryFs::new();
        let path = Path::new("/v/a.template");

        fs.write(path, "one");
        let before = fs.modified(path).await.unwrap();
        assert!(fs.write_preserving_mtime(path, "two"));

        assert_eq!(fs.modified(path).await.unwrap(), before);
        assert_eq!(fs.read_to_string(path).await.unwrap(), "two");
    }

    #[tokio::test]
    async fn test_memory_fs_missing_file_is_not_found() {
        let fs = MemoryFs::new();
        let err = fs.modified(Path::new("/nope")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!fs.touch(Path::new("/nope")));
    }

    #[tokio::test]
    async fn test_os_fs_reads_real_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.template");
        std::fs::write(&path, "hello").unwrap();

        assert_eq!(OsFs.read_to_string(&path).await.unwrap(), "hello");
        assert!(OsFs.modified(&path).await.is_ok());
    }
}
