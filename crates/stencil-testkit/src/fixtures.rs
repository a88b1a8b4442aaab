//! Template fixtures on the real filesystem
//!
//! Filesystem mtime granularity varies by platform, so tests never rely on
//! the clock advancing between two writes. Modification times are set
//! explicitly instead.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Write `content` to `<dir>/<name>`, creating parent directories
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_template(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create template directory");
    }
    std::fs::write(&path, content).expect("Failed to write template");
    path
}

/// Set the modification time of `path`
///
/// # Panics
///
/// Panics if the file cannot be opened or its mtime cannot be changed.
pub fn set_modified(path: &Path, modified: SystemTime) {
    let file = File::options()
        .write(true)
        .open(path)
        .expect("Failed to open template for mtime update");
    file.set_modified(modified)
        .expect("Failed to set template modification time");
}

fn modified(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .expect("Failed to read template modification time")
}

/// Replace the content of `path` while keeping its modification time
pub fn rewrite_preserving_mtime(path: &Path, content: &str) {
    let before = modified(path);
    std::fs::write(path, content).expect("Failed to rewrite template");
    set_modified(path, before);
}

/// Move the modification time of `path` forward by `by`
///
/// Returns the new modification time.
pub fn bump_mtime(path: &Path, by: Duration) -> SystemTime {
    let next = modified(path) + by;
    set_modified(path, next);
    next
}
