//! Template name resolution
//!
//! Turns a template name such as `"partials/header"` into its Template
//! Identity: an absolute, lexically normalized file path under a search
//! directory, carrying the configured extension exactly once.
//!
//! ## The Platform Semantics Problem
//!
//! `Path::is_absolute()` is platform dependent: on Windows `/tmp` is rooted
//! but not absolute. Names are classified by their components instead, so a
//! rooted name is never joined onto the search directory on any platform.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Check if path is absolute OR rooted (cross-platform)
///
/// # Examples
///
/// ```rust
/// use std::path::Path;
/// use stencil_core::path::has_absolute_or_rooted_component;
///
/// assert!(has_absolute_or_rooted_component(Path::new("/tmp")));
/// assert!(!has_absolute_or_rooted_component(Path::new("views/index")));
/// ```
pub fn has_absolute_or_rooted_component(path: &Path) -> bool {
    // Fast path: Platform-specific absolute check
    if path.is_absolute() {
        return true;
    }

    // Slow path: Check for rooted paths (Windows /tmp case)
    path.components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
}

/// Strip a leading dot from a configured extension (`".html"` → `"html"`)
pub fn normalize_extension(extension: &str) -> &str {
    extension.strip_prefix('.').unwrap_or(extension)
}

/// Whether `name` already ends with `.<extension>`
pub fn has_extension(name: &str, extension: &str) -> bool {
    let extension = normalize_extension(extension);
    name.len() > extension.len() + 1
        && name.ends_with(extension)
        && name[..name.len() - extension.len()].ends_with('.')
}

/// Resolve `.` and `..` components without touching the filesystem
///
/// `..` at the root stays at the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !has_absolute_or_rooted_component(&out) {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make `path` absolute against the process working directory
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if has_absolute_or_rooted_component(path) {
        return Ok(normalize_lexically(path));
    }
    let cwd = std::env::current_dir()?;
    Ok(normalize_lexically(&cwd.join(path)))
}

/// Resolve a template name to its Template Identity
///
/// `views` is expected to be absolute already. The extension is appended only
/// when `name` does not already end with it; rooted names ignore `views`.
///
/// # Examples
///
/// ```rust
/// use std::path::{Path, PathBuf};
/// use stencil_core::path::resolve_template_path;
///
/// let views = Path::new("/srv/views");
/// assert_eq!(
///     resolve_template_path(views, "index", "html"),
///     PathBuf::from("/srv/views/index.html")
/// );
/// assert_eq!(
///     resolve_template_path(views, "index.html", "html"),
///     PathBuf::from("/srv/views/index.html")
/// );
/// ```
pub fn resolve_template_path(views: &Path, name: &str, extension: &str) -> PathBuf {
    let extension = normalize_extension(extension);
    let file = if has_extension(name, extension) {
        name.to_string()
    } else {
        format!("{}.{}", name, extension)
    };

    let candidate = Path::new(&file);
    if has_absolute_or_rooted_component(candidate) {
        normalize_lexically(candidate)
    } else {
        normalize_lexically(&views.join(candidate))
    }
}

/// Template base name: file name with its last extension stripped
pub fn template_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // Tests for has_absolute_or_rooted_component()
    // ============================================================================

    #[test]
    fn test_unix_absolute_detected() {
        assert!(has_absolute_or_rooted_component(Path::new("/tmp")));
    }

    #[test]
    fn test_relative_not_detected() {
        assert!(!has_absolute_or_rooted_component(Path::new("foo/bar")));
    }

    // ============================================================================
    // Tests for extension handling
    // ============================================================================

    #[test]
    fn test_has_extension() {
        assert!(has_extension("page.template", "template"));
        assert!(has_extension("page.template", ".template"));
        assert!(!has_extension("page", "template"));
        assert!(!has_extension("pagetemplate", "template"));
        assert!(!has_extension(".template", "template"));
    }

    #[test]
    fn test_resolve_appends_missing_extension() {
        let path = resolve_template_path(Path::new("/views"), "page", "template");
        assert_eq!(path, PathBuf::from("/views/page.template"));
    }

    #[test]
    fn test_resolve_does_not_double_append() {
        let path = resolve_template_path(Path::new("/views"), "page.template", "template");
        assert_eq!(path, PathBuf::from("/views/page.template"));
    }

    #[test]
    fn test_resolve_other_extension_is_appended() {
        let path = resolve_template_path(Path::new("/views"), "page.html", "template");
        assert_eq!(path, PathBuf::from("/views/page.html.template"));
    }

    #[test]
    fn test_resolve_nested_and_parent_components() {
        let path = resolve_template_path(Path::new("/views/site"), "../shared/./nav", "html");
        assert_eq!(path, PathBuf::from("/views/shared/nav.html"));
    }

    #[test]
    fn test_resolve_absolute_name_ignores_views() {
        let path = resolve_template_path(Path::new("/views"), "/other/page", "template");
        assert_eq!(path, PathBuf::from("/other/page.template"));
    }

    #[test]
    fn test_normalize_parent_at_root_stays_at_root() {
        assert_eq!(normalize_lexically(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_normalize_keeps_leading_parent_for_relative() {
        assert_eq!(normalize_lexically(Path::new("../a/./b")), PathBuf::from("../a/b"));
    }

    #[test]
    fn test_absolutize_relative_uses_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolutize(Path::new("views")).unwrap(), cwd.join("views"));
    }

    #[test]
    fn test_template_stem() {
        assert_eq!(template_stem(Path::new("/v/header.template")), "header");
        assert_eq!(template_stem(Path::new("/v/a.b.html")), "a.b");
    }
}
