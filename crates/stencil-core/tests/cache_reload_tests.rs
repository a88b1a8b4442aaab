//! Integration tests for the file cache reload protocol
//!
//! The real-filesystem tests set modification times explicitly so they do not
//! depend on mtime granularity. The in-memory tests use `MemoryFs`, whose
//! logical clock makes every write observable.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use stencil_core::{Engine, EngineConfig, LogLevel, Logger, MemoryFs, RenderOptions};
use stencil_testkit::{bump_mtime, rewrite_preserving_mtime, temp_dir_in_workspace, write_template};

fn os_engine(views: &std::path::Path) -> Engine {
    Engine::new(EngineConfig::default().with_views(views)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unchanged_template_is_not_recompiled() {
    let temp = temp_dir_in_workspace();
    write_template(temp.path(), "page.template", "Hello ${name}");
    let engine = os_engine(temp.path());
    let options = RenderOptions::new().with_local("name", "Ada");

    let first = engine.render("page", options.clone()).await.unwrap();
    let second = engine.render("page", options).await.unwrap();

    assert_eq!(first, "Hello Ada");
    assert_eq!(second, "Hello Ada");
    assert_eq!(engine.compile_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_content_and_mtime_change_recompiles_once() {
    let temp = temp_dir_in_workspace();
    let path = write_template(temp.path(), "page.template", "v1");
    let engine = os_engine(temp.path());

    assert_eq!(engine.render("page", RenderOptions::new()).await.unwrap(), "v1");

    rewrite_preserving_mtime(&path, "v2");
    bump_mtime(&path, Duration::from_secs(10));

    assert_eq!(engine.render("page", RenderOptions::new()).await.unwrap(), "v2");
    assert_eq!(engine.render("page", RenderOptions::new()).await.unwrap(), "v2");
    assert_eq!(engine.compile_count(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_content_change_without_mtime_change_is_not_detected() {
    let temp = temp_dir_in_workspace();
    let path = write_template(temp.path(), "page.template", "original");
    let engine = os_engine(temp.path());

    assert_eq!(
        engine.render("page", RenderOptions::new()).await.unwrap(),
        "original"
    );

    rewrite_preserving_mtime(&path, "rewritten");

    // Staleness is mtime-based: the old unit keeps being served
    assert_eq!(
        engine.render("page", RenderOptions::new()).await.unwrap(),
        "original"
    );
    assert_eq!(engine.compile_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_memory_fs_reload_cycle() {
    let fs = Arc::new(MemoryFs::new());
    fs.write("/views/a.template", "one");
    let engine = Engine::with_fs(EngineConfig::default().with_views("/views"), fs.clone()).unwrap();

    assert_eq!(engine.render("a", RenderOptions::new()).await.unwrap(), "one");
    let compiled_at = engine.cached_modified("a").unwrap();

    fs.write_preserving_mtime(std::path::Path::new("/views/a.template"), "two");
    assert_eq!(engine.render("a", RenderOptions::new()).await.unwrap(), "one");

    fs.touch(std::path::Path::new("/views/a.template"));
    assert_eq!(engine.render("a", RenderOptions::new()).await.unwrap(), "two");
    assert!(engine.cached_modified("a").unwrap() > compiled_at);
    assert_eq!(engine.compile_count(), 2);
    assert_eq!(engine.cached_templates(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_logger_distinguishes_loaded_and_reloaded() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let logger = Logger::new(move |level: LogLevel, message: &str| {
        sink_seen.lock().unwrap().push(format!("{}: {}", level, message));
    });

    let fs = Arc::new(MemoryFs::new());
    fs.write("/views/a.template", "${log('rendering', __template)}body");
    let engine = Engine::with_fs(
        EngineConfig::default().with_views("/views").with_logger(logger),
        fs.clone(),
    )
    .unwrap();

    engine.render("a", RenderOptions::new()).await.unwrap();
    fs.touch(std::path::Path::new("/views/a.template"));
    let out = engine.render("a", RenderOptions::new()).await.unwrap();

    assert_eq!(out, "body");
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "info: loaded /views/a.template",
            "info: rendering a",
            "info: reloaded /views/a.template",
            "info: rendering a",
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_broken_template_is_recompiled_every_render_until_fixed() {
    let fs = Arc::new(MemoryFs::new());
    fs.write("/views/a.template", "oops ${");
    let engine = Engine::with_fs(EngineConfig::default().with_views("/views"), fs.clone()).unwrap();

    assert!(engine.render("a", RenderOptions::new()).await.is_err());
    assert!(engine.render("a", RenderOptions::new()).await.is_err());
    assert_eq!(engine.compile_count(), 2);
    assert_eq!(engine.cached_templates(), 0);

    fs.write("/views/a.template", "fixed");
    assert_eq!(engine.render("a", RenderOptions::new()).await.unwrap(), "fixed");
}
