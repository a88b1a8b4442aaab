//! Integration tests for the template fixture helpers

use stencil_testkit::{
    bump_mtime, rewrite_preserving_mtime, temp_dir_in_workspace, try_temp_dir_in_workspace,
    write_template,
};
use std::time::Duration;

#[test]
fn test_write_template_creates_parents() {
    let temp = temp_dir_in_workspace();
    let path = write_template(temp.path(), "partials/nav.template", "nav");

    assert!(path.ends_with("partials/nav.template"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "nav");
}

#[test]
fn test_rewrite_preserving_mtime_keeps_timestamp() {
    let temp = temp_dir_in_workspace();
    let path = write_template(temp.path(), "a.template", "one");
    let before = std::fs::metadata(&path).unwrap().modified().unwrap();

    rewrite_preserving_mtime(&path, "two, longer");

    let after = std::fs::metadata(&path).unwrap().modified().unwrap();
    assert_eq!(before, after);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "two, longer");
}

#[test]
fn test_bump_mtime_moves_forward() {
    let temp = temp_dir_in_workspace();
    let path = write_template(temp.path(), "a.template", "x");
    let before = std::fs::metadata(&path).unwrap().modified().unwrap();

    let next = bump_mtime(&path, Duration::from_secs(5));

    assert!(next > before);
    assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), next);
}

#[test]
fn test_try_temp_dir_lives_under_tmp_and_cleans_up() {
    let temp = try_temp_dir_in_workspace().unwrap();
    let dir = temp.path().to_path_buf();

    assert!(dir.is_dir());
    assert_eq!(dir.parent().unwrap().file_name().unwrap(), ".tmp");

    drop(temp);
    assert!(!dir.exists());
}
