use std::fs;
use template_dir::{Cache, DirectoryError, DirectoryIndex, FileError, SaveSummary};
use tempfile::tempdir;

fn cache_of(pairs: &[(&str, &str)]) -> Cache {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_save_creates_file_in_empty_directory() {
    let dir = tempdir().unwrap();
    let mut index = DirectoryIndex::with_defaults(dir.path()).unwrap();
    index.set_cache(cache_of(&[("page", "X")]));

    let summary = index.save().unwrap();

    assert_eq!(summary, SaveSummary { written: 1, removed: 0 });
    assert_eq!(fs::read_to_string(dir.path().join("page.html")).unwrap(), "X");
}

#[test]
fn test_save_creates_missing_root_and_intermediate_directories() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("site").join("views");
    let mut index = DirectoryIndex::with_defaults(&root).unwrap();
    index.set_cache(cache_of(&[("a/b/c", "deep")]));

    index.save().unwrap();

    assert_eq!(
        fs::read_to_string(root.join("a").join("b").join("c.html")).unwrap(),
        "deep"
    );
}

#[test]
fn test_save_overwrites_existing_key() {
    let dir = tempdir().unwrap();
    let mut index = DirectoryIndex::with_defaults(dir.path()).unwrap();
    index.set_cache(cache_of(&[("page", "X")]));
    index.save().unwrap();

    index.set_cache(cache_of(&[("page", "Y")]));
    index.save().unwrap();

    assert_eq!(fs::read_to_string(dir.path().join("page.html")).unwrap(), "Y");
}

#[test]
fn test_save_deletes_removed_key() {
    let dir = tempdir().unwrap();
    let mut index = DirectoryIndex::with_defaults(dir.path()).unwrap();
    index.set_cache(cache_of(&[("page", "X")]));
    index.save().unwrap();

    index.set_cache(Cache::new());
    let summary = index.save().unwrap();

    assert_eq!(summary, SaveSummary { written: 0, removed: 1 });
    assert!(!dir.path().join("page.html").exists());
    assert!(index.tracked_keys().is_empty());
}

#[test]
fn test_save_deletes_loaded_files_dropped_from_cache() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.html"), "k").unwrap();
    fs::create_dir(dir.path().join("old")).unwrap();
    fs::write(dir.path().join("old").join("drop.html"), "d").unwrap();
    let mut index = DirectoryIndex::with_defaults(dir.path()).unwrap();
    index.load().unwrap();

    index.cache_mut().remove("old/drop");
    index
        .cache_mut()
        .insert("keep".to_string(), "kept and edited".to_string());
    let summary = index.save().unwrap();

    assert_eq!(summary, SaveSummary { written: 1, removed: 1 });
    assert!(!dir.path().join("old").join("drop.html").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("keep.html")).unwrap(),
        "kept and edited"
    );
}

#[test]
fn test_save_leaves_unrelated_files_alone() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), "mine").unwrap();
    let mut index = DirectoryIndex::with_defaults(dir.path()).unwrap();
    index.set_cache(cache_of(&[("page", "X")]));

    index.save().unwrap();
    index.set_cache(Cache::new());
    index.save().unwrap();

    assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), "mine");
}

#[test]
fn test_save_then_load_reads_back_written_content() {
    let dir = tempdir().unwrap();
    let mut index = DirectoryIndex::with_defaults(dir.path()).unwrap();
    let desired = cache_of(&[("index", "home\n"), ("sub/widget", "[ things ]")]);
    index.set_cache(desired.clone());
    index.save().unwrap();

    let summary = index.load().unwrap();

    assert_eq!(summary.reloaded, 2);
    assert_eq!(index.cache(), &desired);
}

#[test]
fn test_save_failure_skips_deletion() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("stale.html"), "old").unwrap();
    // A regular file where the save needs a directory.
    fs::write(dir.path().join("blocked"), "not a dir").unwrap();
    let mut index = DirectoryIndex::with_defaults(dir.path()).unwrap();
    index.load().unwrap();

    index.set_cache(cache_of(&[("blocked/page", "X")]));
    let err = index.save().unwrap_err();

    assert!(matches!(err, DirectoryError::File(_)));
    assert!(dir.path().join("stale.html").exists());
    assert_eq!(index.tracked_keys(), vec!["blocked/page", "stale"]);
}

#[test]
fn test_save_reports_one_error_for_many_failures() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("blocked"), "not a dir").unwrap();
    let mut index = DirectoryIndex::with_defaults(dir.path()).unwrap();
    index.set_cache(cache_of(&[
        ("blocked/a", "1"),
        ("blocked/b", "2"),
        ("fine", "3"),
    ]));

    let err = index.save().unwrap_err();

    match err {
        DirectoryError::File(ref e @ FileError::Io { .. }) => {
            assert!(e.path().ends_with("blocked"));
        }
        other => panic!("Expected an I/O error, got {:?}", other),
    }
    assert_eq!(fs::read_to_string(dir.path().join("fine.html")).unwrap(), "3");
}

#[test]
fn test_save_rejects_invalid_key() {
    let dir = tempdir().unwrap();
    let mut index = DirectoryIndex::with_defaults(dir.path()).unwrap();
    index.set_cache(cache_of(&[("a//b", "X")]));

    let err = index.save().unwrap_err();

    assert!(matches!(err, DirectoryError::InvalidKey(ref key) if key == "a//b"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
