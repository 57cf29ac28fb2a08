use filetime::FileTime;
use std::fs;
use std::time::{Duration, SystemTime};
use template_dir::{DirectoryIndex, DirectoryOptions};
use tempfile::tempdir;

#[test]
fn test_edit_save_and_reload_in_second_instance() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "home\n").unwrap();
    fs::write(dir.path().join("faq.html"), "questions answered").unwrap();

    let mut editor = DirectoryIndex::with_defaults(dir.path()).unwrap();
    editor.load().unwrap();
    editor.cache_mut().remove("faq");
    editor
        .cache_mut()
        .insert("drafts/post".to_string(), "<p>new</p>".to_string());
    editor.save().unwrap();

    let mut reader = DirectoryIndex::with_defaults(dir.path()).unwrap();
    reader.load().unwrap();

    assert_eq!(reader.cache(), editor.cache());
    assert!(!dir.path().join("faq.html").exists());
}

#[test]
fn test_save_then_external_edit_is_picked_up() {
    let dir = tempdir().unwrap();
    let mut index = DirectoryIndex::with_defaults(dir.path()).unwrap();
    index
        .cache_mut()
        .insert("page".to_string(), "ours".to_string());
    index.save().unwrap();
    index.load().unwrap();

    let path = index.path_for("page");
    fs::write(&path, "theirs").unwrap();
    let later = SystemTime::now() + Duration::from_secs(5);
    filetime::set_file_mtime(&path, FileTime::from_system_time(later)).unwrap();

    let summary = index.load().unwrap();

    assert_eq!(summary.reloaded, 1);
    assert_eq!(index.cache()["page"], "theirs");
}

#[test]
fn test_unsaved_edits_are_lost_on_load() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("page.html"), "disk").unwrap();
    let mut index = DirectoryIndex::with_defaults(dir.path()).unwrap();
    index.load().unwrap();

    index
        .cache_mut()
        .insert("page".to_string(), "memory".to_string());
    index.load().unwrap();

    assert_eq!(index.cache()["page"], "disk");
    assert_eq!(fs::read_to_string(dir.path().join("page.html")).unwrap(), "disk");
}

#[test]
fn test_repeated_save_is_stable() {
    let dir = tempdir().unwrap();
    let mut index = DirectoryIndex::new(
        dir.path(),
        DirectoryOptions::default().with_extension(".tmpl"),
    )
    .unwrap();
    index.cache_mut().insert("a".to_string(), "1".to_string());
    index.cache_mut().insert("b/c".to_string(), "2".to_string());

    let first = index.save().unwrap();
    let second = index.save().unwrap();

    assert_eq!(first.written, 2);
    assert_eq!(second.written, 2);
    assert_eq!(second.removed, 0);
    assert!(dir.path().join("b").join("c.tmpl").exists());
    assert_eq!(index.tracked_keys(), vec!["a", "b/c"]);
}

#[test]
fn test_hidden_templates_skipped_when_configured() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("shown.html"), "s").unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join(".git").join("hook.html"), "h").unwrap();
    let options = DirectoryOptions {
        skip_hidden: true,
        ..DirectoryOptions::default()
    };
    let mut index = DirectoryIndex::new(dir.path(), options).unwrap();

    index.load().unwrap();

    assert_eq!(index.tracked_keys(), vec!["shown"]);
}
