use clap::Parser;
use std::fs;
use std::path::Path;
use template_dir::cli::Cli;
use template_dir::error::ExitCode;
use template_dir::snapshot;
use tempfile::{tempdir, TempDir};

/// Parse `args` with a config path that does not exist, so the user's own
/// config file never leaks into a test.
fn parse(config_dir: &TempDir, args: &[&str]) -> Cli {
    let config = config_dir.path().join("none.toml");
    let mut argv = vec![
        "template-dir".to_string(),
        "--config".to_string(),
        config.display().to_string(),
    ];
    argv.extend(args.iter().map(|a| a.to_string()));
    Cli::try_parse_from(argv).unwrap()
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn test_load_command_writes_snapshot() {
    let views = tempdir().unwrap();
    fs::write(views.path().join("index.html"), "home\n").unwrap();
    fs::create_dir(views.path().join("sub")).unwrap();
    fs::write(views.path().join("sub").join("widget.html"), "[ things ]").unwrap();
    let work = tempdir().unwrap();
    let output = work.path().join("out").join("cache.json");

    let cli = parse(
        &work,
        &["load", &path_str(views.path()), "-o", &path_str(&output)],
    );
    let code = template_dir::run_app(cli).unwrap();

    assert_eq!(code, ExitCode::Success);
    let cache = snapshot::read_snapshot(&output).unwrap();
    assert_eq!(cache.len(), 2);
    assert_eq!(cache["sub/widget"], "[ things ]");
}

#[test]
fn test_save_command_mirrors_snapshot() {
    let views = tempdir().unwrap();
    fs::write(views.path().join("stale.html"), "old").unwrap();
    fs::write(views.path().join("keep.txt"), "not a template").unwrap();
    let work = tempdir().unwrap();
    let input = work.path().join("cache.json");
    fs::write(&input, r#"{"fresh": "new", "nested/page": "deep"}"#).unwrap();

    let cli = parse(
        &work,
        &["save", &path_str(views.path()), "-i", &path_str(&input)],
    );
    let code = template_dir::run_app(cli).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(!views.path().join("stale.html").exists());
    assert!(views.path().join("keep.txt").exists());
    assert_eq!(fs::read_to_string(views.path().join("fresh.html")).unwrap(), "new");
    assert_eq!(
        fs::read_to_string(views.path().join("nested").join("page.html")).unwrap(),
        "deep"
    );
}

#[test]
fn test_watch_command_stops_after_max_polls() {
    let views = tempdir().unwrap();
    fs::write(views.path().join("a.tmpl"), "A").unwrap();
    let work = tempdir().unwrap();
    let output = work.path().join("cache.json");

    let cli = parse(
        &work,
        &[
            "-e",
            "tmpl",
            "watch",
            &path_str(views.path()),
            "-o",
            &path_str(&output),
            "--interval",
            "0",
            "--max-polls",
            "2",
        ],
    );
    let code = template_dir::run_app(cli).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(snapshot::read_snapshot(&output).unwrap()["a"], "A");
}

#[test]
fn test_invalid_extension_is_an_error() {
    let views = tempdir().unwrap();
    let work = tempdir().unwrap();

    let cli = parse(&work, &["-e", "h/tml", "load", &path_str(views.path())]);
    let err = template_dir::run_app(cli).unwrap_err();

    assert!(format!("{err:#}").contains("Invalid extension 'h/tml'"));
}

#[test]
fn test_malformed_snapshot_is_an_error() {
    let views = tempdir().unwrap();
    fs::write(views.path().join("page.html"), "kept").unwrap();
    let work = tempdir().unwrap();
    let input = work.path().join("cache.json");
    fs::write(&input, r#"{"page": 42}"#).unwrap();

    let cli = parse(
        &work,
        &["save", &path_str(views.path()), "--input", &path_str(&input)],
    );
    let err = template_dir::run_app(cli).unwrap_err();

    assert!(format!("{err:#}").contains("expected a JSON object of strings"));
    assert_eq!(fs::read_to_string(views.path().join("page.html")).unwrap(), "kept");
}

#[test]
fn test_malformed_config_is_an_error() {
    let views = tempdir().unwrap();
    let work = tempdir().unwrap();
    let config = work.path().join("config.toml");
    fs::write(&config, "io_threads = \"many\"\n").unwrap();

    let config_arg = path_str(&config);
    let root_arg = path_str(views.path());
    let cli = Cli::try_parse_from([
        "template-dir",
        "--config",
        config_arg.as_str(),
        "load",
        root_arg.as_str(),
    ])
    .unwrap();
    let err = template_dir::run_app(cli).unwrap_err();

    assert!(format!("{err:#}").contains("Failed to load config"));
}
