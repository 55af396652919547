// tests/dependency_paths.rs

use std::path::{Path, PathBuf};

use relaunch::config::paths::normalize;
use relaunch::config::{ServerOptions, resolve_dependency_paths};
use relaunch::errors::RelaunchError;

fn cwd() -> PathBuf {
    PathBuf::from("/work/project")
}

#[test]
fn defaults_to_cwd_when_no_reserved_keys_are_given() {
    let deps = resolve_dependency_paths(&ServerOptions::new(), &cwd()).unwrap();

    assert_eq!(deps.manifest, Path::new("/work/project/manifest.json"));
    assert_eq!(deps.config, Path::new("/work/project/settings.yml"));
}

#[test]
fn relative_path_is_resolved_against_cwd() {
    let options = ServerOptions::new().with("path", "fixtureDir");
    let deps = resolve_dependency_paths(&options, &cwd()).unwrap();

    assert_eq!(deps.manifest, Path::new("/work/project/fixtureDir/manifest.json"));
    assert_eq!(deps.config, Path::new("/work/project/settings.yml"));
}

#[test]
fn absolute_values_are_used_as_is() {
    let options = ServerOptions::new()
        .with("path", "/srv/app")
        .with("config", "/etc/app/settings.yml");
    let deps = resolve_dependency_paths(&options, &cwd()).unwrap();

    assert_eq!(deps.manifest, Path::new("/srv/app/manifest.json"));
    assert_eq!(deps.config, Path::new("/etc/app/settings.yml"));
}

#[test]
fn config_is_the_resolved_file_itself() {
    let options = ServerOptions::new().with("config", "./conf/../conf/dev.yml");
    let deps = resolve_dependency_paths(&options, &cwd()).unwrap();

    assert_eq!(deps.config, Path::new("/work/project/conf/dev.yml"));
}

#[test]
fn parent_segments_are_folded() {
    let options = ServerOptions::new().with("path", "../shared/./build");
    let deps = resolve_dependency_paths(&options, &cwd()).unwrap();

    assert_eq!(deps.manifest, Path::new("/work/shared/build/manifest.json"));
}

#[test]
fn non_string_reserved_keys_are_rejected() {
    let options = ServerOptions::new().with("path", 3_i64);
    match resolve_dependency_paths(&options, &cwd()) {
        Err(RelaunchError::InvalidOption { key, expected, received }) => {
            assert_eq!(key, "path");
            assert_eq!(expected, "string");
            assert_eq!(received, "number");
        }
        other => panic!("expected InvalidOption, got {other:?}"),
    }

    let options = ServerOptions::new().with_flag("config");
    match resolve_dependency_paths(&options, &cwd()) {
        Err(RelaunchError::InvalidOption { key, received, .. }) => {
            assert_eq!(key, "config");
            assert_eq!(received, "absent");
        }
        other => panic!("expected InvalidOption, got {other:?}"),
    }
}

#[test]
fn normalize_handles_edge_cases() {
    assert_eq!(normalize(Path::new("/a/./b/../c")), Path::new("/a/c"));
    assert_eq!(normalize(Path::new("/../x")), Path::new("/x"));
    assert_eq!(normalize(Path::new("a/..")), Path::new("."));
    assert_eq!(normalize(Path::new("../a")), Path::new("../a"));
}
