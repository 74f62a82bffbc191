// tests/config_errors.rs

mod common;
use crate::common::Project;

use assetdag::config::{ConfigFile, load_and_validate, load_from_str};
use assetdag::errors::AssetdagError;

fn validate(toml: &str) -> Result<ConfigFile, AssetdagError> {
    ConfigFile::try_from(load_from_str(toml)?)
}

fn config_error_mentioning(toml: &str, needle: &str) {
    match validate(toml) {
        Err(AssetdagError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} should mention {needle:?}")
        }
        other => panic!("expected ConfigError mentioning {needle:?}, got {other:?}"),
    }
}

#[test]
fn sample_config_on_disk_loads() {
    let p = Project::new();
    p.write(
        "Assetdag.toml",
        r#"
[folders]
dist = "public"

[asset.html]
sources = ["src/html/*.html"]

[task.default]
sequence = [["clean"], ["html"]]

[task.clean]
action = "clean"
"#,
    );

    let cfg = load_and_validate(p.path("Assetdag.toml")).unwrap();
    assert!(cfg.has_task("default"));
    assert!(cfg.has_task("html"));
    assert_eq!(cfg.folders.dist, std::path::PathBuf::from("public"));
    assert_eq!(cfg.server.port, 8000);
}

#[test]
fn bundled_demo_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/Assetdag.toml");
    let cfg = load_and_validate(&path).unwrap();

    for task in ["dev", "dist", "work", "default", "html-full", "plugins-css"] {
        assert!(cfg.has_task(task), "missing task {task}");
    }
    assert_eq!(cfg.target["dist"].compress, Some(true));
    assert_eq!(cfg.plugins["jsConcat"].len(), 7);
}

#[test]
fn missing_file_is_an_io_error() {
    let p = Project::new();
    let err = load_and_validate(p.path("Assetdag.toml")).unwrap_err();
    assert!(matches!(err, AssetdagError::IoError(_)));
}

#[test]
fn unknown_transform_kind_is_a_toml_error() {
    let err = validate(
        r#"
[asset.js]
sources = ["src/*.js"]
transforms = [{ kind = "uglify" }]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, AssetdagError::TomlError(_)), "got {err:?}");
}

#[test]
fn destination_must_stay_inside_output_root() {
    config_error_mentioning(
        r#"
[asset.js]
sources = ["src/*.js"]
destination = "../outside"
"#,
        "inside the output root",
    );
}

#[test]
fn unknown_placeholder_is_rejected() {
    config_error_mentioning(
        r#"
[asset.js]
sources = ["src/*.js"]
destination = "{static}/js"
"#,
        "{static}",
    );
}

#[test]
fn concat_file_must_be_a_plain_name() {
    config_error_mentioning(
        r#"
[asset.js]
sources = ["src/*.js"]
transforms = [{ kind = "concat", file = "../all.js" }]
"#,
        "plain file name",
    );
}

#[test]
fn unsafe_output_roots_are_rejected() {
    for dist in ["", ".", "/tmp/dist", "../dist"] {
        let toml = format!("[folders]\ndist = {dist:?}\n\n[task.clean]\naction = \"clean\"\n");
        config_error_mentioning(&toml, "[folders].dist");
    }
}

#[test]
fn multiple_bodies_are_rejected() {
    config_error_mentioning(
        r#"
[asset.css]
sources = ["src/*.css"]

[task.both]
action = "clean"
parallel = ["css"]
"#,
        "more than one",
    );
}

#[test]
fn watch_rule_needs_known_tasks() {
    config_error_mentioning(
        r#"
[task.clean]
action = "clean"

[[watch]]
pattern = "src/**/*"
tasks = ["rebuild"]
"#,
        "rebuild",
    );
}

#[test]
fn unknown_build_target_is_rejected() {
    config_error_mentioning(
        r#"
[task.html-full]
build = "html"
full = true
"#,
        "unknown asset set 'html'",
    );
}
