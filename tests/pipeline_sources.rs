// tests/pipeline_sources.rs

mod common;
use crate::common::init_tracing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetdag::config::RunContext;
use assetdag::fs::mock::MockFileSystem;
use assetdag::pipeline::{PipelineRunner, SourcePattern, compile_asset_sets, resolve_sources};
use assetdag_test_utils::builders::{AssetSetBuilder, ConfigFileBuilder};

fn patterns(raw: &[&str]) -> Vec<SourcePattern> {
    raw.iter().map(|p| SourcePattern::parse(p).unwrap()).collect()
}

fn html_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/site/src/html/index.html", "<p>index</p>");
    fs.add_file("/site/src/html/about.html", "<p>about</p>");
    fs.add_file("/site/src/html/layout/header.html", "<header/>");
    fs.add_file("/site/src/html/partials/nav.html", "<nav/>");
    fs
}

#[test]
fn negated_patterns_remove_earlier_matches() {
    init_tracing();
    let fs = html_tree();

    let files = resolve_sources(
        &fs,
        Path::new("/site"),
        &patterns(&[
            "src/html/**/*.html",
            "!src/html/layout/**/*",
            "!src/html/partials/**/*",
        ]),
    )
    .unwrap();

    let rel: Vec<_> = files.iter().map(|f| f.root_relative.as_str()).collect();
    assert_eq!(rel, vec!["src/html/about.html", "src/html/index.html"]);
    assert_eq!(files[0].relative, PathBuf::from("about.html"));
}

#[test]
fn pattern_order_is_preserved_and_duplicates_dropped() {
    let fs = MockFileSystem::new();
    fs.add_file("/site/vendor/jquery.js", "jq");
    fs.add_file("/site/vendor/bootstrap.js", "bs");

    let files = resolve_sources(
        &fs,
        Path::new("/site"),
        &patterns(&["vendor/jquery.js", "vendor/*.js"]),
    )
    .unwrap();

    let rel: Vec<_> = files.iter().map(|f| f.root_relative.as_str()).collect();
    assert_eq!(rel, vec!["vendor/jquery.js", "vendor/bootstrap.js"]);
}

#[tokio::test]
async fn pattern_without_matches_is_a_no_op() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    let cfg = ConfigFileBuilder::new()
        .with_asset(
            "fonts",
            AssetSetBuilder::new("{assets}/fonts")
                .source("src/fonts/**/*")
                .build(),
        )
        .build();
    let sets = compile_asset_sets(&cfg).unwrap();
    let ctx = Arc::new(RunContext::for_target(&cfg, "fonts", "/site"));

    let report = PipelineRunner::new(fs.clone(), ctx)
        .execute(&sets["fonts"], false, None)
        .await
        .unwrap();

    assert!(report.files_written.is_empty());
    assert!(fs.writes().is_empty());
}

#[tokio::test]
async fn plugin_lists_are_appended_to_sources() {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/site/node_modules/a/a.css", "a{}");
    fs.add_file("/site/node_modules/b/b.css", "b{}");

    let cfg = ConfigFileBuilder::new()
        .with_plugins("css", &["node_modules/a/a.css", "node_modules/b/b.css"])
        .with_asset(
            "plugins-css",
            AssetSetBuilder::new("{assets}/css").plugins("css").build(),
        )
        .build();
    let sets = compile_asset_sets(&cfg).unwrap();
    let ctx = Arc::new(RunContext::for_target(&cfg, "plugins-css", "/site"));

    PipelineRunner::new(fs.clone(), ctx)
        .execute(&sets["plugins-css"], false, None)
        .await
        .unwrap();

    assert_eq!(
        fs.writes(),
        vec![
            PathBuf::from("/site/dist/assets/css/a.css"),
            PathBuf::from("/site/dist/assets/css/b.css"),
        ]
    );
}
