// tests/watch_rules.rs

mod common;
use crate::common::init_tracing;

use std::path::PathBuf;
use std::sync::Arc;

use assetdag::config::BuiltinAction;
use assetdag::dag::DagGraph;
use assetdag::pipeline::compile_asset_sets;
use assetdag::watch::{WatchFilter, build_watch_rules};
use assetdag_test_utils::builders::{AssetSetBuilder, ConfigFileBuilder, TaskConfigBuilder};

/// Mirrors the site layout: pages are incremental, layout/partials changes
/// force a full page rebuild.
fn filter() -> WatchFilter {
    let cfg = ConfigFileBuilder::new()
        .with_asset(
            "html",
            AssetSetBuilder::new("")
                .source("src/html/**/*.html")
                .source("!src/html/layout/**/*")
                .source("!src/html/partials/**/*")
                .incremental()
                .watch()
                .build(),
        )
        .with_asset(
            "css",
            AssetSetBuilder::new("{assets}/css")
                .source("src/scss/**/*.scss")
                .watch()
                .build(),
        )
        .with_task("html-full", TaskConfigBuilder::build_asset("html").full().build())
        .with_task(
            "styles",
            TaskConfigBuilder::parallel(&["css"]).build(),
        )
        .with_task("clean", TaskConfigBuilder::action(BuiltinAction::Clean).build())
        .with_watch("src/html/**/*", &["html"])
        .with_watch("src/html/layout/**/*", &["html-full"])
        .with_watch("src/html/partials/**/*", &["html-full"])
        .with_watch("src/scss/**/*", &["styles", "css"])
        .build();

    let sets = compile_asset_sets(&cfg).unwrap();
    let rules = build_watch_rules(&cfg, &sets).unwrap();
    let graph = Arc::new(DagGraph::from_config(&cfg));
    WatchFilter::new("/site", "dist", rules, graph)
}

fn paths(rel: &[&str]) -> Vec<PathBuf> {
    rel.iter().map(|r| PathBuf::from("/site").join(r)).collect()
}

#[test]
fn page_change_triggers_incremental_build() {
    init_tracing();
    let mut f = filter();
    assert_eq!(f.handle_batch(&paths(&["src/html/index.html"])), vec!["html"]);
}

#[test]
fn layout_change_triggers_only_the_full_rebuild() {
    init_tracing();
    let mut f = filter();
    assert_eq!(
        f.handle_batch(&paths(&["src/html/layout/header.html"])),
        vec!["html-full"]
    );
    assert_eq!(
        f.handle_batch(&paths(&["src/html/partials/nav.html"])),
        vec!["html-full"]
    );
}

#[test]
fn tasks_already_pulled_in_by_another_match_are_dropped() {
    let mut f = filter();
    // `styles` runs `css` as a member, so `css` alone is redundant.
    assert_eq!(f.handle_batch(&paths(&["src/scss/site.scss"])), vec!["styles"]);
}

#[test]
fn batch_unions_tasks_and_ignores_output_root() {
    let mut f = filter();
    let tasks = f.handle_batch(&paths(&[
        "src/html/about.html",
        "src/html/layout/footer.html",
        "dist/index.html",
        "README.md",
    ]));
    assert_eq!(tasks, vec!["html", "html-full"]);
}
