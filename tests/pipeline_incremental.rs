// tests/pipeline_incremental.rs

mod common;
use crate::common::init_tracing;

use std::path::PathBuf;
use std::sync::Arc;

use assetdag::config::RunContext;
use assetdag::fs::mock::MockFileSystem;
use assetdag::pipeline::{AssetSet, PipelineRunner, TransformStep, compile_asset_sets};
use assetdag::types::Condition;
use assetdag_test_utils::builders::{AssetSetBuilder, ConfigFileBuilder};

fn setup(builder: AssetSetBuilder) -> (Arc<MockFileSystem>, PipelineRunner, AssetSet) {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/site/src/html/index.html", "<p>index</p>");
    fs.add_file("/site/src/html/about.html", "<p>about</p>");

    let cfg = ConfigFileBuilder::new().with_asset("html", builder.build()).build();
    let mut sets = compile_asset_sets(&cfg).unwrap();
    let set = sets.remove("html").unwrap();
    let ctx = Arc::new(RunContext::for_target(&cfg, "html", "/site"));
    let runner = PipelineRunner::new(fs.clone(), ctx);
    (fs, runner, set)
}

#[tokio::test]
async fn second_incremental_run_writes_nothing() {
    init_tracing();
    let (fs, runner, set) = setup(
        AssetSetBuilder::new("")
            .source("src/html/**/*.html")
            .incremental(),
    );

    let first = runner.execute(&set, false, None).await.unwrap();
    assert_eq!(first.files_written.len(), 2);

    fs.clear_writes();
    let second = runner.execute(&set, false, None).await.unwrap();
    assert!(second.files_written.is_empty());
    assert_eq!(second.unchanged, 2);
    assert!(fs.writes().is_empty());
}

#[tokio::test]
async fn only_touched_sources_are_rebuilt() {
    let (fs, runner, set) = setup(
        AssetSetBuilder::new("")
            .source("src/html/**/*.html")
            .incremental(),
    );
    runner.execute(&set, false, None).await.unwrap();

    fs.clear_writes();
    fs.touch("/site/src/html/about.html");
    let report = runner.execute(&set, false, None).await.unwrap();

    assert_eq!(report.files_written, vec![PathBuf::from("/site/dist/about.html")]);
    assert_eq!(report.unchanged, 1);
}

#[tokio::test]
async fn full_run_ignores_incremental_flag() {
    let (fs, runner, set) = setup(
        AssetSetBuilder::new("")
            .source("src/html/**/*.html")
            .incremental(),
    );
    runner.execute(&set, false, None).await.unwrap();

    fs.clear_writes();
    let report = runner.execute(&set, true, None).await.unwrap();
    assert_eq!(report.files_written.len(), 2);
    assert_eq!(fs.writes().len(), 2);
}

#[tokio::test]
async fn incremental_concat_rebuilds_whole_bundle_when_one_source_changes() {
    let (fs, runner, set) = setup(
        AssetSetBuilder::new("bundle")
            .source("src/html/**/*.html")
            .transform(TransformStep::Concat {
                file: "all.html".into(),
                when: Condition::Always,
            })
            .incremental(),
    );

    runner.execute(&set, false, None).await.unwrap();
    let bundle = fs.contents("/site/dist/bundle/all.html").unwrap();
    assert_eq!(bundle, b"<p>about</p>\n<p>index</p>");

    fs.clear_writes();
    let report = runner.execute(&set, false, None).await.unwrap();
    assert!(report.files_written.is_empty());

    fs.add_file("/site/src/html/index.html", "<p>new</p>");
    let report = runner.execute(&set, false, None).await.unwrap();
    assert_eq!(report.files_written, vec![PathBuf::from("/site/dist/bundle/all.html")]);
    assert_eq!(
        fs.contents("/site/dist/bundle/all.html").unwrap(),
        b"<p>about</p>\n<p>new</p>"
    );
}
