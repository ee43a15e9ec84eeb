// tests/watch_rebuild.rs

mod common;
use crate::common::{init_tracing, project, read};

use std::error::Error;
use std::sync::Arc;

use buildloop::dag::registry::{BUILD, CONFIGURE_WATCHER};
use buildloop::dag::{Orchestrator, builtin_task_graph};
use buildloop::engine::RebuildBackend;
use buildloop::exec::RealActions;
use buildloop::fs::{FileSystem, RealFileSystem};
use buildloop::session::SessionState;
use buildloop::types::WatchTarget;
use buildloop_test_utils::builders::BuildConfigBuilder;
use buildloop_test_utils::fake_bundler::FakeBundler;

type TestResult = Result<(), Box<dyn Error>>;

fn files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("src/index.html", "<html><body></body></html>"),
        ("src/index.js", ""),
        ("src/index.scss", "body { margin: 0; }"),
    ]
}

#[tokio::test]
async fn watch_mode_build_injects_reload_client() -> TestResult {
    init_tracing();
    let dir = project(&files());
    let cfg = Arc::new(BuildConfigBuilder::new().ports(3100, 4100).build());
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let actions = RealActions::with_bundler(
        cfg,
        dir.path(),
        fs,
        SessionState::shared(),
        FakeBundler::new(&["src/index.js"]),
    );
    let orchestrator = Orchestrator::new(builtin_task_graph()?, actions);

    orchestrator.run(CONFIGURE_WATCHER).await?;
    orchestrator.run(BUILD).await?;

    let html = read(dir.path(), "dist/index.html");
    assert!(html.contains("\":4100\""), "html: {html}");
    assert_eq!(read(dir.path(), "dist/app.css").lines().next(), Some("body{margin:0}"));
    Ok(())
}

#[tokio::test]
async fn rebuild_batches_report_failed_targets() -> TestResult {
    init_tracing();
    let dir = project(&files());
    let cfg = Arc::new(BuildConfigBuilder::new().build());
    let bundler = FakeBundler::new(&["src/index.js"]);
    let actions = RealActions::with_bundler(
        cfg,
        dir.path(),
        Arc::new(RealFileSystem),
        SessionState::shared(),
        bundler.clone(),
    );
    let ctx = Arc::clone(actions.context());
    let orchestrator = Orchestrator::new(builtin_task_graph()?, actions);
    orchestrator.run(CONFIGURE_WATCHER).await?;

    let all = vec![WatchTarget::Markup, WatchTarget::Scripts, WatchTarget::Styles];
    let outcome = ctx.rebuild(all.clone()).await;
    assert_eq!(outcome.targets, all);
    assert!(outcome.failed.is_empty());
    assert!(dir.path().join("dist/app.css").is_file());

    // The `build:js` action swallows this in watch mode; a rebuild batch
    // still reports it so no reload is sent.
    bundler.set_failing(true);
    let outcome = ctx.rebuild(vec![WatchTarget::Scripts, WatchTarget::Styles]).await;
    assert_eq!(outcome.failed, vec![WatchTarget::Scripts]);
    assert_eq!(outcome.succeeded().collect::<Vec<_>>(), vec![WatchTarget::Styles]);

    // Restart without a started server is a no-op.
    ctx.restart_server().await?;
    Ok(())
}
