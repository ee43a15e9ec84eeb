// tests/script_bundle.rs

mod common;
use crate::common::{init_tracing, project, read};

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use buildloop::bundle::{
    BundleReport, EsbuildBundler, ScriptBundleBuilder, bundle_outcome,
    parse_inputs,
};
use buildloop::dag::registry::{BUILD, BUILD_JS, CONFIGURE_WATCHER};
use buildloop::dag::{Orchestrator, builtin_task_graph};
use buildloop::errors::BuildloopError;
use buildloop::exec::RealActions;
use buildloop::fs::{FileSystem, RealFileSystem};
use buildloop::session::{self, SessionState};
use buildloop_test_utils::builders::BuildConfigBuilder;
use buildloop_test_utils::fake_bundler::FakeBundler;

type TestResult = Result<(), Box<dyn Error>>;

fn real_fs() -> Arc<dyn FileSystem> {
    Arc::new(RealFileSystem)
}

#[test]
fn esbuild_arguments() {
    let cfg = BuildConfigBuilder::new().dest_name("site").build();
    let builder = ScriptBundleBuilder::new(EsbuildBundler::new("esbuild"), &cfg, "/project");

    let args = builder.bundler().args(builder.request());
    assert_eq!(
        args,
        vec![
            "src/index.js",
            "--bundle",
            "--minify",
            "--sourcemap",
            "--outfile=dist/site.min.js",
            "--metafile=.buildloop/site.meta.json",
        ]
    );
    assert_eq!(builder.request().root, PathBuf::from("/project"));
}

#[test]
fn extra_bundler_args_are_appended() {
    let mut raw = BuildConfigBuilder::new().raw();
    raw.script.bundler_args = vec!["--target=es2018".to_string()];
    let cfg = buildloop::config::BuildConfig::try_from(raw).unwrap();

    let bundler = EsbuildBundler::new("esbuild");
    let request = ScriptBundleBuilder::new(bundler.clone(), &cfg, ".").request().clone();
    assert_eq!(bundler.args(&request).last().map(String::as_str), Some("--target=es2018"));
}

#[test]
fn metafile_inputs_skip_virtual_modules() -> TestResult {
    let json = r#"{
        "inputs": {
            "src/index.js": { "bytes": 120, "imports": [] },
            "src/widget.js": { "bytes": 80, "imports": [] },
            "<stdin>": { "bytes": 1, "imports": [] },
            "ns:virtual": { "bytes": 1, "imports": [] }
        },
        "outputs": {}
    }"#;

    assert_eq!(parse_inputs(json)?, vec!["src/index.js", "src/widget.js"]);
    assert_eq!(parse_inputs("{}")?, Vec::<String>::new());
    assert!(matches!(parse_inputs("not json"), Err(BuildloopError::BundleError(_))));
    Ok(())
}

#[tokio::test]
async fn build_records_module_graph_in_cache() -> TestResult {
    init_tracing();
    let dir = project(&[]);
    let cfg = BuildConfigBuilder::new().build();
    let session = SessionState::shared();

    let builder = ScriptBundleBuilder::new(
        FakeBundler::new(&["src/index.js", "./src/widget.js"]),
        &cfg,
        dir.path(),
    );

    let report = builder.build(&RealFileSystem, &session).await?;
    assert_eq!(
        report,
        BundleReport {
            outfile: PathBuf::from("dist/app.min.js"),
            inputs: 2,
            new_inputs: 2,
        }
    );

    // A second build of the same graph adds nothing new.
    let again = builder.build(&RealFileSystem, &session).await?;
    assert_eq!(again.new_inputs, 0);

    let guard = session::lock(&session);
    assert_eq!(
        guard.sources().paths(),
        [PathBuf::from("src/index.js"), PathBuf::from("src/widget.js")]
    );
    assert!(guard.sources().contains(Path::new("./src/widget.js")));
    Ok(())
}

#[test]
fn bundle_policy_depends_on_watch_flag() {
    let failure = || Err(BuildloopError::BundleError("boom".to_string()));

    assert!(matches!(
        bundle_outcome(failure(), false),
        Err(BuildloopError::BundleError(_))
    ));
    assert!(matches!(bundle_outcome(failure(), true), Ok(None)));
}

#[tokio::test]
async fn one_shot_bundle_failure_fails_the_run() -> TestResult {
    init_tracing();
    let dir = project(&[]);
    let cfg = Arc::new(BuildConfigBuilder::new().build());
    let actions = RealActions::with_bundler(
        cfg,
        dir.path(),
        real_fs(),
        SessionState::shared(),
        FakeBundler::failing(),
    );
    let orchestrator = Orchestrator::new(builtin_task_graph()?, actions);

    let err = orchestrator.run(BUILD_JS).await.expect_err("bundle failure is fatal");
    assert!(matches!(err, BuildloopError::BundleError(_)));
    Ok(())
}

#[tokio::test]
async fn after_configure_watcher_bundle_failures_are_logged_only() -> TestResult {
    init_tracing();
    let dir = project(&[]);
    let cfg = Arc::new(BuildConfigBuilder::new().build());
    let bundler = FakeBundler::failing();
    let actions = RealActions::with_bundler(
        cfg,
        dir.path(),
        real_fs(),
        SessionState::shared(),
        bundler.clone(),
    );
    let orchestrator = Orchestrator::new(builtin_task_graph()?, actions);

    assert!(orchestrator.run(BUILD_JS).await.is_err());

    orchestrator.run(CONFIGURE_WATCHER).await?;
    orchestrator.run(BUILD_JS).await?;
    orchestrator.run(BUILD_JS).await?;

    assert_eq!(bundler.calls(), 3);
    assert!(orchestrator.backend().context().session().lock().unwrap().is_watch());
    Ok(())
}

#[tokio::test]
async fn full_build_writes_every_artifact() -> TestResult {
    init_tracing();
    let dir = project(&[
        ("src/index.html", "<html><body><h1>hi</h1></body></html>"),
        ("src/index.js", "import './widget.js';"),
        ("src/widget.js", "export const w = 1;"),
        ("src/widget.scss", "$c: red;\n.widget { color: $c; }\n"),
        ("src/unrelated.scss", ".other { color: blue; }\n"),
        ("dist/stale.txt", "left over"),
    ]);
    let cfg = Arc::new(BuildConfigBuilder::new().build());
    let actions = RealActions::with_bundler(
        cfg,
        dir.path(),
        real_fs(),
        SessionState::shared(),
        FakeBundler::new(&["src/index.js", "src/widget.js"]),
    );
    let orchestrator = Orchestrator::new(builtin_task_graph()?, actions);

    orchestrator.run(BUILD).await?;

    let root = dir.path();
    assert!(!root.join("dist/stale.txt").exists(), "clean ran first");
    assert!(root.join("dist/app.min.js").is_file());

    let html = read(root, "dist/index.html");
    assert!(!html.contains("WebSocket"), "no reload client outside watch mode");

    let css = read(root, "dist/app.css");
    assert!(css.contains(".widget{color:red}"), "css: {css}");
    assert!(!css.contains(".other"), "only siblings of the module graph");
    assert!(css.ends_with("/*# sourceMappingURL=app.css.map */\n"));

    let map: serde_json::Value = serde_json::from_str(&read(root, "dist/app.css.map"))?;
    assert_eq!(map["sources"], serde_json::json!(["../src/widget.scss"]));
    Ok(())
}
