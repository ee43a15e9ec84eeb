// tests/task_graph.rs

use buildloop::dag::registry::{BUILD, BUILD_ASSETS, BUILD_OUTPUT, CLEAN, DEFAULT, LINT, START};
use buildloop::dag::{Action, Composition, TaskDef, TaskGraph, builtin_task_graph};
use buildloop::errors::BuildloopError;

#[test]
fn rejects_cycles() {
    let err = TaskGraph::builder()
        .register("a", TaskDef::series(&["b"]).with_action(Action::Clean))
        .register("b", TaskDef::series(&["c"]).with_action(Action::Clean))
        .register("c", TaskDef::series(&["a"]).with_action(Action::Clean))
        .build()
        .expect_err("cycle must be rejected");

    assert!(matches!(err, BuildloopError::DagCycle(_)), "got {err:?}");
}

#[test]
fn rejects_unknown_dependency() {
    let err = TaskGraph::builder()
        .register("build", TaskDef::series(&["clean", "bundle"]))
        .register("clean", TaskDef::action(Action::Clean))
        .build()
        .expect_err("unknown dependency must be rejected");

    match err {
        BuildloopError::ConfigError(msg) => {
            assert!(msg.contains("unknown dependency 'bundle'"), "message: {msg}")
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn rejects_self_dependency() {
    let err = TaskGraph::builder()
        .register("loop", TaskDef::series(&["loop"]))
        .build()
        .expect_err("self dependency must be rejected");

    match err {
        BuildloopError::ConfigError(msg) => assert!(msg.contains("itself"), "message: {msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn rejects_empty_graph_and_duplicates() {
    assert!(matches!(
        TaskGraph::builder().build(),
        Err(BuildloopError::ConfigError(_))
    ));

    let err = TaskGraph::builder()
        .register("clean", TaskDef::action(Action::Clean))
        .register("clean", TaskDef::action(Action::CopyMarkup))
        .build()
        .expect_err("duplicate registration must be rejected");
    assert!(matches!(err, BuildloopError::ConfigError(_)));
}

#[test]
fn builtin_graph_has_expected_shape() {
    let graph = builtin_task_graph().expect("built-in graph is valid");

    let build = graph.get(BUILD).unwrap();
    assert_eq!(build.composition, Composition::Series);
    assert_eq!(build.depends_on, vec![CLEAN, BUILD_OUTPUT]);
    assert!(build.action.is_none());

    assert_eq!(graph.get(BUILD_OUTPUT).unwrap().composition, Composition::Parallel);
    assert_eq!(graph.get(BUILD_ASSETS).unwrap().composition, Composition::Series);
    assert_eq!(graph.get(LINT).unwrap().composition, Composition::Parallel);
    assert_eq!(graph.dependencies_of(DEFAULT), [CLEAN.to_string()]);

    assert!(graph.dependents_of(CLEAN).contains(&BUILD.to_string()));
}

#[test]
fn start_plan_configures_watch_before_building() {
    let graph = builtin_task_graph().unwrap();
    let plan: Vec<Action> = graph
        .action_plan(START)
        .unwrap()
        .into_iter()
        .map(|(_, action)| action)
        .collect();

    assert_eq!(
        plan,
        vec![
            Action::ConfigureWatch,
            Action::Clean,
            Action::CopyMarkup,
            Action::BundleScripts,
            Action::CompileStyles,
            Action::Watch,
            Action::StartServer,
        ]
    );
}

#[test]
fn action_plan_of_unknown_task_is_task_not_found() {
    let graph = builtin_task_graph().unwrap();
    assert!(matches!(
        graph.action_plan("deploy"),
        Err(BuildloopError::TaskNotFound(name)) if name == "deploy"
    ));
}
