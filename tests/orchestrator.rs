// tests/orchestrator.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::time::Duration;

use buildloop::dag::registry::{BUILD, BUILD_JS, BUILD_SASS, CLEAN, HTML, LINT, LINT_JS};
use buildloop::dag::{Action, ActionEvent, Orchestrator, TaskRunState, builtin_task_graph};
use buildloop::errors::BuildloopError;
use buildloop_test_utils::fake_actions::{Recorded, RecordingActions};
use buildloop_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

fn finished(task: &str) -> Recorded {
    Recorded::Finished(task.to_string())
}

fn started(task: &str) -> Recorded {
    Recorded::Started(task.to_string())
}

#[tokio::test]
async fn build_never_starts_builders_before_clean_finished() -> TestResult {
    init_tracing();

    let actions = RecordingActions::new().delay(CLEAN, Duration::from_millis(30));
    let orchestrator = Orchestrator::new(builtin_task_graph()?, actions.clone());

    let report = with_timeout(orchestrator.run(BUILD)).await?;

    let clean_done = actions.index_of(&finished(CLEAN)).expect("clean finished");
    for builder in [HTML, BUILD_JS, BUILD_SASS] {
        let start = actions.index_of(&started(builder)).expect("builder started");
        assert!(start > clean_done, "{builder} started before clean finished");
    }

    // Styles wait for the bundle: discovery reads the module graph.
    assert!(
        actions.index_of(&started(BUILD_SASS)).unwrap()
            > actions.index_of(&finished(BUILD_JS)).unwrap()
    );

    assert_eq!(report.state_of(BUILD), TaskRunState::DoneSuccess);
    assert_eq!(report.state_of(LINT), TaskRunState::NotInRun);
    assert_eq!(report.started_actions().first(), Some(&CLEAN));
    Ok(())
}

#[tokio::test]
async fn parallel_dependencies_overlap() -> TestResult {
    init_tracing();

    let actions = RecordingActions::new()
        .delay("lint:scss", Duration::from_millis(50))
        .delay(LINT_JS, Duration::from_millis(50))
        .delay("validate-html", Duration::from_millis(50));
    let orchestrator = Orchestrator::new(builtin_task_graph()?, actions.clone());

    with_timeout(orchestrator.run(LINT)).await?;

    // All three start before the first one finishes.
    let timeline = actions.timeline();
    assert!(timeline[..3].iter().all(|r| matches!(r, Recorded::Started(_))));
    assert_eq!(actions.started().len(), 3);
    Ok(())
}

#[tokio::test]
async fn failing_step_aborts_the_rest_of_the_series() -> TestResult {
    init_tracing();

    let actions = RecordingActions::new().failing(BUILD_JS);
    let orchestrator = Orchestrator::new(builtin_task_graph()?, actions.clone());

    let err = with_timeout(orchestrator.run(BUILD))
        .await
        .expect_err("build must fail");
    assert!(matches!(err, BuildloopError::ValidationError { ref task, .. } if task == BUILD_JS));

    // build:sass comes after build:js in the series and never starts; html
    // is a parallel sibling and still completes.
    assert!(!actions.started().contains(&BUILD_SASS.to_string()));
    assert!(actions.started().contains(&HTML.to_string()));

    let report = orchestrator.last_report();
    assert_eq!(report.state_of(BUILD_JS), TaskRunState::DoneFailed);
    assert_eq!(report.state_of(BUILD), TaskRunState::DoneFailed);
    assert_eq!(report.state_of(HTML), TaskRunState::DoneSuccess);
    assert_eq!(report.state_of(BUILD_SASS), TaskRunState::NotInRun);
    assert!(
        report
            .events()
            .contains(&ActionEvent::Finished { task: BUILD_JS.to_string(), success: false })
    );
    Ok(())
}

#[tokio::test]
async fn parallel_group_waits_for_every_member_before_failing() -> TestResult {
    init_tracing();

    let actions = RecordingActions::new()
        .failing(LINT_JS)
        .delay("validate-html", Duration::from_millis(40));
    let orchestrator = Orchestrator::new(builtin_task_graph()?, actions.clone());

    let result = with_timeout(orchestrator.run(LINT)).await;
    assert!(result.is_err());
    assert!(actions.timeline().contains(&finished("validate-html")));
    assert_eq!(orchestrator.last_report().state_of(LINT), TaskRunState::DoneFailed);
    Ok(())
}

#[tokio::test]
async fn unknown_task_is_reported() -> TestResult {
    let actions = RecordingActions::new();
    let orchestrator = Orchestrator::new(builtin_task_graph()?, actions.clone());

    let err = orchestrator.run("deploy").await.expect_err("unknown task");
    assert!(matches!(err, BuildloopError::TaskNotFound(ref name) if name == "deploy"));
    assert!(actions.timeline().is_empty());
    Ok(())
}

#[tokio::test]
async fn default_task_only_cleans() -> TestResult {
    let actions = RecordingActions::new();
    let orchestrator = Orchestrator::new(builtin_task_graph()?, actions.clone());

    orchestrator.run("default").await?;
    assert_eq!(actions.actions(), vec![(CLEAN.to_string(), Action::Clean)]);
    Ok(())
}
