// src/dag/orchestrator.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use futures_util::future::join_all;
use tracing::{debug, error, info};

use crate::dag::graph::{Composition, TaskGraph};
use crate::dag::task_info::{ActionEvent, RunReport, TaskRunState};
use crate::errors::{BuildloopError, Result};
use crate::exec::ActionBackend;

type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Runs tasks of a validated [`TaskGraph`] through an [`ActionBackend`].
///
/// `run(name)` first runs the task's dependencies, one after another for
/// [`Composition::Series`] or all at once for [`Composition::Parallel`], and
/// then the task's own action. The first failure aborts everything that
/// depends on it; there is no retry.
#[derive(Debug)]
pub struct Orchestrator<B: ActionBackend> {
    graph: TaskGraph,
    backend: B,
    report: Mutex<RunReport>,
}

impl<B: ActionBackend> Orchestrator<B> {
    pub fn new(graph: TaskGraph, backend: B) -> Self {
        Self {
            graph,
            backend,
            report: Mutex::new(RunReport::default()),
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Report of the most recent run (also available while it is running).
    pub fn last_report(&self) -> RunReport {
        self.report().clone()
    }

    /// Run the named task and everything it depends on.
    ///
    /// On failure the error of the first failing action is returned; use
    /// [`Orchestrator::last_report`] to inspect which tasks ran.
    pub async fn run(&self, name: &str) -> Result<RunReport> {
        if !self.graph.contains(name) {
            return Err(BuildloopError::TaskNotFound(name.to_string()));
        }

        *self.report() = RunReport::default();

        let started = Instant::now();
        info!(task = %name, "run started");

        let result = self.run_task(name).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                info!(task = %name, elapsed_ms, "run finished");
                Ok(self.last_report())
            }
            Err(err) => {
                error!(task = %name, elapsed_ms, error = %err, "run failed");
                Err(err)
            }
        }
    }

    fn report(&self) -> MutexGuard<'_, RunReport> {
        self.report
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn run_task<'a>(&'a self, name: &'a str) -> TaskFuture<'a> {
        Box::pin(async move {
            let def = self
                .graph
                .get(name)
                .ok_or_else(|| BuildloopError::TaskNotFound(name.to_string()))?;

            self.report().set_state(name, TaskRunState::Running);

            if let Err(err) = self.run_dependencies(name, def.composition).await {
                debug!(task = %name, "dependency failed; aborting task");
                self.report().set_state(name, TaskRunState::DoneFailed);
                return Err(err);
            }

            if let Some(action) = def.action {
                info!(task = %name, %action, "starting task action");
                self.report().push(ActionEvent::Started(name.to_string()));

                let started = Instant::now();
                let outcome = self.backend.run_action(name.to_string(), action).await;
                let success = outcome.is_ok();
                let elapsed_ms = started.elapsed().as_millis() as u64;

                self.report().push(ActionEvent::Finished {
                    task: name.to_string(),
                    success,
                });

                if let Err(err) = outcome {
                    error!(task = %name, %action, elapsed_ms, error = %err, "task action failed");
                    self.report().set_state(name, TaskRunState::DoneFailed);
                    return Err(err);
                }

                info!(task = %name, %action, elapsed_ms, "task action finished");
            }

            self.report().set_state(name, TaskRunState::DoneSuccess);
            Ok(())
        })
    }

    async fn run_dependencies(&self, name: &str, composition: Composition) -> Result<()> {
        let deps = self.graph.dependencies_of(name);
        if deps.is_empty() {
            return Ok(());
        }

        match composition {
            Composition::Series => {
                for dep in deps {
                    self.run_task(dep).await?;
                }
                Ok(())
            }
            Composition::Parallel => {
                debug!(task = %name, ?deps, "running dependencies concurrently");
                let results = join_all(deps.iter().map(|dep| self.run_task(dep))).await;
                // Every branch has settled; report the first failure in
                // declaration order.
                results.into_iter().collect::<Result<Vec<()>>>().map(|_| ())
            }
        }
    }
}
