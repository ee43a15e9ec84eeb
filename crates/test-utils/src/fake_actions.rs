use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildloop::dag::{Action, TaskName};
use buildloop::errors::{BuildloopError, Result};
use buildloop::exec::ActionBackend;

/// One entry of the fake backend's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Started(TaskName),
    Finished(TaskName),
}

/// A fake action backend that:
/// - records when each task's action starts and finishes
/// - optionally sleeps per task, to make overlap observable
/// - fails the tasks it was told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingActions {
    timeline: Arc<Mutex<Vec<Recorded>>>,
    actions: Arc<Mutex<Vec<(TaskName, Action)>>>,
    failing: HashSet<TaskName>,
    delays: HashMap<TaskName, Duration>,
}

impl RecordingActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }

    pub fn delay(mut self, task: &str, delay: Duration) -> Self {
        self.delays.insert(task.to_string(), delay);
        self
    }

    pub fn timeline(&self) -> Vec<Recorded> {
        self.timeline.lock().unwrap().clone()
    }

    /// Tasks whose action started, in start order.
    pub fn started(&self) -> Vec<TaskName> {
        self.timeline()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Started(name) => Some(name),
                Recorded::Finished(_) => None,
            })
            .collect()
    }

    pub fn actions(&self) -> Vec<(TaskName, Action)> {
        self.actions.lock().unwrap().clone()
    }

    pub fn index_of(&self, entry: &Recorded) -> Option<usize> {
        self.timeline().iter().position(|r| r == entry)
    }
}

impl ActionBackend for RecordingActions {
    fn run_action(
        &self,
        task: TaskName,
        action: Action,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.timeline
                .lock()
                .unwrap()
                .push(Recorded::Started(task.clone()));
            self.actions.lock().unwrap().push((task.clone(), action));

            if let Some(delay) = self.delays.get(&task) {
                tokio::time::sleep(*delay).await;
            }

            self.timeline
                .lock()
                .unwrap()
                .push(Recorded::Finished(task.clone()));

            if self.failing.contains(&task) {
                return Err(BuildloopError::ValidationError {
                    task,
                    message: "configured to fail".to_string(),
                });
            }
            Ok(())
        })
    }
}
