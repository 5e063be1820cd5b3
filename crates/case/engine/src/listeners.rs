//! Task listeners keyed by task definition and lifecycle event

use case_types::{CaseError, CaseResult, Task};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEvent {
    Create,
    Assignment,
    Complete,
    Delete,
}

impl std::fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Assignment => "assignment",
            Self::Complete => "complete",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

pub type TaskListener = Arc<dyn Fn(&Task) -> CaseResult<()> + Send + Sync>;

/// Listeners registered per `(task definition key, event)`, plus listeners
/// that apply to every task.
#[derive(Default)]
pub struct TaskListenerRegistry {
    by_definition: HashMap<(String, TaskEvent), Vec<TaskListener>>,
    global: HashMap<TaskEvent, Vec<TaskListener>>,
}

impl TaskListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, task_definition_key: impl Into<String>, event: TaskEvent, listener: F)
    where
        F: Fn(&Task) -> CaseResult<()> + Send + Sync + 'static,
    {
        self.by_definition
            .entry((task_definition_key.into(), event))
            .or_default()
            .push(Arc::new(listener));
    }

    pub fn register_global<F>(&mut self, event: TaskEvent, listener: F)
    where
        F: Fn(&Task) -> CaseResult<()> + Send + Sync + 'static,
    {
        self.global.entry(event).or_default().push(Arc::new(listener));
    }

    /// Run the listeners for this task's definition, then the global ones.
    pub fn fire(&self, event: TaskEvent, task: &Task) -> CaseResult<()> {
        let specific = task
            .task_definition_key
            .as_ref()
            .and_then(|key| self.by_definition.get(&(key.clone(), event)))
            .into_iter()
            .flatten();
        let global = self.global.get(&event).into_iter().flatten();

        for listener in specific.chain(global) {
            listener(task).map_err(|e| match e {
                CaseError::Listener { .. } => e,
                other => CaseError::listener(task.id.as_str(), format!("{event} listener"), other.to_string()),
            })?;
        }
        Ok(())
    }
}
