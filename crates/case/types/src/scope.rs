//! Variable scopes: who owns a variable and how a scope caches its rows

use crate::{CaseResult, CommandToken, ExecutionId, Lazy, TaskId, VariableInstance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The single owner of a variable. The three owners are mutually exclusive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ScopeRef {
    Task(TaskId),
    Execution(ExecutionId),
    ProcessInstance(ExecutionId),
}

impl ScopeRef {
    /// Scope of an execution, which is a process-instance scope for the root
    /// execution.
    pub fn for_execution(execution_id: &ExecutionId, process_instance_id: &ExecutionId) -> Self {
        if execution_id == process_instance_id {
            Self::ProcessInstance(execution_id.clone())
        } else {
            Self::Execution(execution_id.clone())
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Task(id) => id.as_str(),
            Self::Execution(id) | Self::ProcessInstance(id) => id.as_str(),
        }
    }
}

impl std::fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task(id) => write!(f, "task:{id}"),
            Self::Execution(id) => write!(f, "execution:{id}"),
            Self::ProcessInstance(id) => write!(f, "process:{id}"),
        }
    }
}

/// The `{task, execution, process instance}` triple stamped on variables and
/// variable events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableContext {
    pub task_id: Option<TaskId>,
    pub execution_id: Option<ExecutionId>,
    pub process_instance_id: Option<ExecutionId>,
}

/// Per-scope cache of variable instances, loaded at most once per command.
#[derive(Clone, Debug, Default)]
pub struct VariableScope {
    instances: Lazy<BTreeMap<String, VariableInstance>>,
}

impl VariableScope {
    /// Scope of a brand-new entity: nothing stored yet, so nothing to load.
    pub fn transient() -> Self {
        Self {
            instances: Lazy::fresh(BTreeMap::new()),
        }
    }

    pub fn is_initialized_in(&self, token: &CommandToken) -> bool {
        self.instances.is_loaded_in(token)
    }

    pub fn initialize(&mut self, token: &Arc<CommandToken>, rows: Vec<VariableInstance>) {
        let map = rows.into_iter().map(|v| (v.name.clone(), v)).collect();
        self.instances.load(token, map);
    }

    pub fn bind(&mut self, token: &Arc<CommandToken>) {
        self.instances.bind(token);
    }

    pub fn invalidate(&mut self) {
        self.instances.invalidate();
    }

    pub fn instances(
        &self,
        owner_id: &str,
        operation: &str,
    ) -> CaseResult<&BTreeMap<String, VariableInstance>> {
        self.instances.get(owner_id, operation)
    }

    pub fn instances_mut(
        &mut self,
        owner_id: &str,
        operation: &str,
    ) -> CaseResult<&mut BTreeMap<String, VariableInstance>> {
        self.instances.get_mut(owner_id, operation)
    }
}
